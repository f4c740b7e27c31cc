//! Note-timeline animation engine for the installation scene.
//!
//! A precomputed score drives three effects: echoing pillars that glow as
//! each delayed repetition of a note sounds, short-lived point billboards,
//! and ground bubbles that rise when their cell is triggered. Every frame the
//! [`SessionController`] turns transport time into instance mutations on an
//! [`InstanceRenderer`], advancing monotonic cursors instead of rescanning the
//! timeline.

pub mod audio;
pub mod bubbles;
pub mod constants;
pub mod coverage;
pub mod cursor;
pub mod echo;
pub mod notes;
pub mod points;
pub mod pool;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod state;

pub use audio::*;
pub use bubbles::*;
pub use constants::*;
pub use coverage::*;
pub use cursor::*;
pub use echo::*;
pub use notes::*;
pub use points::*;
pub use pool::*;
pub use render::*;
pub use scheduler::*;
pub use session::*;
pub use state::*;

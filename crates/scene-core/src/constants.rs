use glam::Vec3;

// Shared scene/timing tuning constants used by the core animators and the native frontend.

// Note data
/// Sentinel onset used to warm up the synth voice pool.
pub const PREALLOCATION_TIME_SEC: f64 = 0.005;
pub const PREALLOCATION_TIME_TOLERANCE: f64 = 1e-9;

// Session timing
pub const SCORE_LEAD_IN_SEC: f64 = 4.0; // silence the score plays before the first note
pub const LATENCY_COMPENSATION: f64 = 3.0; // multiples of output latency folded into the start time
pub const RESUME_OFFSET_SEC: f64 = 1.0; // final-mix instrument starts one second into the score

// Listener pose updates sent to the audio engine
pub const LISTENER_UPDATES_PER_SEC: u32 = 10;
pub const LISTENER_POSE_EPSILON: f32 = 0.01;

// Echo (distance delay) effect
pub const ECHO_DELAY_COUNT: usize = 5;
pub const ECHO_DELAY_TIME_SEC: f64 = 0.5;
pub const ECHO_NOTE_DURATION_SEC: f64 = 0.3;
/// Semitones below the lowest note used as the height origin.
pub const ECHO_LOWEST_NOTE_OFFSET: i32 = 5;
pub const ECHO_BASE_RADIUS: f32 = 20.0;
pub const ECHO_RADIUS_STEP: f32 = 15.0; // each later tap sits further out
pub const ECHO_HEIGHT_PER_SEMITONE: f32 = 2.0;
pub const ECHO_BASE_HEIGHT: f32 = 1.0;
pub const ECHO_PILLAR_SCALE: f32 = 1.0;
pub const ECHO_GLOW_SCALE: f32 = 1.5;
pub const ECHO_ROTATION_COUNT: usize = 3; // copies of every tap, 120 degrees apart

// Point (sparse billboard) effect
pub const POINT_FADE_DURATION_SEC: f64 = 0.25;
pub const POINT_NOTE_INSTANCE_COUNT: usize = 40;
pub const POINT_NOTE_SCALE: f32 = 3.0;
pub const POINT_BACKDROP_SCALE: f32 = 0.5;

// Ground bubble effect
pub const BUBBLE_GRID_COLUMNS: usize = 30;
pub const BUBBLE_GRID_ROWS: usize = 30;
pub const BUBBLE_GRID_SPACING: f32 = 10.0;
pub const BUBBLE_START_Y: f32 = 0.5;
pub const BUBBLE_SPEED_Y: f32 = 15.0; // world units per second
pub const BUBBLE_TILT_HEIGHT: f32 = 5.0; // rise over which the bubble tilts up and fades in
pub const BUBBLE_FADE_START_Y: f32 = 150.0;
pub const BUBBLE_FADE_RANGE_Y: f32 = 50.0;
pub const BUBBLE_REGROW_PER_SEC: f32 = 0.5; // scale regained per second while at rest
pub const BUBBLE_SCALE: f32 = 4.0;

// Palette
pub const PILLAR_COLOR: [f32; 3] = [0.2, 0.2, 0.2]; // gray
pub const GLOW_COLOR: [f32; 3] = [1.0, 1.0, 1.0]; // white
pub const POINT_NOTE_COLOR: [f32; 3] = [1.0, 0.9, 0.6];
pub const POINT_BACKDROP_COLOR: [f32; 3] = [0.15, 0.12, 0.08];
pub const BUBBLE_REST_COLOR: [f32; 3] = [0.1, 0.1, 0.15];
pub const BUBBLE_LIT_COLOR: [f32; 3] = [0.4, 0.7, 1.0];

#[inline]
pub fn rgb(c: [f32; 3]) -> Vec3 {
    Vec3::from(c)
}

//! Audio engine collaborator interface.
//!
//! The score player is opaque: it owns the transport clock, reports lifecycle
//! events as log lines, and accepts listener pose writes. [`ManualTransport`]
//! is a scriptable stand-in used by tests and by headless runs.

/// Transport and lifecycle surface of the score player.
pub trait AudioTransport {
    /// Authoritative playback clock in seconds. Monotonic while playing.
    fn current_time(&self) -> f64;

    /// Output latency in seconds, folded into the session start time.
    fn latency(&self) -> f64 {
        0.0
    }

    /// Write the listener's world matrix (column-major) into the engine.
    fn write_listener_pose(&mut self, pose: &[f32; 16]);

    /// Rewind the score and play it again from the top.
    fn rewind(&mut self);

    fn set_paused(&mut self, paused: bool);

    /// Drain log lines emitted since the previous call.
    fn poll_messages(&mut self) -> Vec<String>;
}

/// Lifecycle signals recognised in the player's log output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LifecycleMessage {
    Started { score_time: Option<f64> },
    Resumed { score_time: f64 },
    Ended,
}

impl LifecycleMessage {
    /// Parse `csd:started`, `csd:started at <t>`, `csd:resumed at <t>` and
    /// `csd:ended`. Anything else is not a lifecycle message.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("csd:started") {
            return Some(Self::Started {
                score_time: parse_at(rest),
            });
        }
        if let Some(rest) = line.strip_prefix("csd:resumed") {
            return parse_at(rest).map(|score_time| Self::Resumed { score_time });
        }
        if line.starts_with("csd:ended") {
            return Some(Self::Ended);
        }
        None
    }
}

fn parse_at(rest: &str) -> Option<f64> {
    rest.split_once(" at ")
        .and_then(|(_, t)| t.trim().parse::<f64>().ok())
}

/// Transport whose clock and messages are driven by the caller.
#[derive(Clone, Debug, Default)]
pub struct ManualTransport {
    pub time: f64,
    pub latency: f64,
    pub paused: bool,
    pub rewinds: usize,
    pub poses: Vec<[f32; 16]>,
    pending: Vec<String>,
}

impl ManualTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_message(&mut self, line: impl Into<String>) {
        self.pending.push(line.into());
    }

    pub fn advance(&mut self, seconds: f64) {
        if !self.paused {
            self.time += seconds;
        }
    }
}

impl AudioTransport for ManualTransport {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn latency(&self) -> f64 {
        self.latency
    }

    fn write_listener_pose(&mut self, pose: &[f32; 16]) {
        self.poses.push(*pose);
    }

    fn rewind(&mut self) {
        self.rewinds += 1;
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn poll_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }
}

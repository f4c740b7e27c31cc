//! Playback session control.
//!
//! The controller listens to the score player's lifecycle messages, performs
//! the one-time animator setup when playback first starts, feeds transport
//! time to every animator each frame, and rewinds everything when the score
//! ends and loops.

use crate::audio::{AudioTransport, LifecycleMessage};
use crate::bubbles::{BubbleConfig, GroundGridBubbleAnimator};
use crate::constants::*;
use crate::echo::{DelayedEchoAnimator, EchoConfig, EchoFrame};
use crate::notes::ScoreData;
use crate::points::{PointConfig, PointFrame, SparsePointAnimator};
use crate::render::InstanceRenderer;
use glam::{Mat4, Vec3};

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub echo: EchoConfig,
    pub points: PointConfig,
    pub bubbles: BubbleConfig,
    pub score_lead_in_sec: f64,
    pub latency_compensation: f64,
    pub resume_offset_sec: f64,
    pub listener_epsilon: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            echo: EchoConfig::default(),
            points: PointConfig::default(),
            bubbles: BubbleConfig::default(),
            score_lead_in_sec: SCORE_LEAD_IN_SEC,
            latency_compensation: LATENCY_COMPENSATION,
            resume_offset_sec: RESUME_OFFSET_SEC,
            listener_epsilon: LISTENER_POSE_EPSILON,
        }
    }
}

/// Transport-relative session timing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionClock {
    /// Transport time at which score time zero is heard.
    pub start_time: f64,
    pub is_started: bool,
    pub restart_count: u32,
}

/// Sends the listener pose to the audio engine only when it has moved.
#[derive(Clone, Debug)]
pub struct ListenerPoseSender {
    epsilon: f32,
    previous: [f32; 16],
    dirty: bool,
    pending: Option<[f32; 16]>,
}

impl ListenerPoseSender {
    pub fn new(epsilon: f32) -> Self {
        Self {
            epsilon,
            previous: [0.0; 16],
            dirty: true,
            pending: None,
        }
    }

    /// Offer the current pose. Returns true if it was written.
    pub fn update<T: AudioTransport + ?Sized>(
        &mut self,
        pose: [f32; 16],
        started: bool,
        transport: &mut T,
    ) -> bool {
        if !started {
            self.pending = Some(pose);
            return false;
        }
        if !self.dirty {
            self.dirty = pose
                .iter()
                .zip(&self.previous)
                .any(|(a, b)| (a - b).abs() > self.epsilon);
        }
        if !self.dirty {
            return false;
        }
        log::trace!(
            "[session] listener position = [{:.2}, {:.2}, {:.2}]",
            pose[12],
            pose[13],
            pose[14]
        );
        transport.write_listener_pose(&pose);
        self.previous = pose;
        self.dirty = false;
        self.pending = None;
        true
    }

    /// Write any pose held back while stopped, and force the next update.
    fn flush<T: AudioTransport + ?Sized>(&mut self, transport: &mut T) {
        self.dirty = true;
        if let Some(pose) = self.pending.take() {
            transport.write_listener_pose(&pose);
            self.previous = pose;
            self.dirty = false;
        }
    }
}

pub struct Animators {
    pub echo: DelayedEchoAnimator,
    pub points: SparsePointAnimator,
    pub bubbles: GroundGridBubbleAnimator,
}

impl Animators {
    pub fn new<R: InstanceRenderer + ?Sized>(
        score: &ScoreData,
        config: &SessionConfig,
        renderer: &mut R,
    ) -> Self {
        Self {
            echo: DelayedEchoAnimator::new(&score.echo, config.echo.clone(), renderer),
            points: SparsePointAnimator::new(&score.points, config.points.clone(), renderer),
            bubbles: GroundGridBubbleAnimator::new(
                &score.bubbles,
                config.bubbles.clone(),
                renderer,
            ),
        }
    }

    pub fn reset<R: InstanceRenderer + ?Sized>(&mut self, renderer: &mut R) {
        self.echo.reset(renderer);
        self.points.reset(renderer);
        self.bubbles.reset();
    }
}

/// What changed during one animated frame.
#[derive(Clone, Debug, Default)]
pub struct SessionFrame {
    pub elapsed: f64,
    pub echo: EchoFrame,
    pub points: PointFrame,
}

pub struct SessionController {
    config: SessionConfig,
    score: ScoreData,
    animators: Option<Animators>,
    clock: SessionClock,
    listener: ListenerPoseSender,
    is_paused: bool,
    rewound: bool,
}

impl SessionController {
    pub fn new(score: ScoreData, config: SessionConfig) -> Self {
        let listener = ListenerPoseSender::new(config.listener_epsilon);
        Self {
            config,
            score,
            animators: None,
            clock: SessionClock::default(),
            listener,
            is_paused: false,
            rewound: true,
        }
    }

    /// Drain and handle every pending log line from the transport.
    pub fn poll<T, R>(&mut self, transport: &mut T, renderer: &mut R)
    where
        T: AudioTransport + ?Sized,
        R: InstanceRenderer + ?Sized,
    {
        for line in transport.poll_messages() {
            self.handle_message(&line, transport, renderer);
        }
    }

    pub fn handle_message<T, R>(&mut self, line: &str, transport: &mut T, renderer: &mut R)
    where
        T: AudioTransport + ?Sized,
        R: InstanceRenderer + ?Sized,
    {
        match LifecycleMessage::parse(line) {
            Some(LifecycleMessage::Started { score_time }) => {
                self.on_started(score_time, transport, renderer)
            }
            Some(LifecycleMessage::Resumed { score_time }) => {
                self.clock.start_time = transport.current_time()
                    - transport.latency()
                    - score_time
                    - self.config.resume_offset_sec;
                log::debug!(
                    "[session] playback resumed at score time {score_time}, start time = {:.3}",
                    self.clock.start_time
                );
            }
            Some(LifecycleMessage::Ended) => {
                log::debug!("[session] playback end message received");
                self.restart(transport, renderer);
            }
            None => {
                // The player echoes the whole score text while compiling.
                if line.trim_start().starts_with("<CsoundSynthesizer>") {
                    return;
                }
                log::debug!("[csound] {line}");
            }
        }
    }

    fn on_started<T, R>(&mut self, score_time: Option<f64>, transport: &mut T, renderer: &mut R)
    where
        T: AudioTransport + ?Sized,
        R: InstanceRenderer + ?Sized,
    {
        let lead_in =
            self.config.score_lead_in_sec - self.config.latency_compensation * transport.latency();
        // Playback already past the lead-in when the message was emitted.
        let overshoot = score_time.map_or(0.0, |t| (t - self.config.score_lead_in_sec).max(0.0));
        self.clock.start_time = transport.current_time() - lead_in - overshoot;
        self.clock.is_started = true;
        if self.animators.is_none() {
            self.animators = Some(Animators::new(&self.score, &self.config, renderer));
        }
        self.listener.flush(transport);
        log::info!(
            "[session] playback started (score time {:?}), start time = {:.3}",
            score_time,
            self.clock.start_time
        );
    }

    /// Full rewind after the score has ended: every animator and the player.
    pub fn restart<T, R>(&mut self, transport: &mut T, renderer: &mut R)
    where
        T: AudioTransport + ?Sized,
        R: InstanceRenderer + ?Sized,
    {
        log::debug!("[session] restarting ...");
        self.clock.is_started = false;
        if let Some(animators) = &mut self.animators {
            animators.reset(renderer);
        }
        self.rewound = true;
        transport.rewind();
        self.clock.restart_count += 1;
        log::info!("[session] restart count = {}", self.clock.restart_count);
    }

    /// Advance every animator to the current transport time.
    ///
    /// Before playback has started this only makes sure the animators are
    /// rewound. Returns `None` when nothing was animated.
    pub fn frame<T, R>(
        &mut self,
        transport: &T,
        delta_time: f32,
        camera_position: Vec3,
        renderer: &mut R,
    ) -> Option<SessionFrame>
    where
        T: AudioTransport + ?Sized,
        R: InstanceRenderer + ?Sized,
    {
        let animators = self.animators.as_mut()?;
        if !self.clock.is_started {
            if !self.rewound {
                animators.reset(renderer);
                self.rewound = true;
            }
            return None;
        }
        if self.is_paused {
            return None;
        }
        self.rewound = false;

        let elapsed = transport.current_time() - self.clock.start_time;
        let echo = animators.echo.render(elapsed, renderer);
        let points = animators.points.render(elapsed, renderer);
        animators
            .bubbles
            .render(elapsed, delta_time, camera_position, renderer);
        Some(SessionFrame {
            elapsed,
            echo,
            points,
        })
    }

    /// Fixed-rate listener update; writes the pose only if it moved.
    pub fn listener_tick<T: AudioTransport + ?Sized>(
        &mut self,
        camera_world: &Mat4,
        transport: &mut T,
    ) -> bool {
        self.listener
            .update(camera_world.to_cols_array(), self.clock.is_started, transport)
    }

    pub fn pause<T: AudioTransport + ?Sized>(&mut self, transport: &mut T) {
        if !self.clock.is_started || self.is_paused {
            return;
        }
        self.is_paused = true;
        transport.set_paused(true);
        log::debug!("[session] paused");
    }

    pub fn resume<T: AudioTransport + ?Sized>(&mut self, transport: &mut T) {
        if !self.is_paused {
            return;
        }
        self.is_paused = false;
        transport.set_paused(false);
        log::debug!("[session] resumed");
    }

    /// Session time in seconds, or zero before playback has started.
    pub fn elapsed<T: AudioTransport + ?Sized>(&self, transport: &T) -> f64 {
        if self.clock.is_started {
            transport.current_time() - self.clock.start_time
        } else {
            0.0
        }
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn animators(&self) -> Option<&Animators> {
        self.animators.as_ref()
    }

    pub fn score(&self) -> &ScoreData {
        &self.score
    }
}

//! Frame and fixed-interval callback scheduling.
//!
//! The host calls [`Scheduler::tick`] once per displayed frame with a shared
//! context. Frame callbacks run on every tick with the elapsed time since the
//! previous one; interval callbacks run whenever their period has elapsed, at
//! most once per tick.

use instant::Instant;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    pub now: f64,
    pub delta_time: f32,
}

type FrameCallback<C> = Box<dyn FnMut(&mut C, FrameTime)>;
type IntervalCallback<C> = Box<dyn FnMut(&mut C)>;

struct IntervalTask<C> {
    period: f64,
    next_due: Option<f64>,
    callback: IntervalCallback<C>,
}

pub struct Scheduler<C> {
    frame_callbacks: Vec<FrameCallback<C>>,
    intervals: Vec<IntervalTask<C>>,
    last_tick: Option<f64>,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self {
            frame_callbacks: Vec::new(),
            intervals: Vec::new(),
            last_tick: None,
        }
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_every_frame(
        &mut self,
        callback: impl FnMut(&mut C, FrameTime) + 'static,
    ) -> &mut Self {
        self.frame_callbacks.push(Box::new(callback));
        self
    }

    /// Run `callback` every `period`, first one period after the first tick.
    pub fn on_fixed_interval(
        &mut self,
        period: Duration,
        callback: impl FnMut(&mut C) + 'static,
    ) -> &mut Self {
        self.intervals.push(IntervalTask {
            period: period.as_secs_f64(),
            next_due: None,
            callback: Box::new(callback),
        });
        self
    }

    pub fn tick(&mut self, ctx: &mut C, now: f64) {
        let delta_time = self
            .last_tick
            .map(|last| (now - last).max(0.0))
            .unwrap_or(0.0) as f32;
        self.last_tick = Some(now);

        let frame = FrameTime { now, delta_time };
        for callback in &mut self.frame_callbacks {
            callback(ctx, frame);
        }

        for task in &mut self.intervals {
            let due = *task.next_due.get_or_insert(now + task.period);
            if now < due {
                continue;
            }
            (task.callback)(ctx);
            let next = due + task.period;
            // Skip missed periods instead of bursting to catch up.
            task.next_due = Some(if next <= now { now + task.period } else { next });
        }
    }
}

/// Seconds elapsed since construction, for hosts without their own clock.
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    origin: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_sec(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

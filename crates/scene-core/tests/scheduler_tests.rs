// Tests for frame and fixed-interval scheduling.

use scene_core::{FrameTime, Scheduler, WallClock};
use std::time::Duration;

#[derive(Default)]
struct Ctx {
    frames: Vec<FrameTime>,
    interval_hits: Vec<usize>,
    ticks: usize,
}

#[test]
fn frame_callbacks_receive_delta_since_previous_tick() {
    let mut scheduler = Scheduler::<Ctx>::new();
    scheduler.on_every_frame(|ctx, frame| ctx.frames.push(frame));
    let mut ctx = Ctx::default();

    for now in [1.0, 1.016, 1.05] {
        scheduler.tick(&mut ctx, now);
    }
    let deltas: Vec<f32> = ctx.frames.iter().map(|f| f.delta_time).collect();
    assert_eq!(deltas[0], 0.0);
    assert!((deltas[1] - 0.016).abs() < 1e-5);
    assert!((deltas[2] - 0.034).abs() < 1e-5);
    assert_eq!(ctx.frames[2].now, 1.05);
}

#[test]
fn interval_callback_runs_once_per_period() {
    let mut scheduler = Scheduler::<Ctx>::new();
    scheduler
        .on_every_frame(|ctx, _| ctx.ticks += 1)
        .on_fixed_interval(Duration::from_millis(250), |ctx| {
            let tick = ctx.ticks;
            ctx.interval_hits.push(tick);
        });
    let mut ctx = Ctx::default();

    for k in 0..=16 {
        scheduler.tick(&mut ctx, k as f64 * 0.125);
    }
    // Due at 0.25, 0.5, ... 2.0; frame callbacks run first within a tick.
    assert_eq!(ctx.interval_hits, vec![3, 5, 7, 9, 11, 13, 15, 17]);
}

#[test]
fn missed_periods_are_not_replayed() {
    let mut scheduler = Scheduler::<Ctx>::new();
    scheduler.on_fixed_interval(Duration::from_millis(250), |ctx| ctx.interval_hits.push(0));
    let mut ctx = Ctx::default();

    scheduler.tick(&mut ctx, 0.0);
    // A long stall covers three periods but fires once.
    scheduler.tick(&mut ctx, 1.0);
    assert_eq!(ctx.interval_hits.len(), 1);
    scheduler.tick(&mut ctx, 1.1);
    assert_eq!(ctx.interval_hits.len(), 1);
    scheduler.tick(&mut ctx, 1.25);
    assert_eq!(ctx.interval_hits.len(), 2);
}

#[test]
fn wall_clock_does_not_go_backwards() {
    let clock = WallClock::new();
    let a = clock.now_sec();
    let b = clock.now_sec();
    assert!(a >= 0.0);
    assert!(b >= a);
}

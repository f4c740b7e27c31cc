// Tests for monotonic timeline cursors.

use rand::prelude::*;
use scene_core::{NoteTimelineCursor, TimedEvent, TimelineEntry};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Ev {
    time: f64,
}

impl TimedEvent for Ev {
    fn on_time(&self) -> f64 {
        self.time
    }
}

fn times(events: &[Ev]) -> Vec<f64> {
    events.iter().map(|e| e.time).collect()
}

fn cursor() -> NoteTimelineCursor<Ev> {
    NoteTimelineCursor::new(vec![Ev { time: 1.0 }, Ev { time: 3.0 }, Ev { time: 5.0 }])
}

#[test]
fn advance_on_yields_each_event_once() {
    let mut c = cursor();
    assert!(c.advance_on_events(0.0).is_empty());
    assert_eq!(times(c.advance_on_events(2.0)), vec![1.0]);
    assert_eq!(times(c.advance_on_events(5.0)), vec![3.0, 5.0]);
    // Re-calling at the same time is idempotent.
    assert!(c.advance_on_events(5.0).is_empty());
    assert!(c.is_exhausted());
}

#[test]
fn advance_returns_crossed_index_range() {
    let mut c = cursor();
    assert_eq!(c.advance_on(3.0), 0..2);
    assert_eq!(c.advance_on(3.5), 2..2);
    assert_eq!(c.advance_on(10.0), 2..3);
}

#[test]
fn off_index_follows_release_times() {
    let entries = vec![
        TimelineEntry::new(1.0, 2.0, 'a'),
        TimelineEntry::new(1.5, 2.5, 'b'),
        TimelineEntry::new(4.0, 5.0, 'c'),
    ];
    let mut c = NoteTimelineCursor::new(entries);
    assert_eq!(c.advance_on(1.5), 0..2);
    assert_eq!(c.advance_off(1.5), 0..0);
    assert_eq!(c.advance_off(2.0), 0..1);
    let released: Vec<char> = c.advance_off_events(3.0).iter().map(|e| e.data).collect();
    assert_eq!(released, vec!['b']);
    assert_eq!(c.on_index(), 2);
    assert_eq!(c.off_index(), 2);
}

#[test]
fn reset_reproduces_fresh_cursor_output() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let mut t = 0.0;
        let events: Vec<Ev> = (0..rng.gen_range(0..30))
            .map(|_| {
                t += rng.gen_range(0.0..2.0);
                Ev { time: t }
            })
            .collect();
        let mut used = NoteTimelineCursor::new(events.clone());
        let mut probe = 0.0;
        for _ in 0..rng.gen_range(0..10) {
            probe += rng.gen_range(0.0..5.0);
            used.advance_on(probe);
            used.advance_off(probe);
        }
        used.reset();

        let target = rng.gen_range(0.0..60.0);
        let mut fresh = NoteTimelineCursor::new(events);
        assert_eq!(used.advance_on_events(target), fresh.advance_on_events(target));
        assert_eq!(used.advance_off_events(target), fresh.advance_off_events(target));
    }
}

#[test]
fn placeholders_never_appear_in_output() {
    let events = vec![
        Ev { time: 0.005 },
        Ev { time: 0.005 },
        Ev { time: 0.5 },
        Ev { time: 0.005 },
        Ev { time: 1.0 },
    ];
    let mut c = NoteTimelineCursor::without(events, |e| scene_core::is_preallocation_time(e.time));
    assert_eq!(c.len(), 2);
    assert!(c.advance_on_events(0.005).is_empty());
    assert_eq!(times(c.advance_on_events(1.0)), vec![0.5, 1.0]);
    c.reset();
    // Reset lands on the first real note, not on a placeholder.
    assert_eq!(times(c.advance_on_events(0.5)), vec![0.5]);
}

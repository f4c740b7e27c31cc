//! Incremental scanning of a time-sorted event array.
//!
//! A [`NoteTimelineCursor`] keeps two monotonic indices into its events, one
//! for onsets and one for releases. Each frame the caller advances them to the
//! current transport time and receives only the events crossed since the last
//! call, so per-frame cost is proportional to the number of new transitions
//! rather than to the length of the timeline.
//!
//! The events must be sorted by onset (and, for the off index, by release).
//! This is a caller contract: unsorted input silently skips or reorders
//! events, and feeding a decreasing time between resets leaves stale state.

use std::ops::Range;

/// Anything with an onset time, and optionally a distinct release time.
pub trait TimedEvent {
    fn on_time(&self) -> f64;

    /// Release time. Defaults to the onset for events without a duration.
    fn off_time(&self) -> f64 {
        self.on_time()
    }
}

/// An on/off interval with an attached payload, used for derived timelines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineEntry<T> {
    pub on: f64,
    pub off: f64,
    pub data: T,
}

impl<T> TimelineEntry<T> {
    pub fn new(on: f64, off: f64, data: T) -> Self {
        Self { on, off, data }
    }
}

impl<T> TimedEvent for TimelineEntry<T> {
    fn on_time(&self) -> f64 {
        self.on
    }
    fn off_time(&self) -> f64 {
        self.off
    }
}

#[derive(Clone, Debug)]
pub struct NoteTimelineCursor<E> {
    events: Vec<E>,
    on_index: usize,
    off_index: usize,
}

impl<E: TimedEvent> NoteTimelineCursor<E> {
    pub fn new(events: Vec<E>) -> Self {
        Self {
            events,
            on_index: 0,
            off_index: 0,
        }
    }

    /// Build a cursor with every event matching `is_placeholder` removed.
    ///
    /// Placeholders may be interleaved anywhere in the input; they never show
    /// up in cursor output.
    pub fn without(mut events: Vec<E>, is_placeholder: impl Fn(&E) -> bool) -> Self {
        events.retain(|e| !is_placeholder(e));
        Self::new(events)
    }

    /// Advance the onset index past every event with `on_time <= time`.
    ///
    /// Returns the indices crossed by this call (possibly empty).
    pub fn advance_on(&mut self, time: f64) -> Range<usize> {
        let start = self.on_index;
        while self.on_index < self.events.len() && self.events[self.on_index].on_time() <= time {
            self.on_index += 1;
        }
        start..self.on_index
    }

    /// Advance the release index past every event with `off_time <= time`.
    pub fn advance_off(&mut self, time: f64) -> Range<usize> {
        let start = self.off_index;
        while self.off_index < self.events.len() && self.events[self.off_index].off_time() <= time {
            self.off_index += 1;
        }
        start..self.off_index
    }

    /// Same as [`advance_on`](Self::advance_on) but yields the events themselves.
    pub fn advance_on_events(&mut self, time: f64) -> &[E] {
        let range = self.advance_on(time);
        &self.events[range]
    }

    pub fn advance_off_events(&mut self, time: f64) -> &[E] {
        let range = self.advance_off(time);
        &self.events[range]
    }

    /// Rewind both indices to the first event.
    pub fn reset(&mut self) {
        self.on_index = 0;
        self.off_index = 0;
    }
}

impl<E> NoteTimelineCursor<E> {
    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn on_index(&self) -> usize {
        self.on_index
    }

    pub fn off_index(&self) -> usize {
        self.off_index
    }

    /// True once every onset has been crossed.
    pub fn is_exhausted(&self) -> bool {
        self.on_index >= self.events.len()
    }
}

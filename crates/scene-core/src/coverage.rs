//! Maximum overlap of a set of half-open note intervals.
//!
//! The map keeps a sorted, non-overlapping list of time segments, each tagged
//! with how many inserted intervals cover it. Inserting splits segments at the
//! new interval's bounds and bumps the tallies of everything it covers. An
//! interval `[on, off)` counts as active for `on <= t < off`, so touching
//! intervals never overlap and zero-length intervals contribute nothing.
//!
//! Insertion is linear in the number of segments, so building the map is
//! quadratic overall. It runs once at load time.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoverageError {
    #[error("interval ends before it starts ({on} > {off})")]
    Reversed { on: f64, off: f64 },
    #[error("interval bounds must be finite ({on}, {off})")]
    NonFinite { on: f64, off: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl Segment {
    fn new(start: f64, end: f64, count: usize) -> Self {
        Self { start, end, count }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CoverageMap {
    segments: Vec<Segment>,
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one `[on, off)` interval.
    ///
    /// Zero-length intervals are accepted and ignored. Reversed or non-finite
    /// bounds are rejected and leave the map untouched.
    pub fn insert(&mut self, on: f64, off: f64) -> Result<(), CoverageError> {
        if !on.is_finite() || !off.is_finite() {
            return Err(CoverageError::NonFinite { on, off });
        }
        if off < on {
            return Err(CoverageError::Reversed { on, off });
        }
        if off == on {
            return Ok(());
        }

        let old = std::mem::take(&mut self.segments);
        let mut out = Vec::with_capacity(old.len() + 3);
        // `cursor` is the start of the part of [on, off) not yet accounted for.
        let mut cursor = on;
        for seg in old {
            if cursor >= off || seg.end <= cursor {
                out.push(seg);
                continue;
            }
            if seg.start >= off {
                out.push(Segment::new(cursor, off, 1));
                cursor = off;
                out.push(seg);
                continue;
            }
            if cursor < seg.start {
                out.push(Segment::new(cursor, seg.start, 1));
                cursor = seg.start;
            }
            if seg.start < cursor {
                out.push(Segment::new(seg.start, cursor, seg.count));
            }
            let end = seg.end.min(off);
            out.push(Segment::new(cursor, end, seg.count + 1));
            if end < seg.end {
                out.push(Segment::new(end, seg.end, seg.count));
            }
            cursor = end;
        }
        if cursor < off {
            out.push(Segment::new(cursor, off, 1));
        }
        self.segments = out;
        Ok(())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Exact maximum number of simultaneously active intervals.
    pub fn max_overlap(&self) -> usize {
        self.segments.iter().map(|s| s.count).max().unwrap_or(0)
    }
}

/// Number of pool slots needed to give every concurrently sounding note its
/// own slot: the maximum overlap plus one spare.
///
/// Malformed intervals are logged and skipped.
pub fn coverage_slot_count(intervals: impl IntoIterator<Item = (f64, f64)>) -> usize {
    let mut map = CoverageMap::new();
    for (on, off) in intervals {
        if let Err(e) = map.insert(on, off) {
            log::warn!("[coverage] skipping interval: {e}");
        }
    }
    map.max_overlap() + 1
}

//! Pre-parsed note data consumed by the effect animators.
//!
//! Each effect reads its own time-sorted array of [`NoteEvent`]s. The record
//! shape is shared; effect-specific fields live in the `extra` payload.

use crate::constants::{PREALLOCATION_TIME_SEC, PREALLOCATION_TIME_TOLERANCE};
use crate::cursor::TimedEvent;
use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;

/// A single note onset from the precomputed score.
///
/// Fields:
/// - `time`: onset in seconds, relative to the start of the score
/// - `note_number`: MIDI note number
/// - `velocity`: MIDI velocity 0..127
/// - `extra`: effect-specific payload
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent<X> {
    pub time: f64,
    #[serde(default)]
    pub note_number: i32,
    #[serde(default)]
    pub velocity: u8,
    #[serde(flatten)]
    pub extra: X,
}

impl<X> NoteEvent<X> {
    pub fn new(time: f64, note_number: i32, velocity: u8, extra: X) -> Self {
        Self {
            time,
            note_number,
            velocity,
            extra,
        }
    }

    /// True for the sentinel notes that only warm up the synth voice pool.
    pub fn is_preallocation(&self) -> bool {
        is_preallocation_time(self.time)
    }
}

impl<X> TimedEvent for NoteEvent<X> {
    fn on_time(&self) -> f64 {
        self.time
    }
}

#[inline]
pub fn is_preallocation_time(time: f64) -> bool {
    (time - PREALLOCATION_TIME_SEC).abs() < PREALLOCATION_TIME_TOLERANCE
}

/// Echo notes carry nothing beyond pitch and onset; taps are derived at setup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct EchoExtra {}

/// Point notes are drawn at a fixed world position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct PointExtra {
    pub position: Vec3,
}

/// Bubble triggers address one ground grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct BubbleExtra {
    pub column: usize,
    pub row: usize,
}

pub type EchoNote = NoteEvent<EchoExtra>;
pub type PointNote = NoteEvent<PointExtra>;
pub type BubbleNote = NoteEvent<BubbleExtra>;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("{effect} timeline is not time-sorted at index {index} ({previous} > {current})")]
    UnsortedTimeline {
        effect: &'static str,
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("bubble trigger {index} addresses cell ({column}, {row}) outside the {columns}x{rows} grid")]
    GridCellOutOfRange {
        index: usize,
        column: usize,
        row: usize,
        columns: usize,
        rows: usize,
    },
    #[error("note data could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The complete note timeline for one playback session, one array per effect.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ScoreData {
    #[serde(default)]
    pub echo: Vec<EchoNote>,
    #[serde(default)]
    pub points: Vec<PointNote>,
    #[serde(default)]
    pub bubbles: Vec<BubbleNote>,
}

impl ScoreData {
    pub fn from_json_str(json: &str) -> Result<Self, ScoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the load-time preconditions the per-frame cursors rely on.
    ///
    /// This is the only place sortedness is verified; the animators themselves
    /// trust their input.
    pub fn validate(&self, grid_columns: usize, grid_rows: usize) -> Result<(), ScoreError> {
        check_sorted("echo", &self.echo)?;
        check_sorted("points", &self.points)?;
        check_sorted("bubbles", &self.bubbles)?;
        for (index, note) in self.bubbles.iter().enumerate() {
            let BubbleExtra { column, row } = note.extra;
            if column >= grid_columns || row >= grid_rows {
                return Err(ScoreError::GridCellOutOfRange {
                    index,
                    column,
                    row,
                    columns: grid_columns,
                    rows: grid_rows,
                });
            }
        }
        Ok(())
    }

    /// Latest onset across every effect; the score is over shortly after.
    pub fn last_onset(&self) -> f64 {
        let echo = self.echo.last().map(|n| n.time);
        let points = self.points.last().map(|n| n.time);
        let bubbles = self.bubbles.last().map(|n| n.time);
        [echo, points, bubbles]
            .into_iter()
            .flatten()
            .fold(0.0, f64::max)
    }
}

fn check_sorted<X>(effect: &'static str, notes: &[NoteEvent<X>]) -> Result<(), ScoreError> {
    for (index, pair) in notes.windows(2).enumerate() {
        if pair[1].time < pair[0].time {
            return Err(ScoreError::UnsortedTimeline {
                effect,
                index: index + 1,
                previous: pair[0].time,
                current: pair[1].time,
            });
        }
    }
    Ok(())
}

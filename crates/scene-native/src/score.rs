use std::path::Path;

use anyhow::Context;
use glam::Vec3;
use rand::prelude::*;
use scene_core::{
    BubbleExtra, BubbleNote, EchoExtra, EchoNote, PointExtra, PointNote, ScoreData,
    BUBBLE_GRID_COLUMNS, BUBBLE_GRID_ROWS, PREALLOCATION_TIME_SEC, SCORE_LEAD_IN_SEC,
};

const C_MINOR_PENTATONIC: [i32; 5] = [0, 3, 5, 7, 10];
const DEMO_ROOT_NOTE: i32 = 48;
const DEMO_LENGTH_SEC: f64 = 90.0;
const DEMO_BEAT_SEC: f64 = 0.75;
const DEMO_VOICES: usize = 8; // placeholder notes that warm up the synth

/// Read a score from a JSON file, or generate the demo score when no path is given.
pub fn load_score(path: Option<&Path>, seed: u64) -> anyhow::Result<ScoreData> {
    let score = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading note data from {}", path.display()))?;
            ScoreData::from_json_str(&json)
                .with_context(|| format!("decoding note data from {}", path.display()))?
        }
        None => demo_score(seed),
    };
    score.validate(BUBBLE_GRID_COLUMNS, BUBBLE_GRID_ROWS)?;
    log::info!(
        "[score] echo={} points={} bubbles={} last onset {:.1}s",
        score.echo.len(),
        score.points.len(),
        score.bubbles.len(),
        score.last_onset()
    );
    Ok(score)
}

/// A deterministic score exercising every effect.
///
/// Placeholder notes come first, as a real score's voice warm-up does; the
/// music starts once the lead-in has passed.
pub fn demo_score(seed: u64) -> ScoreData {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut score = ScoreData::default();

    for _ in 0..DEMO_VOICES {
        score
            .echo
            .push(EchoNote::new(PREALLOCATION_TIME_SEC, DEMO_ROOT_NOTE, 0, EchoExtra {}));
        score.points.push(PointNote::new(
            PREALLOCATION_TIME_SEC,
            DEMO_ROOT_NOTE,
            0,
            PointExtra::default(),
        ));
    }

    let first_beat = SCORE_LEAD_IN_SEC + 1.0;
    let beats = ((DEMO_LENGTH_SEC - first_beat) / DEMO_BEAT_SEC) as usize;
    for beat in 0..beats {
        let time = first_beat + beat as f64 * DEMO_BEAT_SEC;
        if rng.gen_bool(0.7) {
            score.echo.push(EchoNote::new(
                time,
                scale_note(&mut rng, 2),
                rng.gen_range(64..=120),
                EchoExtra {},
            ));
        }
        // Off-beat sparkle.
        for _ in 0..rng.gen_range(0..3) {
            let jitter = rng.gen_range(0.0..DEMO_BEAT_SEC);
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let radius = rng.gen_range(60.0..180.0f32);
            let height = rng.gen_range(20.0..160.0f32);
            score.points.push(PointNote::new(
                time + jitter,
                scale_note(&mut rng, 3) + 12,
                rng.gen_range(40..=100),
                PointExtra {
                    position: Vec3::new(radius * angle.sin(), height, radius * angle.cos()),
                },
            ));
        }
        if beat % 2 == 0 {
            score.bubbles.push(BubbleNote::new(
                time,
                DEMO_ROOT_NOTE - 12,
                100,
                BubbleExtra {
                    column: rng.gen_range(0..BUBBLE_GRID_COLUMNS),
                    row: rng.gen_range(0..BUBBLE_GRID_ROWS),
                },
            ));
        }
    }

    score.echo.sort_by(|a, b| a.time.total_cmp(&b.time));
    score.points.sort_by(|a, b| a.time.total_cmp(&b.time));
    score.bubbles.sort_by(|a, b| a.time.total_cmp(&b.time));
    score
}

fn scale_note(rng: &mut StdRng, octaves: i32) -> i32 {
    let degree = C_MINOR_PENTATONIC[rng.gen_range(0..C_MINOR_PENTATONIC.len())];
    DEMO_ROOT_NOTE + 12 * rng.gen_range(0..octaves) + degree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_score_is_sorted_and_in_range() {
        let score = demo_score(7);
        assert!(score.validate(BUBBLE_GRID_COLUMNS, BUBBLE_GRID_ROWS).is_ok());
        assert!(score.echo[0].is_preallocation());
        assert!(score.echo.iter().any(|n| !n.is_preallocation()));
        assert!(!score.points.is_empty());
        assert!(!score.bubbles.is_empty());
        // Real notes wait for the lead-in.
        assert!(score
            .echo
            .iter()
            .filter(|n| !n.is_preallocation())
            .all(|n| n.time > SCORE_LEAD_IN_SEC));
    }

    #[test]
    fn demo_score_is_deterministic() {
        let a = demo_score(42);
        let b = demo_score(42);
        assert_eq!(a.echo, b.echo);
        assert_eq!(a.points, b.points);
    }
}

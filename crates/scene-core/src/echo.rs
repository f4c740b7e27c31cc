//! Distance-delay echo effect.
//!
//! Every distinct note number gets a column of pillars: one per delay tap,
//! each tap further from the centre and each drawn three times, 120 degrees
//! apart. When a tap sounds, its pillars are swapped for a glow overlay taken
//! round-robin from a pool sized to the timeline's peak concurrency.

use crate::constants::*;
use crate::coverage::coverage_slot_count;
use crate::cursor::{NoteTimelineCursor, TimelineEntry};
use crate::notes::EchoNote;
use crate::pool::{InstanceTriple, VisualInstancePool};
use crate::render::{InstanceRenderer, MeshKind};
use fnv::FnvHashMap;
use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;
use std::f32::consts::TAU;

/// Echo geometry and timing.
///
/// - `delay_count`: taps per note (the note itself is tap 0)
/// - `delay_time_sec`: spacing between taps
/// - `note_duration_sec`: how long each tap stays lit
/// - `lowest_note_offset`: semitones subtracted from the lowest played note to
///   get the height origin, so the lowest note does not sit on the ground
/// - `glow_pool_capacity`: override for the glow pool size; `None` sizes it
///   from the timeline's peak concurrency
#[derive(Clone, Debug)]
pub struct EchoConfig {
    pub delay_count: usize,
    pub delay_time_sec: f64,
    pub note_duration_sec: f64,
    pub lowest_note_offset: i32,
    pub base_radius: f32,
    pub radius_step: f32,
    pub height_per_semitone: f32,
    pub base_height: f32,
    pub pillar_scale: f32,
    pub glow_scale: f32,
    pub pillar_color: Vec3,
    pub glow_color: Vec3,
    pub glow_pool_capacity: Option<usize>,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            delay_count: ECHO_DELAY_COUNT,
            delay_time_sec: ECHO_DELAY_TIME_SEC,
            note_duration_sec: ECHO_NOTE_DURATION_SEC,
            lowest_note_offset: ECHO_LOWEST_NOTE_OFFSET,
            base_radius: ECHO_BASE_RADIUS,
            radius_step: ECHO_RADIUS_STEP,
            height_per_semitone: ECHO_HEIGHT_PER_SEMITONE,
            base_height: ECHO_BASE_HEIGHT,
            pillar_scale: ECHO_PILLAR_SCALE,
            glow_scale: ECHO_GLOW_SCALE,
            pillar_color: rgb(PILLAR_COLOR),
            glow_color: rgb(GLOW_COLOR),
            glow_pool_capacity: None,
        }
    }
}

/// One delayed repetition of a note at one radius.
#[derive(Clone, Debug)]
pub struct DelayTap {
    cursor: NoteTimelineCursor<TimelineEntry<()>>,
    /// Whether each interval was actually lit when its onset was crossed.
    lit: Vec<bool>,
    active: usize,
    pub instance_indexes: InstanceTriple,
    pillar_transforms: [Mat4; 3],
    glow_transforms: [Mat4; 3],
    pub glow_instance_index: Option<usize>,
    pub is_on: bool,
}

impl DelayTap {
    pub fn intervals(&self) -> &[TimelineEntry<()>] {
        self.cursor.events()
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.lit.iter_mut().for_each(|l| *l = false);
        self.active = 0;
        self.glow_instance_index = None;
        self.is_on = false;
    }
}

#[derive(Clone, Debug)]
pub struct Note {
    pub note_number: i32,
    pub delays: Vec<DelayTap>,
}

/// A tap changing state during one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TapTransition {
    pub note_number: i32,
    pub tap_index: usize,
    pub glow_slot: usize,
}

#[derive(Clone, Debug, Default)]
pub struct EchoFrame {
    pub turned_off: SmallVec<[TapTransition; 8]>,
    pub turned_on: SmallVec<[TapTransition; 8]>,
}

pub struct DelayedEchoAnimator {
    config: EchoConfig,
    notes: Vec<Note>,
    note_lookup: FnvHashMap<i32, usize>,
    lowest_note_number: i32,
    max_concurrent_notes: usize,
    glow_pool: VisualInstancePool<InstanceTriple>,
    /// `(note index, tap index)` currently displayed by each glow slot.
    glow_owner: Vec<Option<(usize, usize)>>,
}

impl DelayedEchoAnimator {
    /// One-time setup: derive every tap's intervals, place the pillars and
    /// size the glow pool.
    pub fn new<R: InstanceRenderer + ?Sized>(
        events: &[EchoNote],
        config: EchoConfig,
        renderer: &mut R,
    ) -> Self {
        let real = || events.iter().filter(|e| !e.is_preallocation());
        let lowest_note_number =
            real().map(|e| e.note_number).min().unwrap_or(0) - config.lowest_note_offset;

        // Distinct note numbers in order of first appearance.
        let mut note_lookup = FnvHashMap::default();
        let mut note_numbers = Vec::new();
        for e in real() {
            note_lookup.entry(e.note_number).or_insert_with(|| {
                note_numbers.push(e.note_number);
                note_numbers.len() - 1
            });
        }

        let delay_count = config.delay_count.max(1);
        let mut intervals: Vec<Vec<Vec<TimelineEntry<()>>>> =
            vec![vec![Vec::new(); delay_count]; note_numbers.len()];
        for e in real() {
            let note_index = note_lookup[&e.note_number];
            for (tap_index, tap) in intervals[note_index].iter_mut().enumerate() {
                let on = e.time + tap_index as f64 * config.delay_time_sec;
                tap.push(TimelineEntry::new(on, on + config.note_duration_sec, ()));
            }
        }

        let computed_slots = coverage_slot_count(
            intervals
                .iter()
                .flatten()
                .flatten()
                .map(|entry| (entry.on, entry.off)),
        );
        let max_concurrent_notes = computed_slots - 1;
        let capacity = config.glow_pool_capacity.unwrap_or(computed_slots);
        let glow_pool = VisualInstancePool::allocate(renderer, MeshKind::EchoGlow, capacity);
        for slot in 0..glow_pool.capacity() {
            for &h in glow_pool.slot(slot) {
                renderer.set_instance_color(h, config.glow_color);
            }
        }

        let notes = note_numbers
            .iter()
            .zip(intervals)
            .map(|(&note_number, taps)| {
                let delays = taps
                    .into_iter()
                    .enumerate()
                    .map(|(tap_index, entries)| {
                        let positions =
                            tap_positions(&config, lowest_note_number, note_number, tap_index);
                        let pillar_transforms = tap_transforms(positions, config.pillar_scale);
                        let glow_transforms = tap_transforms(positions, config.glow_scale);
                        let handles = renderer.allocate_instances(MeshKind::EchoPillar, 3);
                        let instance_indexes = [handles[0], handles[1], handles[2]];
                        for (h, m) in instance_indexes.iter().zip(pillar_transforms) {
                            renderer.set_instance_transform(*h, m);
                            renderer.set_instance_color(*h, config.pillar_color);
                            renderer.set_instance_visible(*h, true);
                        }
                        DelayTap {
                            lit: vec![false; entries.len()],
                            cursor: NoteTimelineCursor::new(entries),
                            active: 0,
                            instance_indexes,
                            pillar_transforms,
                            glow_transforms,
                            glow_instance_index: None,
                            is_on: false,
                        }
                    })
                    .collect();
                Note {
                    note_number,
                    delays,
                }
            })
            .collect::<Vec<_>>();

        log::info!(
            "[echo] notes={} taps={} lowest={} max_concurrent={} glow_slots={}",
            notes.len(),
            notes.len() * delay_count,
            lowest_note_number,
            max_concurrent_notes,
            glow_pool.capacity()
        );

        Self {
            config,
            notes,
            note_lookup,
            lowest_note_number,
            max_concurrent_notes,
            glow_owner: vec![None; glow_pool.capacity()],
            glow_pool,
        }
    }

    /// Advance every tap to `time`: releases first, then onsets.
    ///
    /// A tap taking a glow slot that is still lit steals it: the older tap
    /// falls back to its pillars and is reported in `turned_off`.
    pub fn render<R: InstanceRenderer + ?Sized>(
        &mut self,
        time: f64,
        renderer: &mut R,
    ) -> EchoFrame {
        let mut frame = EchoFrame::default();

        for (note_index, note) in self.notes.iter_mut().enumerate() {
            for (tap_index, tap) in note.delays.iter_mut().enumerate() {
                for i in tap.cursor.advance_off(time) {
                    if !tap.lit[i] {
                        continue;
                    }
                    tap.lit[i] = false;
                    tap.active -= 1;
                    if tap.active > 0 || !tap.is_on {
                        continue;
                    }
                    for &h in &tap.instance_indexes {
                        renderer.set_instance_visible(h, true);
                    }
                    let owned = tap
                        .glow_instance_index
                        .take()
                        .filter(|&slot| self.glow_owner[slot] == Some((note_index, tap_index)));
                    if let Some(slot) = owned {
                        self.glow_owner[slot] = None;
                        for &h in self.glow_pool.slot(slot) {
                            renderer.set_instance_visible(h, false);
                        }
                        frame.turned_off.push(TapTransition {
                            note_number: note.note_number,
                            tap_index,
                            glow_slot: slot,
                        });
                    }
                    tap.is_on = false;
                }
            }
        }

        for note_index in 0..self.notes.len() {
            let note_number = self.notes[note_index].note_number;
            for tap_index in 0..self.notes[note_index].delays.len() {
                let onsets = self.notes[note_index].delays[tap_index].cursor.advance_on(time);
                for i in onsets {
                    let tap = &mut self.notes[note_index].delays[tap_index];
                    if time >= tap.cursor.events()[i].off {
                        continue;
                    }
                    tap.lit[i] = true;
                    tap.active += 1;
                    if tap.is_on {
                        continue;
                    }
                    for &h in &tap.instance_indexes {
                        renderer.set_instance_visible(h, false);
                    }
                    let slot = self.glow_pool.next_slot();
                    for (&h, m) in self.glow_pool.slot(slot).iter().zip(tap.glow_transforms) {
                        renderer.set_instance_transform(h, m);
                        renderer.set_instance_visible(h, true);
                    }
                    tap.glow_instance_index = Some(slot);
                    tap.is_on = true;
                    frame.turned_on.push(TapTransition {
                        note_number,
                        tap_index,
                        glow_slot: slot,
                    });

                    let previous = self.glow_owner[slot].replace((note_index, tap_index));
                    if let Some((owner_note, owner_tap)) = previous {
                        let owner = &mut self.notes[owner_note].delays[owner_tap];
                        owner.glow_instance_index = None;
                        for &h in &owner.instance_indexes {
                            renderer.set_instance_visible(h, true);
                        }
                        log::debug!(
                            "[echo] glow slot {slot} taken from note {} tap {owner_tap}",
                            self.notes[owner_note].note_number
                        );
                        frame.turned_off.push(TapTransition {
                            note_number: self.notes[owner_note].note_number,
                            tap_index: owner_tap,
                            glow_slot: slot,
                        });
                    }
                }
            }
        }

        frame
    }

    /// Rewind every tap and restore the resting scene.
    pub fn reset<R: InstanceRenderer + ?Sized>(&mut self, renderer: &mut R) {
        for tap in self.notes.iter_mut().flat_map(|n| n.delays.iter_mut()) {
            tap.reset();
            for (&h, m) in tap.instance_indexes.iter().zip(tap.pillar_transforms) {
                renderer.set_instance_transform(h, m);
                renderer.set_instance_visible(h, true);
            }
        }
        for slot in 0..self.glow_pool.capacity() {
            for &h in self.glow_pool.slot(slot) {
                renderer.set_instance_visible(h, false);
            }
        }
        self.glow_owner.iter_mut().for_each(|o| *o = None);
        self.glow_pool.reset();
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn tap(&self, note_number: i32, tap_index: usize) -> Option<&DelayTap> {
        let note = &self.notes[*self.note_lookup.get(&note_number)?];
        note.delays.get(tap_index)
    }

    pub fn lowest_note_number(&self) -> i32 {
        self.lowest_note_number
    }

    /// Exact peak number of simultaneously lit taps over the whole timeline.
    pub fn max_concurrent_notes(&self) -> usize {
        self.max_concurrent_notes
    }

    pub fn glow_pool_capacity(&self) -> usize {
        self.glow_pool.capacity()
    }

    pub fn glow_slot(&self, slot: usize) -> &InstanceTriple {
        self.glow_pool.slot(slot)
    }

    pub fn config(&self) -> &EchoConfig {
        &self.config
    }
}

/// World positions of a tap's three rotated copies.
///
/// Height follows pitch, radius follows tap index, and the pitch class picks
/// an angle inside a 120 degree sector so the three copies tile the circle.
pub fn tap_positions(
    config: &EchoConfig,
    lowest_note_number: i32,
    note_number: i32,
    tap_index: usize,
) -> [Vec3; 3] {
    let semitones = (note_number - lowest_note_number) as f32;
    let y = config.base_height + semitones * config.height_per_semitone;
    let radius = config.base_radius + tap_index as f32 * config.radius_step;
    let sector = TAU / ECHO_ROTATION_COUNT as f32;
    let base_angle = note_number.rem_euclid(12) as f32 / 12.0 * sector;
    std::array::from_fn(|i| {
        let angle = base_angle + i as f32 * sector;
        Vec3::new(radius * angle.sin(), y, radius * angle.cos())
    })
}

fn tap_transforms(positions: [Vec3; 3], scale: f32) -> [Mat4; 3] {
    positions.map(|p| {
        let facing = Quat::from_rotation_y(p.x.atan2(p.z));
        Mat4::from_scale_rotation_translation(Vec3::splat(scale), facing, p)
    })
}

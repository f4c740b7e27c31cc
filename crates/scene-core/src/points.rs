//! Sparse point effect: short-lived billboards at fixed note positions.

use crate::constants::*;
use crate::cursor::{NoteTimelineCursor, TimelineEntry};
use crate::notes::PointNote;
use crate::pool::VisualInstancePool;
use crate::render::{InstanceHandle, InstanceRenderer, MeshKind};
use glam::{Mat4, Vec3};
use smallvec::SmallVec;

#[derive(Clone, Debug)]
pub struct PointConfig {
    pub fade_duration_sec: f64,
    pub instance_count: usize,
    pub note_scale: f32,
    pub backdrop_scale: f32,
    pub note_color: Vec3,
    pub backdrop_color: Vec3,
}

impl Default for PointConfig {
    fn default() -> Self {
        Self {
            fade_duration_sec: POINT_FADE_DURATION_SEC,
            instance_count: POINT_NOTE_INSTANCE_COUNT,
            note_scale: POINT_NOTE_SCALE,
            backdrop_scale: POINT_BACKDROP_SCALE,
            note_color: rgb(POINT_NOTE_COLOR),
            backdrop_color: rgb(POINT_BACKDROP_COLOR),
        }
    }
}

/// Indices (into [`SparsePointAnimator::entries`]) that changed this frame.
#[derive(Clone, Debug, Default)]
pub struct PointFrame {
    pub hidden: SmallVec<[usize; 8]>,
    pub shown: SmallVec<[usize; 8]>,
}

pub struct SparsePointAnimator {
    config: PointConfig,
    cursor: NoteTimelineCursor<TimelineEntry<Vec3>>,
    assigned: Vec<Option<usize>>,
    slot_owner: Vec<Option<usize>>,
    pool: VisualInstancePool<InstanceHandle>,
    backdrop: Vec<InstanceHandle>,
}

impl SparsePointAnimator {
    pub fn new<R: InstanceRenderer + ?Sized>(
        events: &[PointNote],
        config: PointConfig,
        renderer: &mut R,
    ) -> Self {
        let entries = events
            .iter()
            .map(|e| {
                TimelineEntry::new(e.time, e.time + config.fade_duration_sec, e.extra.position)
            })
            .collect::<Vec<_>>();
        let cursor = NoteTimelineCursor::without(entries, |e| {
            crate::notes::is_preallocation_time(e.on)
        });

        let pool = VisualInstancePool::allocate_single(
            renderer,
            MeshKind::PointNote,
            config.instance_count,
        );
        for slot in 0..pool.capacity() {
            renderer.set_instance_color(*pool.slot(slot), config.note_color);
        }

        // Static backdrop of every note position; never touched per frame.
        let backdrop = renderer.allocate_instances(MeshKind::PointBackdrop, cursor.len());
        for (h, e) in backdrop.iter().zip(cursor.events()) {
            renderer.set_instance_transform(*h, point_transform(e.data, config.backdrop_scale));
            renderer.set_instance_color(*h, config.backdrop_color);
            renderer.set_instance_visible(*h, true);
        }
        renderer.commit(MeshKind::PointBackdrop);

        log::info!(
            "[points] notes={} skipped_placeholders={} instances={}",
            cursor.len(),
            events.len() - cursor.len(),
            pool.capacity()
        );

        Self {
            assigned: vec![None; cursor.len()],
            slot_owner: vec![None; pool.capacity()],
            config,
            cursor,
            pool,
            backdrop,
        }
    }

    pub fn render<R: InstanceRenderer + ?Sized>(
        &mut self,
        time: f64,
        renderer: &mut R,
    ) -> PointFrame {
        let mut frame = PointFrame::default();

        for i in self.cursor.advance_off(time) {
            let Some(slot) = self.assigned[i].take() else {
                continue;
            };
            if self.slot_owner[slot] == Some(i) {
                renderer.set_instance_visible(*self.pool.slot(slot), false);
                self.slot_owner[slot] = None;
                frame.hidden.push(i);
            }
        }

        for i in self.cursor.advance_on(time) {
            let entry = self.cursor.events()[i];
            if time >= entry.off {
                continue;
            }
            let slot = self.pool.next_slot();
            if let Some(previous) = self.slot_owner[slot].replace(i) {
                self.assigned[previous] = None;
            }
            let h = *self.pool.slot(slot);
            renderer.set_instance_transform(h, point_transform(entry.data, self.config.note_scale));
            renderer.set_instance_visible(h, true);
            self.assigned[i] = Some(slot);
            frame.shown.push(i);
        }

        frame
    }

    /// Rewind to the first real note and hide every billboard.
    pub fn reset<R: InstanceRenderer + ?Sized>(&mut self, renderer: &mut R) {
        self.cursor.reset();
        self.assigned.iter_mut().for_each(|a| *a = None);
        self.slot_owner.iter_mut().for_each(|o| *o = None);
        for slot in 0..self.pool.capacity() {
            renderer.set_instance_visible(*self.pool.slot(slot), false);
        }
        self.pool.reset();
    }

    /// Real (non-placeholder) notes with their fade-out times.
    pub fn entries(&self) -> &[TimelineEntry<Vec3>] {
        self.cursor.events()
    }

    pub fn is_on(&self, entry_index: usize) -> bool {
        self.assigned.get(entry_index).is_some_and(|a| a.is_some())
    }

    pub fn assigned_slot(&self, entry_index: usize) -> Option<usize> {
        self.assigned.get(entry_index).copied().flatten()
    }

    pub fn instance(&self, slot: usize) -> InstanceHandle {
        *self.pool.slot(slot)
    }

    pub fn backdrop(&self) -> &[InstanceHandle] {
        &self.backdrop
    }
}

fn point_transform(position: Vec3, scale: f32) -> Mat4 {
    Mat4::from_scale_rotation_translation(Vec3::splat(scale), glam::Quat::IDENTITY, position)
}

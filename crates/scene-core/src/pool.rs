//! Fixed-capacity, round-robin reusable set of visual slots.
//!
//! The pool never fails and never tracks ownership: `next_slot` just hands out
//! the slot after the previous one, wrapping at capacity. A pool sized to the
//! timeline's peak concurrency therefore never hands a still-lit slot to a new
//! note. An undersized pool steals the oldest slot instead, which shows up as
//! a dropped highlight rather than an error.

use crate::render::{InstanceHandle, InstanceRenderer, MeshKind};
use glam::Mat4;

/// Three renderer instances drawing one slot at its three rotated positions.
pub type InstanceTriple = [InstanceHandle; 3];

#[derive(Clone, Debug)]
pub struct VisualInstancePool<S> {
    slots: Vec<S>,
    next: usize,
}

impl<S> VisualInstancePool<S> {
    /// Wrap pre-built slots. An empty slot list would make `next_slot`
    /// meaningless, so callers must supply at least one.
    pub fn from_slots(slots: Vec<S>) -> Self {
        debug_assert!(!slots.is_empty(), "visual instance pool needs at least one slot");
        Self { slots, next: 0 }
    }

    /// Index of the slot to use for the next note, advancing round-robin.
    pub fn next_slot(&mut self) -> usize {
        let index = self.next;
        self.next = (self.next + 1) % self.slots.len().max(1);
        index
    }

    pub fn slot(&self, index: usize) -> &S {
        &self.slots[index % self.slots.len()]
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

impl VisualInstancePool<InstanceTriple> {
    /// Allocate `capacity` triples from `mesh`, all hidden.
    pub fn allocate<R: InstanceRenderer + ?Sized>(
        renderer: &mut R,
        mesh: MeshKind,
        capacity: usize,
    ) -> Self {
        let capacity = capacity.max(1);
        let handles = renderer.allocate_instances(mesh, capacity * 3);
        let slots = handles
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect::<Vec<_>>();
        for &h in &handles {
            renderer.set_instance_transform(h, Mat4::ZERO);
            renderer.set_instance_visible(h, false);
        }
        Self::from_slots(slots)
    }
}

impl VisualInstancePool<InstanceHandle> {
    /// Allocate `capacity` single instances from `mesh`, all hidden.
    pub fn allocate_single<R: InstanceRenderer + ?Sized>(
        renderer: &mut R,
        mesh: MeshKind,
        capacity: usize,
    ) -> Self {
        let handles = renderer.allocate_instances(mesh, capacity.max(1));
        for &h in &handles {
            renderer.set_instance_transform(h, Mat4::ZERO);
            renderer.set_instance_visible(h, false);
        }
        Self::from_slots(handles)
    }
}

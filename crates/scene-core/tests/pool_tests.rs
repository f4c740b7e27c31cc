// Tests for round-robin visual instance pools.

use scene_core::{InstanceRenderer, MeshKind, RecordingRenderer, VisualInstancePool};

#[test]
fn next_slot_wraps_round_robin() {
    let mut pool = VisualInstancePool::from_slots(vec!['a', 'b', 'c']);
    let slots: Vec<usize> = (0..7).map(|_| pool.next_slot()).collect();
    assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn reset_starts_over_at_slot_zero() {
    let mut pool = VisualInstancePool::from_slots(vec![(); 4]);
    pool.next_slot();
    pool.next_slot();
    pool.reset();
    assert_eq!(pool.next_slot(), 0);
}

#[test]
fn allocate_builds_hidden_triples() {
    let mut renderer = RecordingRenderer::new();
    // Something allocated earlier on the same mesh must not be reused.
    let earlier = renderer.allocate_instances(MeshKind::EchoGlow, 2);
    let pool = VisualInstancePool::allocate(&mut renderer, MeshKind::EchoGlow, 3);

    assert_eq!(pool.capacity(), 3);
    assert_eq!(renderer.instances(MeshKind::EchoGlow).len(), 2 + 9);
    let mut seen = Vec::new();
    for slot in 0..pool.capacity() {
        for h in pool.slot(slot) {
            assert_eq!(h.mesh, MeshKind::EchoGlow);
            assert!(!earlier.contains(h));
            assert!(!renderer.instance(*h).visible);
            assert!(!seen.contains(h), "handle {h:?} shared between slots");
            seen.push(*h);
        }
    }
}

#[test]
fn allocate_never_builds_an_empty_pool() {
    let mut renderer = RecordingRenderer::new();
    let mut pool = VisualInstancePool::allocate_single(&mut renderer, MeshKind::PointNote, 0);
    assert_eq!(pool.capacity(), 1);
    assert_eq!(pool.next_slot(), 0);
    assert_eq!(pool.next_slot(), 0);
}

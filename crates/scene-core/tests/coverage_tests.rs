// Tests for the interval coverage map against a brute-force sweep.

use rand::prelude::*;
use scene_core::{coverage_slot_count, CoverageMap};

/// Reference sweep-line: releases sort before onsets at the same instant.
fn brute_force_max(intervals: &[(f64, f64)]) -> usize {
    let mut edges: Vec<(f64, i32)> = Vec::new();
    for &(on, off) in intervals {
        if off > on {
            edges.push((on, 1));
            edges.push((off, -1));
        }
    }
    edges.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
    let mut active = 0i32;
    let mut best = 0i32;
    for (_, delta) in edges {
        active += delta;
        best = best.max(active);
    }
    best as usize
}

fn exact(intervals: &[(f64, f64)]) -> usize {
    coverage_slot_count(intervals.iter().copied()) - 1
}

#[test]
fn empty_set_has_no_overlap() {
    assert_eq!(exact(&[]), 0);
    // The slot count always reserves one spare.
    assert_eq!(coverage_slot_count(std::iter::empty()), 1);
}

#[test]
fn single_interval() {
    assert_eq!(exact(&[(1.0, 2.0)]), 1);
}

#[test]
fn disjoint_intervals_do_not_overlap() {
    assert_eq!(exact(&[(1.0, 2.0), (3.0, 4.0)]), 1);
}

#[test]
fn touching_intervals_do_not_overlap() {
    // [1, 2) and [2, 3) share no instant.
    assert_eq!(exact(&[(1.0, 2.0), (2.0, 3.0)]), 1);
}

#[test]
fn identical_intervals_accumulate() {
    assert_eq!(exact(&[(1.0, 2.0), (1.0, 2.0)]), 2);
    assert_eq!(exact(&[(1.0, 2.0), (1.0, 2.0), (1.0, 2.0)]), 3);
}

#[test]
fn chain_of_neighbours_overlaps_pairwise() {
    let chain: Vec<(f64, f64)> = (0..50).map(|i| (i as f64, i as f64 + 1.5)).collect();
    assert_eq!(exact(&chain), 2);
}

#[test]
fn zero_length_and_reversed_intervals_are_ignored() {
    assert_eq!(exact(&[(1.0, 1.0), (1.0, 1.0)]), 0);
    assert_eq!(exact(&[(5.0, 1.0), (1.0, 2.0)]), 1);
}

#[test]
fn onset_on_existing_boundary() {
    let mut map = CoverageMap::new();
    map.insert(0.0, 2.0).unwrap();
    map.insert(2.0, 4.0).unwrap();
    map.insert(2.0, 3.0).unwrap();
    map.insert(0.0, 4.0).unwrap();
    assert_eq!(map.max_overlap(), 3);
    // Segments stay sorted and non-overlapping.
    for pair in map.segments().windows(2) {
        assert!(pair[0].end <= pair[1].start);
        assert!(pair[0].start < pair[0].end);
    }
}

#[test]
fn matches_brute_force_on_random_sets() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for round in 0..300 {
        let count = rng.gen_range(0..40);
        let intervals: Vec<(f64, f64)> = (0..count)
            .map(|_| {
                // Quantized times so shared boundaries and duplicates are common.
                let on = rng.gen_range(0..40) as f64 * 0.25;
                let len = rng.gen_range(0..12) as f64 * 0.25;
                (on, on + len)
            })
            .collect();
        assert_eq!(
            exact(&intervals),
            brute_force_max(&intervals),
            "round {round}: {intervals:?}"
        );
    }
}

#[test]
fn random_sets_keep_segment_invariants() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut map = CoverageMap::new();
    for _ in 0..500 {
        let on: f64 = rng.gen_range(0.0..100.0);
        let off = on + rng.gen_range(0.0..10.0);
        map.insert(on, off).unwrap();
    }
    for pair in map.segments().windows(2) {
        assert!(pair[0].end <= pair[1].start, "segments overlap: {pair:?}");
    }
    assert!(map.segments().iter().all(|s| s.count > 0 && s.start < s.end));
}

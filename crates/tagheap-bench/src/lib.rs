//! Benchmark heap profiles.
//!
//! - [`fresh_heap`]: one free block spanning the arena
//! - [`fragmented_heap`]: a free list whose newest entries are all too
//!   small for a large request, so `allocate` has to walk past them
//! - [`churned_heap`]: the state a seeded random workload leaves behind

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tagheap::{Allocation, Heap, TAG_SIZE};
use tagheap_test_utils::{Workload, WorkloadConfig};

/// Arena size used by the default profiles.
pub const ARENA_BYTES: usize = 1 << 20;

/// A pristine heap over `len` zeroed bytes.
pub fn fresh_heap(len: usize) -> Heap<Vec<u8>> {
    Heap::new(vec![0u8; len]).unwrap()
}

/// A heap whose free list starts with `holes` free blocks of `hole_size`
/// payload bytes, each fenced by an occupied guard. The initial remainder
/// sits at the tail of the list.
///
/// Returns the heap and the guards, which stay live.
pub fn fragmented_heap(len: usize, holes: usize, hole_size: usize) -> (Heap<Vec<u8>>, Vec<Allocation>) {
    let mut heap = fresh_heap(len);
    let mut guards = Vec::with_capacity(holes + 1);
    let mut hole_list = Vec::with_capacity(holes);
    guards.push(heap.allocate(TAG_SIZE).unwrap());
    for _ in 0..holes {
        hole_list.push(heap.allocate(hole_size).unwrap());
        guards.push(heap.allocate(TAG_SIZE).unwrap());
    }
    for hole in hole_list {
        heap.free(hole).unwrap();
    }
    (heap, guards)
}

/// A heap after `steps` of mixed-size random churn with `seed`, and the
/// driver holding its live allocations.
pub fn churned_heap(len: usize, seed: u64, steps: usize) -> (Heap<Vec<u8>>, Workload) {
    let mut heap = fresh_heap(len);
    let mut workload = Workload::new(WorkloadConfig {
        steps,
        ..WorkloadConfig::new(seed)
    });
    workload.run(&mut heap).unwrap();
    (heap, workload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragmented_profile_has_expected_free_list() {
        let (heap, guards) = fragmented_heap(64 * 1024, 100, 2 * TAG_SIZE);
        assert_eq!(guards.len(), 101);
        assert_eq!(heap.free_list().count(), 101);
        assert_eq!(heap.free_list().last(), Some(0));
        heap.validate().unwrap();
    }

    #[test]
    fn churned_profile_is_valid() {
        let (heap, workload) = churned_heap(64 * 1024, 1, 1_000);
        heap.validate().unwrap();
        assert_eq!(heap.stats().occupied_blocks, workload.live_count());
    }
}

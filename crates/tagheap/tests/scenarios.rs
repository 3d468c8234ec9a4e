//! Integration test: end-to-end allocate/free scenarios against the public
//! API, checking sizes, offsets, and the return to the post-setup state.

use tagheap::{AllocError, Heap, HeapConfig, TAG_SIZE};
use tagheap_test_utils::fixtures::{paranoid_heap, Neighbours};

// ── Single block round trip ─────────────────────────────────────────

#[test]
fn allocate_then_free_restores_setup_state() {
    let mut heap = paranoid_heap(64);
    let before = heap.blocks().collect::<Vec<_>>();

    let p = heap.allocate(8).unwrap();
    assert_eq!(p.len(), 8);
    assert!(!heap.is_pristine());
    heap.free(p).unwrap();

    assert!(heap.is_pristine());
    assert_eq!(heap.blocks().collect::<Vec<_>>(), before);
    assert_eq!(heap.free_list().collect::<Vec<_>>(), vec![0]);
}

// ── Exhaustion ──────────────────────────────────────────────────────

#[test]
fn fixed_size_requests_fill_the_arena() {
    for len in [512, 4096, 4096 + 3 * TAG_SIZE, 10_000] {
        let mut heap = Heap::new(vec![0u8; len]).unwrap();
        let capacity = heap.capacity();
        let need = 16 + 2 * TAG_SIZE;

        let mut count = 0;
        loop {
            match heap.allocate(16) {
                Ok(_) => count += 1,
                Err(AllocError::OutOfMemory { requested }) => {
                    assert_eq!(requested, 16);
                    break;
                }
                Err(other) => panic!("unexpected {other}"),
            }
        }

        assert!(count * need <= capacity, "len {len}: {count} blocks overflow");
        assert!(capacity < count * need + need, "len {len}: only {count} blocks");
        heap.validate().unwrap();
    }
}

#[test]
fn out_of_memory_leaves_heap_untouched() {
    let mut heap = paranoid_heap(16);
    let _a = heap.allocate(4 * TAG_SIZE).unwrap();
    let blocks = heap.blocks().collect::<Vec<_>>();
    let list = heap.free_list().collect::<Vec<_>>();

    let err = heap.allocate(64 * TAG_SIZE).unwrap_err();
    assert!(matches!(err, AllocError::OutOfMemory { .. }));
    assert_eq!(heap.blocks().collect::<Vec<_>>(), blocks);
    assert_eq!(heap.free_list().collect::<Vec<_>>(), list);
}

// ── Coalescing neighbours ───────────────────────────────────────────

#[test]
fn adjacent_frees_merge_into_reusable_block() {
    let mut heap = paranoid_heap(64);
    let n = Neighbours::carve(&mut heap, 64, 48);
    let lower_size = heap.block_size(&n.lower).unwrap();
    let upper_size = heap.block_size(&n.upper).unwrap();
    assert_eq!(lower_size, 48 + 2 * TAG_SIZE);
    assert_eq!(upper_size, 64 + 2 * TAG_SIZE);

    heap.free(n.lower).unwrap();
    heap.free(n.upper).unwrap();

    let merged = heap
        .blocks()
        .find(|b| b.offset == n.lower.offset() - TAG_SIZE)
        .unwrap();
    assert!(merged.state.is_free());
    assert_eq!(merged.size, lower_size + upper_size);

    let reused = heap.allocate(lower_size + upper_size - 2 * TAG_SIZE).unwrap();
    assert_eq!(reused.offset(), n.lower.offset());
    assert_eq!(heap.block_size(&reused), Some(lower_size + upper_size));
}

#[test]
fn freeing_in_either_order_merges_the_same_way() {
    for upper_first in [false, true] {
        let mut heap = paranoid_heap(64);
        let n = Neighbours::carve(&mut heap, 5 * TAG_SIZE, 3 * TAG_SIZE);
        let expected = heap.block_size(&n.lower).unwrap() + heap.block_size(&n.upper).unwrap();

        if upper_first {
            heap.free(n.upper).unwrap();
            heap.free(n.lower).unwrap();
        } else {
            heap.free(n.lower).unwrap();
            heap.free(n.upper).unwrap();
        }

        assert_eq!(heap.free_list().next(), Some(n.lower.offset() - TAG_SIZE));
        let head = heap.blocks().find(|b| b.offset == n.lower.offset() - TAG_SIZE);
        assert_eq!(head.map(|b| b.size), Some(expected));

        heap.free(n.low_guard).unwrap();
        heap.free(n.high_guard).unwrap();
        assert!(heap.is_pristine());
    }
}

// ── Invalid frees ───────────────────────────────────────────────────

#[test]
fn strict_heap_rejects_double_free() {
    let mut heap = Heap::with_config(vec![0u8; 1024], HeapConfig::default()).unwrap();
    let _guard = heap.allocate(8).unwrap();
    let a = heap.allocate(32).unwrap();
    heap.free(a).unwrap();
    assert_eq!(
        heap.free(a),
        Err(AllocError::InvalidFree { offset: a.offset() })
    );
    heap.validate().unwrap();
}

// ── Buffer ownership ────────────────────────────────────────────────

#[test]
fn borrowed_and_array_buffers_work() {
    let mut backing = [0u8; 256];
    {
        let mut heap = Heap::new(&mut backing[..]).unwrap();
        let a = heap.allocate(10).unwrap();
        heap.payload_mut(&a).copy_from_slice(b"boundaries");
        assert_eq!(heap.payload(&a), b"boundaries");
        heap.free(a).unwrap();
        assert!(heap.is_pristine());
    }

    let mut heap = Heap::new([0u8; 256]).unwrap();
    let a = heap.allocate(1).unwrap();
    heap.free(a).unwrap();
    let buf: [u8; 256] = heap.into_inner();
    assert_eq!(buf.len(), 256);
}

//! Pre-built heaps and block layouts.

use tagheap::{Allocation, Heap, HeapConfig, TAG_SIZE};

/// A `Vec`-backed heap of `words` tag-sized words that validates itself
/// after every operation.
///
/// # Panics
///
/// Panics if `words` is too small to hold one free block.
pub fn paranoid_heap(words: usize) -> Heap<Vec<u8>> {
    Heap::with_config(vec![0u8; words * TAG_SIZE], HeapConfig::paranoid())
        .expect("fixture arena too small")
}

/// Two physically adjacent allocations, each fenced off from the rest of
/// the arena by an occupied guard block.
///
/// Low to high: `low_guard`, `lower`, `upper`, `high_guard`.
#[derive(Clone, Copy, Debug)]
pub struct Neighbours {
    /// Occupied block directly below `lower`.
    pub low_guard: Allocation,
    /// The lower of the two adjacent allocations.
    pub lower: Allocation,
    /// The upper of the two adjacent allocations.
    pub upper: Allocation,
    /// Occupied block directly above `upper`.
    pub high_guard: Allocation,
}

impl Neighbours {
    /// Build the layout in a pristine `heap`, requesting `upper_size` bytes
    /// for `upper` and `lower_size` bytes for `lower`.
    ///
    /// Allocations are carved from the high end of the single free block,
    /// so each one lands directly below the previous.
    ///
    /// # Panics
    ///
    /// Panics if the heap is not pristine or too small for four blocks.
    pub fn carve<B>(heap: &mut Heap<B>, upper_size: usize, lower_size: usize) -> Self
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        assert!(heap.is_pristine(), "neighbour fixture needs a pristine heap");
        let high_guard = heap.allocate(TAG_SIZE).expect("high guard");
        let upper = heap.allocate(upper_size).expect("upper block");
        let lower = heap.allocate(lower_size).expect("lower block");
        let low_guard = heap.allocate(TAG_SIZE).expect("low guard");

        let upper_end = upper.offset() - TAG_SIZE + heap.block_size(&upper).expect("upper tag");
        assert_eq!(upper_end, high_guard.offset() - TAG_SIZE);
        let lower_end = lower.offset() - TAG_SIZE + heap.block_size(&lower).expect("lower tag");
        assert_eq!(lower_end, upper.offset() - TAG_SIZE);

        Self {
            low_guard,
            lower,
            upper,
            high_guard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_are_adjacent_and_fenced() {
        let mut heap = paranoid_heap(64);
        let n = Neighbours::carve(&mut heap, 64, 48);
        assert!(n.low_guard.offset() < n.lower.offset());
        assert!(n.lower.offset() < n.upper.offset());
        assert!(n.upper.offset() < n.high_guard.offset());
        let occupied = heap.blocks().filter(|b| !b.state.is_free()).count();
        assert_eq!(occupied, 4);
    }
}

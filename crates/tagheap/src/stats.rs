//! Read-only views of the arena: the physical block chain and summary
//! statistics.

use crate::free_list;
use crate::tag::{self, MIN_FREE_BLOCK};

/// What a block's payload currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// On the free list; the payload holds the list node.
    Free {
        /// Offset of the next-older free block.
        previous: Option<usize>,
        /// Offset of the next-newer free block.
        next: Option<usize>,
    },
    /// Handed out; the payload belongs to the caller.
    Occupied,
}

impl BlockState {
    /// Whether this is [`BlockState::Free`].
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Free { .. })
    }
}

/// One block of the physical chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block header.
    pub offset: usize,
    /// Total block size, both tags included.
    pub size: usize,
    /// Free-list node or occupied.
    pub state: BlockState,
}

/// Iterator over the physical block chain, lowest address first.
///
/// Stops early, rather than looping, if a tag records a zero size.
pub struct Blocks<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        if self.cursor >= self.bytes.len() {
            return None;
        }
        let offset = self.cursor;
        let tag = tag::try_read_tag(self.bytes, offset)?;
        if tag.size() == 0 {
            self.cursor = self.bytes.len();
            return None;
        }
        let state = if tag.is_occupied() {
            BlockState::Occupied
        } else if tag.size() >= MIN_FREE_BLOCK {
            BlockState::Free {
                previous: free_list::try_previous(self.bytes, offset).flatten(),
                next: free_list::try_next(self.bytes, offset).flatten(),
            }
        } else {
            BlockState::Free {
                previous: None,
                next: None,
            }
        };
        self.cursor = offset.saturating_add(tag.size());
        Some(BlockInfo {
            offset,
            size: tag.size(),
            state,
        })
    }
}

/// Summary of arena usage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Managed arena length in bytes.
    pub capacity: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Number of occupied blocks.
    pub occupied_blocks: usize,
    /// Bytes in free blocks, tags included.
    pub free_bytes: usize,
    /// Bytes in occupied blocks, tags included.
    pub occupied_bytes: usize,
    /// Size of the largest free block, tags included.
    pub largest_free: usize,
}

impl HeapStats {
    pub(crate) fn collect(capacity: usize, blocks: Blocks<'_>) -> Self {
        let mut stats = Self {
            capacity,
            ..Self::default()
        };
        for block in blocks {
            if block.state.is_free() {
                stats.free_blocks += 1;
                stats.free_bytes += block.size;
                stats.largest_free = stats.largest_free.max(block.size);
            } else {
                stats.occupied_blocks += 1;
                stats.occupied_bytes += block.size;
            }
        }
        stats
    }

    /// Largest request the heap could satisfy right now.
    pub fn largest_request(&self) -> usize {
        self.largest_free.saturating_sub(2 * tag::TAG_SIZE)
    }

    /// Fraction of free bytes outside the largest free block, in `[0, 1]`.
    ///
    /// 0 means all free memory is one block.
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free as f64 / self.free_bytes as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{make_tag, write_tag, TAG_SIZE};

    #[test]
    fn walks_hand_built_chain() {
        let mut bytes = vec![0u8; 2 * MIN_FREE_BLOCK];
        write_tag(&mut bytes, 0, make_tag(MIN_FREE_BLOCK, true));
        write_tag(&mut bytes, MIN_FREE_BLOCK, make_tag(MIN_FREE_BLOCK, false));
        free_list::link_clear(&mut bytes, MIN_FREE_BLOCK);

        let blocks: Vec<BlockInfo> = Blocks::new(&bytes).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].state, BlockState::Occupied);
        assert_eq!(
            blocks[1].state,
            BlockState::Free {
                previous: None,
                next: None
            }
        );
    }

    #[test]
    fn zero_size_tag_stops_walk() {
        let bytes = vec![0u8; 4 * TAG_SIZE];
        assert_eq!(Blocks::new(&bytes).count(), 0);
    }

    #[test]
    fn fragmentation_of_single_free_block_is_zero() {
        let stats = HeapStats {
            capacity: 256,
            free_blocks: 1,
            free_bytes: 256,
            largest_free: 256,
            ..HeapStats::default()
        };
        assert_eq!(stats.fragmentation(), 0.0);
        assert_eq!(stats.largest_request(), 256 - 2 * TAG_SIZE);
    }

    #[test]
    fn fragmentation_of_split_free_space() {
        let stats = HeapStats {
            capacity: 256,
            free_blocks: 2,
            free_bytes: 128,
            largest_free: 64,
            ..HeapStats::default()
        };
        assert!((stats.fragmentation() - 0.5).abs() < 1e-12);
    }
}

//! Structural self-checks.
//!
//! Two independent walks:
//!
//! 1. The physical chain from offset 0 to the arena end: every block has
//!    matching header and footer tags and a tag-aligned size its state
//!    allows, no two neighbours are both free, and the sizes tile the arena
//!    exactly.
//! 2. The free list from `head` along `previous`: the head has no `next`,
//!    each node is a free block header, `node.previous.next == node`, and the
//!    list holds exactly as many nodes as the walk in (1) found free blocks.
//!
//! Together these give free-list membership iff free occupancy. Neither walk
//! allocates.

use crate::error::IntegrityError;
use crate::free_list;
use crate::heap::Heap;
use crate::raw;
use crate::tag::{self, MIN_FREE_BLOCK, TAG_SIZE};

impl<B: AsRef<[u8]>> Heap<B> {
    /// Verify every structural invariant of the arena and free list.
    ///
    /// # Errors
    ///
    /// The first [`IntegrityError`] found.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let tiled = self.validate_blocks()?;
        self.validate_free_list(tiled)
    }

    /// Like [`validate`](Self::validate), but a violation is fatal.
    ///
    /// # Panics
    ///
    /// Panics on the first broken invariant.
    pub fn check(&self) {
        if let Err(err) = self.validate() {
            panic!("heap integrity violated: {err}");
        }
    }

    /// Walk the physical chain. Returns the number of free blocks.
    fn validate_blocks(&self) -> Result<usize, IntegrityError> {
        let bytes = self.bytes();
        let capacity = self.capacity();
        let mut offset = 0;
        let mut free_blocks = 0;
        let mut previous_free: Option<usize> = None;

        while offset < capacity {
            let header_word = raw::read_word(bytes, offset);
            let header = tag::Tag::decode(header_word);
            let size = header.size();
            if size < 2 * TAG_SIZE || (header.is_free() && size < MIN_FREE_BLOCK) {
                return Err(IntegrityError::UndersizedBlock { offset, size });
            }
            if size % TAG_SIZE != 0 {
                return Err(IntegrityError::MisalignedBlock { offset, size });
            }
            let end = offset
                .checked_add(size)
                .filter(|&end| end <= capacity)
                .ok_or(IntegrityError::TilingMismatch {
                    walked: offset.saturating_add(size),
                    capacity,
                })?;
            let footer_word = raw::read_word(bytes, end - TAG_SIZE);
            if footer_word != header_word {
                return Err(IntegrityError::TagMismatch {
                    offset,
                    header,
                    footer: Some(tag::Tag::decode(footer_word)),
                });
            }

            if header.is_free() {
                if let Some(left) = previous_free {
                    return Err(IntegrityError::AdjacentFree {
                        left,
                        right: offset,
                    });
                }
                free_blocks += 1;
                previous_free = Some(offset);
            } else {
                previous_free = None;
            }
            offset = end;
        }

        if offset != capacity {
            return Err(IntegrityError::TilingMismatch {
                walked: offset,
                capacity,
            });
        }
        Ok(free_blocks)
    }

    /// Walk the free list from its head along `previous` links.
    fn validate_free_list(&self, tiled: usize) -> Result<(), IntegrityError> {
        let bytes = self.bytes();
        let Some(head) = self.free_list_head() else {
            return if tiled == 0 {
                Ok(())
            } else {
                Err(IntegrityError::FreeCountMismatch { listed: 0, tiled })
            };
        };

        self.expect_free_block(head)?;
        if free_list::next(bytes, head).is_some() {
            return Err(IntegrityError::HeadHasNext { head });
        }

        let mut listed = 1;
        let mut node = head;
        while let Some(previous) = free_list::previous(bytes, node) {
            if listed >= tiled {
                // More nodes than free blocks: a cycle or a stray entry.
                return Err(IntegrityError::FreeCountMismatch {
                    listed: listed + 1,
                    tiled,
                });
            }
            self.expect_free_block(previous)?;
            if free_list::next(bytes, previous) != Some(node) {
                return Err(IntegrityError::BrokenLink { node, previous });
            }
            listed += 1;
            node = previous;
        }

        if listed != tiled {
            return Err(IntegrityError::FreeCountMismatch { listed, tiled });
        }
        Ok(())
    }

    /// `offset` must be a tag-aligned, in-range free block header whose
    /// footer matches.
    fn expect_free_block(&self, offset: usize) -> Result<(), IntegrityError> {
        let bytes = self.bytes();
        if offset % TAG_SIZE != 0 {
            return Err(IntegrityError::NotABlock { offset });
        }
        let header = tag::try_read_tag(bytes, offset).ok_or(IntegrityError::NotABlock { offset })?;
        if header.is_occupied() {
            return Err(IntegrityError::OccupiedInFreeList { offset });
        }
        if header.size() < MIN_FREE_BLOCK {
            return Err(IntegrityError::NotABlock { offset });
        }
        let footer = offset
            .checked_add(header.size())
            .and_then(|end| end.checked_sub(TAG_SIZE))
            .and_then(|footer| tag::try_read_tag(bytes, footer));
        if footer != Some(header) {
            return Err(IntegrityError::TagMismatch {
                offset,
                header,
                footer,
            });
        }
        Ok(())
    }
}

//! The allocator context: one caller-supplied arena, its free list, and
//! the allocate/free operations over them.
//!
//! # Allocation
//!
//! The free list is scanned from its head along `previous` links, so the
//! most recently freed block is tried first. For each candidate of size
//! `S`, with `need = payload + 2 * TAG_SIZE`:
//!
//! - `S - need >= MIN_FREE_BLOCK`: carve `need` bytes off the high end as an
//!   occupied block. The low remainder keeps its offset, and so its place in
//!   the free list; only its tags are rewritten.
//! - `S >= need`: take the whole block off the list and mark it occupied.
//! - otherwise: move to `previous`.
//!
//! # Free
//!
//! The left neighbour's footer sits just below the block header and the
//! right neighbour's header just above its footer, so coalescing is O(1):
//!
//! | left | right | result                                               |
//! |------|-------|------------------------------------------------------|
//! | free | free  | right leaves the list, left grows over both          |
//! | free | busy  | left grows over the freed block                      |
//! | busy | free  | right leaves the list, freed block grows and is head |
//! | busy | busy  | freed block becomes head                             |
//!
//! The merged block always starts at the lowest participating offset.

use log::{debug, trace, warn};

use crate::config::HeapConfig;
use crate::error::AllocError;
use crate::free_list::{self, FreeList};
use crate::handle::Allocation;
use crate::raw;
use crate::stats::{Blocks, HeapStats};
use crate::tag::{self, make_tag, Tag, MIN_FREE_BLOCK, MIN_PAYLOAD, TAG_SIZE};

/// A boundary-tag allocator over one contiguous buffer.
///
/// `B` is anything that derefs to bytes: `&mut [u8]`, `Vec<u8>`,
/// `Box<[u8]>`, `[u8; N]`. The heap never allocates on its own behalf; all
/// bookkeeping lives in the buffer's bytes, and only `capacity()` bytes of
/// it (the length rounded down to a multiple of [`TAG_SIZE`]) are managed.
///
/// Not thread-safe in the sense that every operation takes `&mut self`;
/// wrap it in a lock to share it.
pub struct Heap<B> {
    buf: B,
    capacity: usize,
    free_list: FreeList,
    config: HeapConfig,
}

/// Payload bytes actually reserved for a request of `size` bytes.
///
/// Rounded up to tag granularity and to at least one list node, so every
/// block can stand alone as a free block after it is released.
fn normalize(size: usize) -> Option<usize> {
    let rounded = size.checked_add(TAG_SIZE - 1)? & !(TAG_SIZE - 1);
    Some(rounded.max(MIN_PAYLOAD))
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Heap<B> {
    /// Take over `buf` as a single free block, with default configuration.
    ///
    /// # Errors
    ///
    /// [`AllocError::ArenaTooSmall`] if the buffer cannot hold one free block.
    pub fn new(buf: B) -> Result<Self, AllocError> {
        Self::with_config(buf, HeapConfig::default())
    }

    /// Take over `buf` as a single free block.
    ///
    /// # Errors
    ///
    /// [`AllocError::ArenaTooSmall`] if the buffer cannot hold one free block.
    pub fn with_config(buf: B, config: HeapConfig) -> Result<Self, AllocError> {
        let len = buf.as_ref().len();
        let capacity = len - len % TAG_SIZE;
        if capacity < MIN_FREE_BLOCK {
            return Err(AllocError::ArenaTooSmall {
                len,
                min: MIN_FREE_BLOCK,
            });
        }
        let mut heap = Self {
            buf,
            capacity,
            free_list: FreeList::new(),
            config,
        };
        heap.reset();
        debug!("heap: managing {capacity} of {len} bytes");
        Ok(heap)
    }

    /// Discard every allocation and return to the post-setup state: one free
    /// block spanning the arena, which is the only free-list entry.
    ///
    /// Outstanding handles become invalid.
    pub fn reset(&mut self) {
        let capacity = self.capacity;
        let bytes = &mut self.buf.as_mut()[..capacity];
        tag::write_tag(bytes, 0, make_tag(capacity, false));
        self.free_list.install(bytes, 0);
    }

    /// Reserve `size` payload bytes.
    ///
    /// # Errors
    ///
    /// - [`AllocError::OutOfMemory`] if no free block fits; nothing changes.
    /// - [`AllocError::RequestTooLarge`] if `size` overflows once tag
    ///   overhead is added.
    pub fn allocate(&mut self, size: usize) -> Result<Allocation, AllocError> {
        let need = normalize(size)
            .and_then(|payload| payload.checked_add(2 * TAG_SIZE))
            .ok_or(AllocError::RequestTooLarge { requested: size })?;

        let capacity = self.capacity;
        let bytes = &mut self.buf.as_mut()[..capacity];

        let mut cursor = self.free_list.head();
        let mut found = None;
        while let Some(candidate) = cursor {
            let available = tag::read_tag(bytes, candidate).size();
            if available >= need && available - need >= MIN_FREE_BLOCK {
                let remainder = available - need;
                let carved = candidate + remainder;
                tag::write_tag(bytes, carved, make_tag(need, true));
                tag::write_tag(bytes, candidate, make_tag(remainder, false));
                trace!("allocate {size}: split {candidate} ({available}) -> {carved} ({need})");
                found = Some(carved);
                break;
            }
            if available >= need {
                self.free_list.remove(bytes, candidate);
                tag::write_tag(bytes, candidate, make_tag(available, true));
                trace!("allocate {size}: reuse {candidate} ({available})");
                found = Some(candidate);
                break;
            }
            cursor = free_list::previous(bytes, candidate);
        }

        let Some(block) = found else {
            debug!("allocate {size}: out of memory");
            return Err(AllocError::OutOfMemory { requested: size });
        };

        if self.config.zero_on_alloc {
            let end = tag::footer_offset(block, tag::read_tag(bytes, block).size());
            bytes[block + TAG_SIZE..end].fill(0);
        }
        if self.config.verify_each_op {
            self.check();
        }
        Ok(Allocation::new(block + TAG_SIZE, size))
    }

    /// Release an allocation, coalescing with free neighbours.
    ///
    /// # Errors
    ///
    /// [`AllocError::InvalidFree`] if the handle does not name a live
    /// allocation. Always checked for handles that would address outside the
    /// arena; fully checked only with [`HeapConfig::strict_free`].
    pub fn free(&mut self, allocation: Allocation) -> Result<(), AllocError> {
        let offset = allocation.offset();
        let block = if self.config.strict_free {
            self.live_block(offset)
        } else {
            self.block_in_range(offset)
        };
        let Some(block) = block else {
            warn!("free: rejected handle at offset {offset}");
            return Err(AllocError::InvalidFree { offset });
        };

        let capacity = self.capacity;
        let bytes = &mut self.buf.as_mut()[..capacity];

        let middle = tag::read_tag(bytes, block).size();
        let right = block + middle;

        let left_free = if block == 0 {
            None
        } else {
            let left_tag = tag::read_tag(bytes, block - TAG_SIZE);
            left_tag
                .is_free()
                .then(|| (block - left_tag.size(), left_tag.size()))
        };
        let right_free = if right < capacity {
            let right_tag = tag::read_tag(bytes, right);
            right_tag.is_free().then_some((right, right_tag.size()))
        } else {
            None
        };

        match (left_free, right_free) {
            (Some((left, left_size)), Some((right, right_size))) => {
                self.free_list.remove(bytes, right);
                let merged = left_size + middle + right_size;
                tag::write_tag(bytes, left, make_tag(merged, false));
                trace!("free {block}: merged into {left} with {right} ({merged})");
            }
            (Some((left, left_size)), None) => {
                let merged = left_size + middle;
                tag::write_tag(bytes, left, make_tag(merged, false));
                trace!("free {block}: merged into {left} ({merged})");
            }
            (None, Some((right, right_size))) => {
                self.free_list.remove(bytes, right);
                let merged = middle + right_size;
                tag::write_tag(bytes, block, make_tag(merged, false));
                self.free_list.insert(bytes, block);
                trace!("free {block}: absorbed {right} ({merged})");
            }
            (None, None) => {
                tag::write_tag(bytes, block, make_tag(middle, false));
                self.free_list.insert(bytes, block);
                trace!("free {block}: standalone ({middle})");
            }
        }

        if self.config.verify_each_op {
            self.check();
        }
        Ok(())
    }

    /// Payload bytes of a live allocation, exactly `allocation.len()` long.
    ///
    /// # Panics
    ///
    /// Panics if the handle's range lies outside the arena.
    pub fn payload(&self, allocation: &Allocation) -> &[u8] {
        &self.bytes()[allocation.range()]
    }

    /// Mutable payload bytes of a live allocation.
    ///
    /// # Panics
    ///
    /// Panics if the handle's range lies outside the arena.
    pub fn payload_mut(&mut self, allocation: &Allocation) -> &mut [u8] {
        let capacity = self.capacity;
        &mut self.buf.as_mut()[..capacity][allocation.range()]
    }

    /// Recover the buffer. Its contents are the arena as left by the heap.
    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Block offset behind `offset` if its header tag is inside the arena
    /// and its recorded size keeps it there. Used when frees are trusted.
    fn block_in_range(&self, offset: usize) -> Option<usize> {
        let block = offset.checked_sub(TAG_SIZE)?;
        let tag = tag::try_read_tag(self.bytes(), block)?;
        let end = block.checked_add(tag.size())?;
        (tag.size() >= 2 * TAG_SIZE && end <= self.capacity).then_some(block)
    }

    /// Block offset behind `offset` if it names an occupied block with
    /// matching tags.
    fn live_block(&self, offset: usize) -> Option<usize> {
        if offset % TAG_SIZE != 0 {
            return None;
        }
        let block = self.block_in_range(offset)?;
        let bytes = self.bytes();
        let header = raw::read_word(bytes, block);
        let tag = Tag::decode(header);
        let footer = raw::read_word(bytes, tag::footer_offset(block, tag.size()));
        (tag.is_occupied() && tag.size() >= MIN_FREE_BLOCK && header == footer).then_some(block)
    }
}

impl<B: AsRef<[u8]>> Heap<B> {
    /// The managed part of the buffer.
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buf.as_ref()[..self.capacity]
    }

    #[cfg(test)]
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8]
    where
        B: AsMut<[u8]>,
    {
        &mut self.buf.as_mut()[..self.capacity]
    }

    pub(crate) fn free_list_head(&self) -> Option<usize> {
        self.free_list.head()
    }

    /// Managed arena length in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The configuration this heap was built with.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Total size of the block backing `allocation`, tags included.
    ///
    /// `None` if the handle's header tag would lie outside the arena. The
    /// tag is not otherwise checked; use `free` with `strict_free` for that.
    pub fn block_size(&self, allocation: &Allocation) -> Option<usize> {
        let header = allocation.offset().checked_sub(TAG_SIZE)?;
        tag::try_read_tag(self.bytes(), header).map(Tag::size)
    }

    /// Physical blocks from the start of the arena to its end.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks::new(self.bytes())
    }

    /// Free block offsets in scan order: newest first, along `previous`.
    pub fn free_list(&self) -> impl Iterator<Item = usize> + '_ {
        self.free_list.iter(self.bytes())
    }

    /// Usage summary from one walk of the block chain.
    pub fn stats(&self) -> HeapStats {
        HeapStats::collect(self.capacity, self.blocks())
    }

    /// Whether the heap is in its post-setup state: one free block covering
    /// the arena, alone on the free list.
    pub fn is_pristine(&self) -> bool {
        let bytes = self.bytes();
        let expected = make_tag(self.capacity, false);
        self.free_list.head() == Some(0)
            && tag::read_tag(bytes, 0) == expected
            && tag::read_tag(bytes, tag::footer_offset(0, self.capacity)) == expected
            && free_list::previous(bytes, 0).is_none()
            && free_list::next(bytes, 0).is_none()
    }
}

impl<B> std::fmt::Debug for Heap<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("capacity", &self.capacity)
            .field("head", &self.free_list.head())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

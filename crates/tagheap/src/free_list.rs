//! Intrusive LIFO free list.
//!
//! The list owns no memory: each node is a free block, and its
//! `previous`/`next` links are stored in that block's payload bytes,
//! directly after the header tag. Links are arena offsets; [`NIL`] marks
//! an empty link.
//!
//! `head` is the most recently inserted block. `previous` points toward
//! older insertions and `next` toward newer ones, so the head's `next` is
//! always empty and the allocator scans from `head` along `previous`.

use log::trace;

use crate::raw;
use crate::tag::{LINK_SIZE, TAG_SIZE};

/// Empty link sentinel. Never a valid block offset.
const NIL: usize = usize::MAX;

#[inline]
const fn previous_slot(block: usize) -> usize {
    block + TAG_SIZE
}

#[inline]
const fn next_slot(block: usize) -> usize {
    block + TAG_SIZE + LINK_SIZE
}

#[inline]
fn decode_link(word: usize) -> Option<usize> {
    (word != NIL).then_some(word)
}

/// The older neighbour of `block` in the free list.
pub(crate) fn previous(bytes: &[u8], block: usize) -> Option<usize> {
    decode_link(raw::read_word(bytes, previous_slot(block)))
}

/// The newer neighbour of `block` in the free list.
pub(crate) fn next(bytes: &[u8], block: usize) -> Option<usize> {
    decode_link(raw::read_word(bytes, next_slot(block)))
}

/// Checked variants for the integrity checker, which may be handed
/// offsets that do not name a block at all.
pub(crate) fn try_previous(bytes: &[u8], block: usize) -> Option<Option<usize>> {
    raw::try_read_word(bytes, block.checked_add(TAG_SIZE)?).map(decode_link)
}

pub(crate) fn try_next(bytes: &[u8], block: usize) -> Option<Option<usize>> {
    raw::try_read_word(bytes, block.checked_add(TAG_SIZE + LINK_SIZE)?).map(decode_link)
}

fn set_previous(bytes: &mut [u8], block: usize, link: Option<usize>) {
    raw::write_word(bytes, previous_slot(block), link.unwrap_or(NIL));
}

fn set_next(bytes: &mut [u8], block: usize, link: Option<usize>) {
    raw::write_word(bytes, next_slot(block), link.unwrap_or(NIL));
}

/// Empty both link fields of `block`.
pub(crate) fn link_clear(bytes: &mut [u8], block: usize) {
    set_previous(bytes, block, None);
    set_next(bytes, block, None);
}

/// Head of the intrusive free list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct FreeList {
    head: Option<usize>,
}

impl FreeList {
    /// An empty list.
    pub(crate) const fn new() -> Self {
        Self { head: None }
    }

    /// The most recently inserted free block.
    pub(crate) fn head(&self) -> Option<usize> {
        self.head
    }

    /// Make `block` the sole entry without going through [`insert`](Self::insert).
    pub(crate) fn install(&mut self, bytes: &mut [u8], block: usize) {
        link_clear(bytes, block);
        self.head = Some(block);
    }

    /// Splice `block` in as the new head. O(1).
    pub(crate) fn insert(&mut self, bytes: &mut [u8], block: usize) {
        link_clear(bytes, block);
        if let Some(old_head) = self.head {
            set_previous(bytes, block, Some(old_head));
            set_next(bytes, old_head, Some(block));
        }
        self.head = Some(block);
        trace!("free list: insert {block}");
    }

    /// Unlink `block` from wherever it sits. O(1).
    ///
    /// Both of `block`'s own links are cleared afterwards, so a removed
    /// block never carries a forward pointer into the live list.
    pub(crate) fn remove(&mut self, bytes: &mut [u8], block: usize) {
        let older = previous(bytes, block);
        let newer = next(bytes, block);
        if let Some(older) = older {
            set_next(bytes, older, newer);
        }
        match newer {
            Some(newer) => set_previous(bytes, newer, older),
            None => self.head = older,
        }
        link_clear(bytes, block);
        trace!("free list: remove {block}");
    }

    /// Iterate block offsets from the head along `previous` links.
    ///
    /// The walk is bounded by the number of blocks the arena could hold,
    /// so a corrupted cycle terminates.
    pub(crate) fn iter<'a>(&self, bytes: &'a [u8]) -> Iter<'a> {
        Iter {
            bytes,
            cursor: self.head,
            budget: bytes.len() / crate::tag::MIN_FREE_BLOCK + 1,
        }
    }
}

/// Iterator over free-list offsets, newest first.
pub(crate) struct Iter<'a> {
    bytes: &'a [u8],
    cursor: Option<usize>,
    budget: usize,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let block = self.cursor?;
        if self.budget == 0 {
            self.cursor = None;
            return None;
        }
        self.budget -= 1;
        self.cursor = try_previous(self.bytes, block).flatten();
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::MIN_FREE_BLOCK;

    /// Four node-sized slots at offsets 0, M, 2M, 3M.
    fn arena() -> Vec<u8> {
        vec![0u8; 4 * MIN_FREE_BLOCK]
    }

    fn slot(i: usize) -> usize {
        i * MIN_FREE_BLOCK
    }

    #[test]
    fn insert_makes_lifo_chain() {
        let mut bytes = arena();
        let mut list = FreeList::new();
        for i in 0..3 {
            list.insert(&mut bytes, slot(i));
        }
        assert_eq!(list.head(), Some(slot(2)));
        let order: Vec<usize> = list.iter(&bytes).collect();
        assert_eq!(order, vec![slot(2), slot(1), slot(0)]);
        assert_eq!(next(&bytes, slot(2)), None);
        assert_eq!(next(&bytes, slot(0)), Some(slot(1)));
    }

    #[test]
    fn remove_head_promotes_previous() {
        let mut bytes = arena();
        let mut list = FreeList::new();
        list.insert(&mut bytes, slot(0));
        list.insert(&mut bytes, slot(1));
        list.remove(&mut bytes, slot(1));
        assert_eq!(list.head(), Some(slot(0)));
        assert_eq!(next(&bytes, slot(0)), None);
    }

    #[test]
    fn remove_middle_relinks_neighbours() {
        let mut bytes = arena();
        let mut list = FreeList::new();
        for i in 0..3 {
            list.insert(&mut bytes, slot(i));
        }
        list.remove(&mut bytes, slot(1));
        assert_eq!(previous(&bytes, slot(2)), Some(slot(0)));
        assert_eq!(next(&bytes, slot(0)), Some(slot(2)));
        let order: Vec<usize> = list.iter(&bytes).collect();
        assert_eq!(order, vec![slot(2), slot(0)]);
    }

    #[test]
    fn remove_tail_leaves_rest_intact() {
        let mut bytes = arena();
        let mut list = FreeList::new();
        list.insert(&mut bytes, slot(0));
        list.insert(&mut bytes, slot(1));
        list.remove(&mut bytes, slot(0));
        assert_eq!(list.head(), Some(slot(1)));
        assert_eq!(previous(&bytes, slot(1)), None);
    }

    #[test]
    fn remove_clears_own_links() {
        let mut bytes = arena();
        let mut list = FreeList::new();
        for i in 0..3 {
            list.insert(&mut bytes, slot(i));
        }
        list.remove(&mut bytes, slot(1));
        assert_eq!(previous(&bytes, slot(1)), None);
        assert_eq!(next(&bytes, slot(1)), None);
    }

    #[test]
    fn removing_sole_entry_empties_list() {
        let mut bytes = arena();
        let mut list = FreeList::new();
        list.install(&mut bytes, slot(0));
        list.remove(&mut bytes, slot(0));
        assert_eq!(list.head(), None);
        assert_eq!(list.iter(&bytes).count(), 0);
    }

    #[test]
    fn iter_terminates_on_cycle() {
        let mut bytes = arena();
        let mut list = FreeList::new();
        list.insert(&mut bytes, slot(0));
        list.insert(&mut bytes, slot(1));
        // Corrupt: point the tail back at the head.
        set_previous(&mut bytes, slot(0), Some(slot(1)));
        assert!(list.iter(&bytes).count() <= bytes.len() / MIN_FREE_BLOCK + 1);
    }
}

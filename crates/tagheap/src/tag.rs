//! Boundary tags and the block layout constants derived from them.
//!
//! Every block carries two identical copies of its [`Tag`]: a header at its
//! lowest address and a footer at its highest. A tag is stored as one word,
//! `size << 1 | occupied`.
//!
//! ```text
//! occupied block                     free block
//! +--------+-----------+--------+    +--------+------+------+-----+--------+
//! | header |  payload  | footer |    | header | prev | next | ... | footer |
//! +--------+-----------+--------+    +--------+------+------+-----+--------+
//! ^ block  ^ block + TAG_SIZE         ^ block  ^ list node (payload bytes)
//! ```

use std::fmt;

use crate::raw::{self, WORD};

/// Size in bytes of one boundary tag.
pub const TAG_SIZE: usize = WORD;

/// Size in bytes of one free-list link field.
pub const LINK_SIZE: usize = WORD;

/// Smallest block that can stand alone as a free block: two tags plus the
/// `previous`/`next` links stored in its payload.
pub const MIN_FREE_BLOCK: usize = 2 * TAG_SIZE + 2 * LINK_SIZE;

/// Smallest payload handed out, so that any block can later hold its own
/// list node once freed.
pub(crate) const MIN_PAYLOAD: usize = MIN_FREE_BLOCK - 2 * TAG_SIZE;

/// Size and occupancy of one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    size: usize,
    occupied: bool,
}

/// Build a tag for a block of `size` total bytes (both tags included).
pub const fn make_tag(size: usize, occupied: bool) -> Tag {
    Tag { size, occupied }
}

impl Tag {
    /// Total block size in bytes, both tags included.
    pub const fn size(self) -> usize {
        self.size
    }

    /// Whether the block is handed out to a caller.
    pub const fn is_occupied(self) -> bool {
        self.occupied
    }

    /// Whether the block is on the free list.
    pub const fn is_free(self) -> bool {
        !self.occupied
    }

    pub(crate) const fn encode(self) -> usize {
        (self.size << 1) | self.occupied as usize
    }

    pub(crate) const fn decode(word: usize) -> Self {
        Self {
            size: word >> 1,
            occupied: word & 1 == 1,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.occupied { "occupied" } else { "free" };
        write!(f, "{} bytes {state}", self.size)
    }
}

/// Offset of the footer of a block starting at `header` with `size` bytes.
#[inline]
pub(crate) const fn footer_offset(header: usize, size: usize) -> usize {
    header + size - TAG_SIZE
}

/// Write `tag` at `header` and an identical copy at the block's footer.
///
/// The footer position is computed from `tag.size()`, so this is also how a
/// block is resized in place.
pub(crate) fn write_tag(bytes: &mut [u8], header: usize, tag: Tag) {
    let word = tag.encode();
    raw::write_word(bytes, header, word);
    raw::write_word(bytes, footer_offset(header, tag.size), word);
}

/// Read the header tag of the block starting at `header`.
#[inline]
pub(crate) fn read_tag(bytes: &[u8], header: usize) -> Tag {
    Tag::decode(raw::read_word(bytes, header))
}

/// Read the tag word at `offset` if it lies entirely inside `bytes`.
pub(crate) fn try_read_tag(bytes: &[u8], offset: usize) -> Option<Tag> {
    raw::try_read_word(bytes, offset).map(Tag::decode)
}

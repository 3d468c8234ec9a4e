//! Heap error types.

use std::error::Error;
use std::fmt;

use crate::tag::Tag;

/// Errors returned by heap construction, `allocate` and `free`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// No free block is large enough for the request. The heap is unchanged.
    OutOfMemory {
        /// Payload bytes requested.
        requested: usize,
    },
    /// The request cannot be represented once tag overhead is added.
    RequestTooLarge {
        /// Payload bytes requested.
        requested: usize,
    },
    /// The buffer cannot hold even one free block.
    ArenaTooSmall {
        /// Length of the buffer supplied.
        len: usize,
        /// Smallest usable length.
        min: usize,
    },
    /// `free` was handed something that is not a live allocation of this
    /// heap: out of range, misaligned, torn tags, or already freed.
    InvalidFree {
        /// Payload offset carried by the rejected handle.
        offset: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "out of memory: no free block fits {requested} bytes")
            }
            Self::RequestTooLarge { requested } => {
                write!(f, "request of {requested} bytes overflows block size")
            }
            Self::ArenaTooSmall { len, min } => {
                write!(f, "arena of {len} bytes is smaller than the minimum {min} bytes")
            }
            Self::InvalidFree { offset } => {
                write!(f, "invalid free at offset {offset}: not a live allocation")
            }
        }
    }
}

impl Error for AllocError {}

/// A structural invariant found broken by [`Heap::validate`](crate::Heap::validate).
///
/// These indicate a bug in the allocator (or a contract violation by its
/// caller with `strict_free` disabled), never an ordinary runtime condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntegrityError {
    /// A block's header and footer tags differ.
    TagMismatch {
        /// Block offset.
        offset: usize,
        /// Header tag.
        header: Tag,
        /// Footer tag, or `None` if it lies outside the arena.
        footer: Option<Tag>,
    },
    /// A block is smaller than its state allows.
    UndersizedBlock {
        /// Block offset.
        offset: usize,
        /// Size recorded in its tag.
        size: usize,
    },
    /// A block size is not a multiple of the tag size.
    MisalignedBlock {
        /// Block offset.
        offset: usize,
        /// Size recorded in its tag.
        size: usize,
    },
    /// The physical walk did not land exactly on the arena end.
    TilingMismatch {
        /// Offset the walk reached.
        walked: usize,
        /// Managed arena length.
        capacity: usize,
    },
    /// Two physically adjacent blocks are both free.
    AdjacentFree {
        /// Lower block offset.
        left: usize,
        /// Upper block offset.
        right: usize,
    },
    /// The head of the free list has a `next` link.
    HeadHasNext {
        /// Head block offset.
        head: usize,
    },
    /// A free-list link does not point at a block header.
    NotABlock {
        /// The bad link target.
        offset: usize,
    },
    /// An occupied block is reachable from the free list.
    OccupiedInFreeList {
        /// Block offset.
        offset: usize,
    },
    /// `node.previous.next != node`.
    BrokenLink {
        /// The node whose `previous` was followed.
        node: usize,
        /// Its `previous` neighbour.
        previous: usize,
    },
    /// The free list does not hold exactly the free blocks of the arena.
    FreeCountMismatch {
        /// Nodes reachable from the head (capped on cycles).
        listed: usize,
        /// Free blocks found by the physical walk.
        tiled: usize,
    },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagMismatch {
                offset,
                header,
                footer: Some(footer),
            } => {
                write!(f, "block {offset}: header ({header}) != footer ({footer})")
            }
            Self::TagMismatch {
                offset,
                header,
                footer: None,
            } => {
                write!(f, "block {offset}: footer of ({header}) lies outside the arena")
            }
            Self::UndersizedBlock { offset, size } => {
                write!(f, "block {offset}: size {size} is below the minimum for its state")
            }
            Self::MisalignedBlock { offset, size } => {
                write!(f, "block {offset}: size {size} is not a multiple of the tag size")
            }
            Self::TilingMismatch { walked, capacity } => {
                write!(f, "block walk reached {walked}, arena ends at {capacity}")
            }
            Self::AdjacentFree { left, right } => {
                write!(f, "adjacent free blocks at {left} and {right}")
            }
            Self::HeadHasNext { head } => {
                write!(f, "free list head {head} has a next link")
            }
            Self::NotABlock { offset } => {
                write!(f, "free list links to {offset}, which is not a block")
            }
            Self::OccupiedInFreeList { offset } => {
                write!(f, "occupied block {offset} is on the free list")
            }
            Self::BrokenLink { node, previous } => {
                write!(f, "free list: {previous}.next does not point back to {node}")
            }
            Self::FreeCountMismatch { listed, tiled } => {
                write!(f, "free list holds {listed} blocks, arena has {tiled} free blocks")
            }
        }
    }
}

impl Error for IntegrityError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::make_tag;

    #[test]
    fn out_of_memory_mentions_request() {
        let err = AllocError::OutOfMemory { requested: 64 };
        assert!(err.to_string().contains("64 bytes"));
    }

    #[test]
    fn tag_mismatch_renders_both_tags() {
        let err = IntegrityError::TagMismatch {
            offset: 32,
            header: make_tag(64, true),
            footer: Some(make_tag(48, false)),
        };
        let msg = err.to_string();
        assert!(msg.contains("64 bytes occupied"));
        assert!(msg.contains("48 bytes free"));
    }
}

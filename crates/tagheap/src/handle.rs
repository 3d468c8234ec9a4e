//! Allocation handles.
//!
//! An [`Allocation`] is the arena-relative equivalent of the pointer a C
//! allocator returns: the offset of the first payload byte (one tag past
//! the block header) plus the length the caller asked for.

use std::fmt;

/// A live allocation inside a [`Heap`](crate::Heap).
///
/// Handles are plain offsets and are `Copy`; freeing one twice, or freeing
/// a handle from another heap, is a caller error that `strict_free`
/// detects where it can.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[must_use]
pub struct Allocation {
    /// Arena offset of the first payload byte.
    offset: usize,
    /// Requested payload length in bytes.
    len: usize,
}

impl Allocation {
    pub(crate) const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Rebuild a handle from a previously observed offset and length.
    ///
    /// The heap cannot know whether the pair came from `allocate`; freeing a
    /// forged handle is a contract violation.
    pub const fn from_raw_parts(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Arena offset of the first payload byte.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Requested payload length in bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether zero bytes were requested.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Payload byte range within the arena.
    pub const fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Allocation(off={}, len={})", self.offset, self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_spans_requested_bytes() {
        let a = Allocation::new(24, 16);
        assert_eq!(a.range(), 24..40);
        assert_eq!(a.len(), 16);
        assert!(!a.is_empty());
    }

    #[test]
    fn empty_allocation() {
        assert!(Allocation::new(8, 0).is_empty());
    }

    #[test]
    fn raw_parts_round_trip() {
        let a = Allocation::new(104, 7);
        assert_eq!(Allocation::from_raw_parts(a.offset(), a.len()), a);
    }
}

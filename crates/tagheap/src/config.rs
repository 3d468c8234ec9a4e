//! Heap configuration parameters.

/// Configuration for a [`Heap`](crate::Heap).
///
/// Fixed at construction; the arena layout does not depend on any of
/// these switches, only the amount of checking and scrubbing done per call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Validate handles passed to `free`.
    ///
    /// When set, `free` rejects a handle whose block is out of range,
    /// misaligned, has mismatched header/footer tags, or is not occupied
    /// (a double free) with [`AllocError::InvalidFree`](crate::AllocError::InvalidFree).
    /// The check is O(1) and reads only the block's own tags.
    ///
    /// When clear, `free` trusts its caller. Misuse then corrupts the
    /// heap's bookkeeping, but never memory outside the arena.
    ///
    /// Default: `true`.
    pub strict_free: bool,

    /// Zero the payload of every block handed out by `allocate`.
    ///
    /// Default: `false`.
    pub zero_on_alloc: bool,

    /// Run the full integrity check after every `allocate` and `free`,
    /// panicking on the first violation. O(arena) per call.
    ///
    /// Default: `false`.
    pub verify_each_op: bool,
}

impl HeapConfig {
    /// Default for [`strict_free`](Self::strict_free).
    pub const DEFAULT_STRICT_FREE: bool = true;

    /// Default for [`zero_on_alloc`](Self::zero_on_alloc).
    pub const DEFAULT_ZERO_ON_ALLOC: bool = false;

    /// Default for [`verify_each_op`](Self::verify_each_op).
    pub const DEFAULT_VERIFY_EACH_OP: bool = false;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            strict_free: Self::DEFAULT_STRICT_FREE,
            zero_on_alloc: Self::DEFAULT_ZERO_ON_ALLOC,
            verify_each_op: Self::DEFAULT_VERIFY_EACH_OP,
        }
    }

    /// A config that checks everything: strict frees and a full integrity
    /// walk after every operation. Intended for tests.
    pub fn paranoid() -> Self {
        Self {
            strict_free: true,
            verify_each_op: true,
            ..Self::new()
        }
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new()
    }
}

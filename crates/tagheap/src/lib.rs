//! Single-arena boundary-tag allocator.
//!
//! A [`Heap`] takes one caller-supplied byte buffer and serves
//! [`allocate`](Heap::allocate)/[`free`](Heap::free) from it without any
//! further system allocation. All bookkeeping lives inside the buffer:
//!
//! ```text
//! Heap (context: buffer, capacity, free-list head)
//! ├── Tag codec     size|occupied word, mirrored at both block ends
//! ├── FreeList      intrusive LIFO list threaded through free payloads
//! ├── allocate      LIFO-biased first fit, splits off the high end
//! ├── free          O(1) coalescing through neighbour tags
//! └── validate      tiling / tag / list self-checks (diagnostic)
//! ```
//!
//! # Arena-relative handles
//!
//! Blocks are addressed by byte offset into the arena, never by raw
//! pointer. An [`Allocation`] carries the payload offset and requested
//! length; [`Heap::payload`] and [`Heap::payload_mut`] turn it into a slice.
//! Free-list links are offsets too. The crate contains no `unsafe` code:
//! every tag and link access is a bounds-checked slice copy.
//!
//! # Invariants
//!
//! - Physical blocks tile `[0, capacity)` exactly, each with identical
//!   header and footer tags.
//! - A block is on the free list iff its tag says free.
//! - After every `free`, no two adjacent blocks are both free.
//! - Freeing everything that was allocated restores the post-setup state.
//!
//! [`Heap::validate`] checks all of these; [`Heap::check`] panics instead.
//!
//! # Example
//!
//! ```
//! use tagheap::Heap;
//!
//! let mut heap = Heap::new(vec![0u8; 4096]).unwrap();
//! let a = heap.allocate(24).unwrap();
//! heap.payload_mut(&a).fill(7);
//! heap.free(a).unwrap();
//! assert!(heap.is_pristine());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

mod check;
pub mod config;
pub mod error;
mod free_list;
pub mod handle;
pub mod heap;
mod raw;
pub mod stats;
pub mod tag;

// Public re-exports for the primary API surface.
pub use config::HeapConfig;
pub use error::{AllocError, IntegrityError};
pub use handle::Allocation;
pub use heap::Heap;
pub use stats::{BlockInfo, BlockState, Blocks, HeapStats};
pub use tag::{make_tag, Tag, LINK_SIZE, MIN_FREE_BLOCK, TAG_SIZE};

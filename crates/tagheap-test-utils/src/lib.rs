//! Test utilities for tagheap development.
//!
//! - [`Workload`]: a seeded random allocate/free driver that keeps its
//!   live allocations in an ordered set, fills every payload with a marker
//!   byte, and fails loudly if a payload is overwritten or two live ranges
//!   overlap.
//! - [`fixtures`]: pre-built heaps and block layouts for scenario tests.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod workload;

pub use workload::{Workload, WorkloadConfig, WorkloadReport};

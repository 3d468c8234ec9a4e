//! Random 16-byte allocate/free churn over a 500 kB arena, then a full
//! drain. Prints the size of the free-list head, which is the whole arena
//! again once everything has been released.
//!
//! ```sh
//! cargo run -p tagheap --example workload -- [seed]
//! ```

use tagheap::Heap;
use tagheap_test_utils::{Workload, WorkloadConfig};

const ARENA_BYTES: usize = 500_000;
const STEPS: usize = 100_000;
const REQUEST: usize = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let seed = std::env::args()
        .nth(1)
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(0);

    let mut heap = Heap::new(vec![0u8; ARENA_BYTES])?;
    let mut workload = Workload::new(WorkloadConfig::fixed(seed, REQUEST, STEPS));
    let report = workload.run(&mut heap)?;
    println!(
        "{} allocations, {} frees, {} failed, peak {} live",
        report.allocations, report.frees, report.failed_allocations, report.peak_live
    );

    let stats = heap.stats();
    println!(
        "before drain: {} free blocks, fragmentation {:.3}",
        stats.free_blocks,
        stats.fragmentation()
    );

    workload.drain(&mut heap)?;
    heap.validate()?;
    let head = heap
        .free_list()
        .next()
        .and_then(|head| heap.blocks().find(|b| b.offset == head))
        .map_or(0, |b| b.size);
    println!("head block size after drain: {head}");
    Ok(())
}

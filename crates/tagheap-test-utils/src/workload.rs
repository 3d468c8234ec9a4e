//! Randomised allocate/free workload.
//!
//! Each step flips a weighted coin: allocate a random size, or free a
//! uniformly chosen live allocation. Runs are deterministic for a given
//! seed (ChaCha8), so a failing seed reproduces exactly.

use std::collections::BTreeMap;

use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tagheap::{AllocError, Allocation, Heap};

/// Parameters of a [`Workload`] run.
#[derive(Clone, Debug)]
pub struct WorkloadConfig {
    /// RNG seed.
    pub seed: u64,
    /// Number of allocate-or-free steps.
    pub steps: usize,
    /// Probability that a step allocates rather than frees.
    pub alloc_probability: f64,
    /// Smallest request size, inclusive.
    pub min_size: usize,
    /// Largest request size, inclusive.
    pub max_size: usize,
    /// Run the heap's integrity check every this many steps.
    pub check_every: Option<usize>,
}

impl WorkloadConfig {
    /// Default step count.
    pub const DEFAULT_STEPS: usize = 10_000;

    /// Mixed sizes in `1..=256`, even alloc/free odds, no periodic checks.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            steps: Self::DEFAULT_STEPS,
            alloc_probability: 0.5,
            min_size: 1,
            max_size: 256,
            check_every: None,
        }
    }

    /// Every request is exactly `size` bytes.
    pub fn fixed(seed: u64, size: usize, steps: usize) -> Self {
        Self {
            steps,
            min_size: size,
            max_size: size,
            ..Self::new(seed)
        }
    }

    /// Validate the heap after every step.
    pub fn checked(mut self) -> Self {
        self.check_every = Some(1);
        self
    }
}

/// Counters from a [`Workload::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkloadReport {
    /// Successful allocations.
    pub allocations: usize,
    /// Allocations refused with out-of-memory.
    pub failed_allocations: usize,
    /// Successful frees.
    pub frees: usize,
    /// Most allocations live at once.
    pub peak_live: usize,
    /// Allocations still live at the end of the run.
    pub live: usize,
}

struct Live {
    allocation: Allocation,
    fill: u8,
}

/// Seeded random allocate/free driver.
pub struct Workload {
    config: WorkloadConfig,
    rng: ChaCha8Rng,
    /// Live allocations keyed by payload offset.
    live: BTreeMap<usize, Live>,
    report: WorkloadReport,
}

impl Workload {
    /// A fresh driver with no live allocations.
    pub fn new(config: WorkloadConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            live: BTreeMap::new(),
            report: WorkloadReport::default(),
        }
    }

    /// Live allocations in address order.
    pub fn live(&self) -> impl Iterator<Item = &Allocation> + '_ {
        self.live.values().map(|l| &l.allocation)
    }

    /// Number of live allocations.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Run the configured number of steps against `heap`.
    ///
    /// # Errors
    ///
    /// Any allocator error other than out-of-memory.
    ///
    /// # Panics
    ///
    /// Panics if a payload was overwritten, two live allocations overlap,
    /// or a periodic integrity check fails.
    pub fn run<B>(&mut self, heap: &mut Heap<B>) -> Result<WorkloadReport, AllocError>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        for step in 0..self.config.steps {
            if self.rng.random_bool(self.config.alloc_probability) {
                self.allocate_one(heap)?;
            } else {
                self.free_one(heap)?;
            }
            if let Some(every) = self.config.check_every {
                if every > 0 && (step + 1) % every == 0 {
                    heap.check();
                }
            }
        }
        self.report.live = self.live.len();
        debug!(
            "workload seed={}: {} allocs ({} failed), {} frees, peak {} live",
            self.config.seed,
            self.report.allocations,
            self.report.failed_allocations,
            self.report.frees,
            self.report.peak_live
        );
        Ok(self.report)
    }

    /// Free every live allocation, lowest offset first. Returns how many
    /// were freed.
    ///
    /// # Errors
    ///
    /// The first error `free` reports.
    pub fn drain<B>(&mut self, heap: &mut Heap<B>) -> Result<usize, AllocError>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let mut freed = 0;
        while let Some((_, live)) = self.live.pop_first() {
            Self::release(heap, live)?;
            freed += 1;
        }
        self.report.frees += freed;
        self.report.live = 0;
        Ok(freed)
    }

    fn allocate_one<B>(&mut self, heap: &mut Heap<B>) -> Result<(), AllocError>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        let size = self
            .rng
            .random_range(self.config.min_size..=self.config.max_size);
        let allocation = match heap.allocate(size) {
            Ok(allocation) => allocation,
            Err(AllocError::OutOfMemory { .. }) => {
                self.report.failed_allocations += 1;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let range = allocation.range();
        if let Some((_, below)) = self.live.range(..range.start).next_back() {
            assert!(
                below.allocation.range().end <= range.start,
                "{} overlaps live {}",
                allocation,
                below.allocation
            );
        }
        if let Some((_, above)) = self.live.range(range.start..).next() {
            assert!(
                range.end <= above.allocation.offset(),
                "{} overlaps live {}",
                allocation,
                above.allocation
            );
        }

        let fill: u8 = self.rng.random();
        heap.payload_mut(&allocation).fill(fill);
        self.live.insert(range.start, Live { allocation, fill });
        self.report.allocations += 1;
        self.report.peak_live = self.report.peak_live.max(self.live.len());
        Ok(())
    }

    fn free_one<B>(&mut self, heap: &mut Heap<B>) -> Result<(), AllocError>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        if self.live.is_empty() {
            return Ok(());
        }
        let index = self.rng.random_range(0..self.live.len());
        let Some(&offset) = self.live.keys().nth(index) else {
            return Ok(());
        };
        let Some(live) = self.live.remove(&offset) else {
            return Ok(());
        };
        Self::release(heap, live)?;
        self.report.frees += 1;
        Ok(())
    }

    fn release<B>(heap: &mut Heap<B>, live: Live) -> Result<(), AllocError>
    where
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        assert!(
            heap.payload(&live.allocation).iter().all(|&b| b == live.fill),
            "payload of {} was overwritten",
            live.allocation
        );
        heap.free(live.allocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagheap::HeapConfig;

    fn heap(len: usize) -> Heap<Vec<u8>> {
        Heap::with_config(vec![0u8; len], HeapConfig::paranoid()).unwrap()
    }

    #[test]
    fn same_seed_same_report() {
        let config = WorkloadConfig {
            steps: 500,
            ..WorkloadConfig::new(7)
        };
        let a = Workload::new(config.clone()).run(&mut heap(8192)).unwrap();
        let b = Workload::new(config).run(&mut heap(8192)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn drain_frees_everything() {
        let mut heap = heap(8192);
        let mut workload = Workload::new(WorkloadConfig {
            steps: 300,
            alloc_probability: 0.8,
            ..WorkloadConfig::new(3)
        });
        let report = workload.run(&mut heap).unwrap();
        assert_eq!(report.live, workload.live_count());
        let freed = workload.drain(&mut heap).unwrap();
        assert_eq!(freed, report.live);
        assert_eq!(workload.live_count(), 0);
        assert!(heap.is_pristine());
    }

    #[test]
    fn tiny_arena_records_failures() {
        let mut heap = heap(256);
        let report = Workload::new(WorkloadConfig {
            alloc_probability: 0.9,
            ..WorkloadConfig::fixed(11, 64, 200)
        })
        .run(&mut heap)
        .unwrap();
        assert!(report.failed_allocations > 0);
    }
}

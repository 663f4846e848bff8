//! Worker-pool construction helpers.
//!
//! Closures cross a rayon pool boundary natively, so the engine needs no
//! function-serialization shim; these helpers only size and build pools.

use std::thread;

use labkit_core::errors::{ErrorInfo, LabError};

/// Default worker count for CPU-bound passes: one less than the available
/// parallelism, never below one.
pub fn default_workers() -> usize {
    let available = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    available.saturating_sub(1).max(1)
}

/// Worker count for the I/O-bound load pass: wider than the CPU-bound pool
/// since threads mostly wait on the filesystem.
pub fn io_workers(cpu_workers: usize) -> usize {
    (cpu_workers * 2).max(2)
}

/// Builds a bounded rayon thread pool.
pub fn build_pool(workers: usize) -> Result<rayon::ThreadPool, LabError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|err| {
            LabError::Pool(
                ErrorInfo::new("pool_build", "failed to build worker pool")
                    .with_context("workers", workers.to_string())
                    .with_hint(err.to_string()),
            )
        })
}

// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Bounded worker pool for image steps. Parallelism is capped at one less
// than the available cores so the driving thread keeps breathing room.

use tracing::warn;

use blattwerk_core::error::{BlattwerkError, Result};

pub const MIN_FREE_CORES: usize = 1;

/// Effective parallelism: `min(configured, cores − 1)`, never below 1.
/// An unusable configured value falls back to 1 with a warning.
pub fn effective_pool_size(configured: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|cores| cores.get())
        .unwrap_or(2);
    let limit = cores.saturating_sub(MIN_FREE_CORES).max(1);
    if configured == 0 {
        warn!(configured, fallback = 1, "invalid poolsize provided");
        return 1;
    }
    configured.min(limit)
}

/// Build the rayon pool the step's pages are dispatched onto.
pub fn build_pool(size: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(size)
        .build()
        .map_err(|err| BlattwerkError::Image(format!("worker pool unavailable: {err}")))
}

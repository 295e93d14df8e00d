//! Strategy selection.

use serde::Serialize;

use treegen_core::config::GeneratorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Plain memoized recursion on the calling thread.
    SingleThreaded,
    /// Pre-warm, then fan top-level partitions out to workers.
    ParallelGeneric,
    /// Build the exact-leaf table level by level, then take the union.
    ParallelSpecialized,
}

impl Strategy {
    /// `parallel` is the caller's request; the config can still veto it.
    pub fn select(cfg: &GeneratorConfig, n: usize, m: usize, parallel: bool) -> Self {
        if !parallel || !cfg.parallel || n < cfg.sequential_below {
            Strategy::SingleThreaded
        } else if cfg.should_use_optimized(n, m) {
            Strategy::ParallelSpecialized
        } else {
            Strategy::ParallelGeneric
        }
    }

    pub fn is_parallel(&self) -> bool {
        !matches!(self, Strategy::SingleThreaded)
    }
}

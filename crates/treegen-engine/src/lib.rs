#![forbid(unsafe_code)]
//! treegen-engine: the generation algorithms (math → code).
//!
//! Responsibilities:
//! - Memo state: an interned arena plus (nodes, leaves) caches.
//! - Combination assembly with leaf-budget pruning.
//! - The generic at-most-M recurrence, sequential or split across threads.
//! - The exact-leaf-count generator with closed forms for up to four leaves.
//!
//! **No progress reporting, no result callbacks** here. The exec crate drives
//! these and owns the worker pool.

pub mod assembler;
pub mod exact;
pub mod generic;
pub mod memo;

pub use assembler::assemble;
pub use exact::{build_exact_parallel, build_exact_table, exact_trees, trees_up_to_leaves};
pub use generic::{dedup, prewarm, solve_partition, trees_with_budget};
pub use memo::{Entry, Memo, Snapshot, SplitPolicy, TreeCache};

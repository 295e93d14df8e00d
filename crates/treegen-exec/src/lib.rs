#![forbid(unsafe_code)]
//! treegen-exec: runtime, worker pool, result collection, and metrics.
//!
//! - `strategy`: picks single-threaded, parallel generic, or parallel
//!   exact-leaf generation for a request.
//! - `scheduler`: runs a strategy. Workers claim batches of top-level
//!   partitions and stream materialized trees over a bounded channel.
//! - `collector`: the single consumer. Canonicalizes, deduplicates by
//!   fingerprint, and hands each new tree to the caller.
//! - `progress`: a polling reporter that lives for the duration of a run.
//! - `runtime`: `TreeGenerator` and the free `generate` entry point.

pub mod collector;
pub mod metrics;
pub mod progress;
pub mod runtime;
pub mod scheduler;
pub mod strategy;

pub use collector::Collector;
pub use progress::{Progress, ProgressReporter, ProgressSink, ProgressSnapshot};
pub use runtime::{
    generate, generate_with_exact_leaves, should_use_optimized, RunReport, TreeGenerator,
};
pub use strategy::Strategy;

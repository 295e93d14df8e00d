//! Runtime: admit a request, pick a strategy, run it, report.
//!
//! Flow of `TreeGenerator::generate`:
//! - Validate the config and detect (or use the injected) system resources.
//! - Admission control; a rejection surfaces as `Error::Rejected`.
//! - `n == 0` or `m == 0` short-circuits to zero trees.
//! - Strategy selection and execution, with a progress reporter running for
//!   the parallel strategies.
//! - Every tree passes through the `Collector` before the callback sees it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use treegen_core::config::GeneratorConfig;
use treegen_core::error::Result;
use treegen_core::tree::Tree;

use treegen_engine::{exact_trees, Memo};
use treegen_mem::{admit, Admission, SystemResources};

use crate::collector::Collector;
use crate::metrics::emit_span;
use crate::progress::{Progress, ProgressReporter, ProgressSink};
use crate::scheduler::{run_parallel_generic, run_parallel_specialized, run_single};
use crate::strategy::Strategy;

/// Summary of the most recent `generate` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub n: usize,
    pub m: usize,
    pub strategy: Strategy,
    pub threads: usize,
    /// Partitions for the generic path, exact-table cells for the
    /// specialized path, 1 otherwise.
    pub units: usize,
    pub trees: usize,
    pub duplicates: usize,
    pub elapsed_ms: u64,
    pub admission: Admission,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn emit_metrics(&self) {
        emit_span(
            "generate",
            &[
                ("n", self.n.to_string()),
                ("m", self.m.to_string()),
                ("threads", self.threads.to_string()),
                ("trees", self.trees.to_string()),
                ("elapsed_ms", self.elapsed_ms.to_string()),
            ],
        );
    }
}

/// Enumerates every non-equivalent rooted tree with `n` nodes and at most
/// `m` leaves.
pub struct TreeGenerator {
    cfg: GeneratorConfig,
    resources: Option<SystemResources>,
    sink: Option<Arc<dyn ProgressSink>>,
    count: usize,
    last_report: Option<RunReport>,
}

impl Default for TreeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeGenerator {
    pub fn new() -> Self {
        Self::with_config(GeneratorConfig::default())
    }

    pub fn with_config(cfg: GeneratorConfig) -> Self {
        Self {
            cfg,
            resources: None,
            sink: None,
            count: 0,
            last_report: None,
        }
    }

    /// Use fixed resource figures instead of probing the machine.
    pub fn with_resources(mut self, resources: SystemResources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Receive periodic progress snapshots during parallel runs.
    pub fn with_progress<S: ProgressSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.cfg
    }

    /// Trees delivered by the last successful call.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    /// Deliver each distinct tree to `on_tree` exactly once, on the calling
    /// thread, and return how many were delivered.
    pub fn generate<F>(&mut self, n: usize, m: usize, mut on_tree: F, parallel: bool) -> Result<usize>
    where
        F: FnMut(&Tree),
    {
        self.cfg.validate()?;
        let resources = self.resources.unwrap_or_else(SystemResources::detect);
        let admission = admit(&self.cfg, n, m, &resources)?;

        let started = Instant::now();
        self.count = 0;

        let strategy = Strategy::select(&self.cfg, n, m, parallel);
        let threads = self
            .cfg
            .max_threads
            .unwrap_or_else(|| resources.worker_threads(self.cfg.thread_cap))
            .max(1);

        let progress = Arc::new(Progress::new());
        let mut collector = Collector::new(n, m, &progress, &mut on_tree);

        let stats = if n == 0 || m == 0 {
            None
        } else {
            tracing::info!(n, m, ?strategy, threads, "generating");
            let reporter = strategy.is_parallel().then(|| {
                ProgressReporter::start(
                    Arc::clone(&progress),
                    Duration::from_millis(self.cfg.progress_interval_ms),
                    self.sink.clone(),
                )
            });
            let stats = match strategy {
                Strategy::SingleThreaded => run_single(n, m, &mut collector),
                Strategy::ParallelGeneric => run_parallel_generic(
                    &self.cfg,
                    n,
                    m,
                    threads,
                    &resources,
                    &progress,
                    &mut collector,
                ),
                Strategy::ParallelSpecialized => {
                    run_parallel_specialized(n, m, threads, &progress, &mut collector)
                }
            };
            if let Some(reporter) = reporter {
                reporter.stop();
            }
            Some(stats?)
        };

        let trees = collector.emitted();
        let duplicates = collector.duplicates();
        drop(collector);

        let report = RunReport {
            n,
            m,
            strategy,
            threads: stats.map_or(1, |s| s.threads),
            units: stats.map_or(0, |s| s.units),
            trees,
            duplicates,
            elapsed_ms: started.elapsed().as_millis() as u64,
            admission,
        };
        tracing::info!(
            trees,
            duplicates,
            elapsed_ms = report.elapsed_ms,
            threads = report.threads,
            "generation complete"
        );
        report.emit_metrics();

        self.count = trees;
        self.last_report = Some(report);
        Ok(trees)
    }
}

/// One-shot `TreeGenerator::generate` with the default configuration.
pub fn generate<F>(n: usize, m: usize, on_tree: F, parallel: bool) -> Result<usize>
where
    F: FnMut(&Tree),
{
    TreeGenerator::new().generate(n, m, on_tree, parallel)
}

/// Whether the exact-leaf generator is preferred for `(n, m)` under the
/// default configuration.
pub fn should_use_optimized(n: usize, m: usize) -> bool {
    GeneratorConfig::default().should_use_optimized(n, m)
}

/// Every tree with `n` nodes and exactly `k` leaves, in generation order.
pub fn generate_with_exact_leaves(n: usize, k: usize) -> Vec<Tree> {
    let mut memo = Memo::new();
    let entry = exact_trees(&mut memo, n, k);
    entry.iter().map(|&id| memo.arena.materialize(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use treegen_core::error::Error;

    fn generator() -> TreeGenerator {
        TreeGenerator::new().with_resources(SystemResources::fixed(4, None, None))
    }

    #[test]
    fn five_nodes_unbounded_leaves() {
        let mut tg = generator();
        let mut seen = HashSet::new();
        let count = tg
            .generate(5, 5, |t| {
                assert_eq!(t.node_count(), 5);
                seen.insert(t.serialize());
            }, true)
            .unwrap();
        assert_eq!(count, 9);
        assert_eq!(seen.len(), 9);
        assert_eq!(tg.count(), 9);
        assert_eq!(tg.last_report().unwrap().strategy, Strategy::SingleThreaded);
    }

    #[test]
    fn zero_inputs_yield_no_trees() {
        let mut tg = generator();
        assert_eq!(tg.generate(0, 3, |_| panic!("no trees expected"), true).unwrap(), 0);
        assert_eq!(tg.generate(4, 0, |_| panic!("no trees expected"), true).unwrap(), 0);
        assert_eq!(tg.generate(1, 1, |_| {}, false).unwrap(), 1);
    }

    #[test]
    fn oversized_request_is_rejected_not_empty() {
        let mut tg = generator();
        let err = tg.generate(31, 5, |_| {}, true).unwrap_err();
        assert!(err.is_rejection());
        assert!(matches!(err, Error::Rejected { n: 31, m: 5, .. }));
        assert!(tg.last_report().is_none());
    }

    #[test]
    fn parallel_generic_reports_partition_units() {
        let cfg = GeneratorConfig {
            progress_interval_ms: 1,
            max_threads: Some(3),
            ..GeneratorConfig::default()
        };
        let mut tg = TreeGenerator::with_config(cfg)
            .with_resources(SystemResources::fixed(4, None, None));

        let count = tg.generate(14, 14, |_| {}, true).unwrap();
        assert_eq!(count, 32973);
        let report = tg.last_report().unwrap();
        assert_eq!(report.strategy, Strategy::ParallelGeneric);
        assert_eq!(report.threads, 3);
        // Partitions of 13 into at most 13 parts.
        assert_eq!(report.units, 101);
        assert_eq!(report.duplicates, 0);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"parallel_generic\""));
        assert!(json.contains("\"admitted\""));
    }

    #[test]
    fn exact_leaf_helper_counts() {
        assert_eq!(generate_with_exact_leaves(5, 2).len(), 4);
        for t in generate_with_exact_leaves(7, 3) {
            assert_eq!(t.leaf_count(), 3);
            assert_eq!(t.node_count(), 7);
        }
        assert!(generate_with_exact_leaves(3, 3).is_empty());
    }

    #[test]
    fn optimized_threshold() {
        assert!(should_use_optimized(20, 3));
        assert!(should_use_optimized(25, 4));
        assert!(!should_use_optimized(19, 3));
        assert!(!should_use_optimized(20, 5));
    }
}

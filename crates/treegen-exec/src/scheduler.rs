//! Strategy execution.
//!
//! The parallel generic path:
//! 1. Pre-warm a shared memo for subtree sizes up to `min(n/2, prewarm_limit)`.
//! 2. Freeze it into a snapshot; each worker layers a private replica on top.
//! 3. Workers claim contiguous batches of top-level partitions from an atomic
//!    cursor, solve them, and send materialized trees over a bounded channel.
//! 4. The calling thread drains the channel into the `Collector`.
//!
//! Replica sizes are reserved against a `ReplicaBudget` first; the worker
//! count shrinks to what the budget grants.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{bounded, Receiver};

use treegen_core::config::GeneratorConfig;
use treegen_core::error::{Error, Result};
use treegen_core::id::WorkerId;
use treegen_core::partition::partitions_at_most;
use treegen_core::tree::Tree;

use treegen_engine::{
    build_exact_parallel, dedup, prewarm, solve_partition, trees_up_to_leaves, trees_with_budget,
    Memo, SplitPolicy,
};
use treegen_mem::{ReplicaBudget, SystemResources};

use crate::collector::Collector;
use crate::progress::Progress;

/// Smallest reservation per worker replica.
const MIN_REPLICA_BYTES: usize = 8 * 1024 * 1024;

/// What a strategy reports back besides the trees themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub threads: usize,
    pub units: usize,
}

/// Hands out contiguous index ranges of a fixed work list.
#[derive(Debug)]
pub struct WorkQueue {
    next: AtomicUsize,
    total: usize,
    batch: usize,
}

impl WorkQueue {
    /// Claim size is `max(1, total / (workers * batches_per_worker))`.
    pub fn new(total: usize, workers: usize, batches_per_worker: usize) -> Self {
        let batch = (total / (workers.max(1) * batches_per_worker.max(1))).max(1);
        Self {
            next: AtomicUsize::new(0),
            total,
            batch,
        }
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn claim(&self) -> Option<Range<usize>> {
        let start = self.next.fetch_add(self.batch, Ordering::Relaxed);
        if start >= self.total {
            None
        } else {
            Some(start..(start + self.batch).min(self.total))
        }
    }
}

/// Memoized recursion on the calling thread.
pub fn run_single(n: usize, m: usize, collector: &mut Collector<'_>) -> Result<RunStats> {
    let mut memo = Memo::new();
    let entry = trees_with_budget(&mut memo, n, m);
    tracing::debug!(n, m, found = entry.len(), arena = memo.arena.len(), "single-threaded pass done");
    for &id in entry.iter() {
        collector.accept(memo.arena.materialize(id))?;
    }
    Ok(RunStats {
        threads: 1,
        units: 1,
    })
}

pub fn run_parallel_generic(
    cfg: &GeneratorConfig,
    n: usize,
    m: usize,
    threads: usize,
    resources: &SystemResources,
    progress: &Progress,
    collector: &mut Collector<'_>,
) -> Result<RunStats> {
    let mut memo = Memo::new().with_split(SplitPolicy {
        min_nodes: cfg.split_min_nodes,
        min_leaves: cfg.split_min_leaves,
        max_threads: threads,
    });
    prewarm(&mut memo, (n / 2).min(cfg.prewarm_limit), m);
    let snapshot = memo.snapshot();
    drop(memo);

    let below = n.saturating_sub(1);
    let parts = partitions_at_most(below, below.min(m), 1);
    progress.units_total.store(parts.len(), Ordering::Relaxed);

    let per_worker = snapshot.replica_bytes().max(MIN_REPLICA_BYTES);
    let mut guards = ReplicaBudget::for_available(resources.available_bytes)
        .reserve_workers(threads, per_worker);
    guards.truncate(parts.len().max(1));
    let workers = guards.len();
    if workers < threads.min(parts.len()) {
        tracing::warn!(requested = threads, granted = workers, "worker count reduced by memory budget");
    }

    let queue = WorkQueue::new(parts.len(), workers, cfg.batches_per_thread);
    tracing::info!(n, m, partitions = parts.len(), workers, batch = queue.batch(), "fanning out");

    let (tx, rx) = bounded::<Vec<Tree>>(cfg.channel_capacity.max(1));

    std::thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::with_capacity(workers);
        for (i, guard) in guards.into_iter().enumerate() {
            let tx = tx.clone();
            let snapshot = &snapshot;
            let queue = &queue;
            let parts = &parts;
            let spawned = std::thread::Builder::new()
                .name(format!("treegen-worker-{i}"))
                .spawn_scoped(scope, move || {
                    let _reservation = guard;
                    let worker = WorkerId::new(i as u32);
                    let mut replica = snapshot.replica();
                    let mut solved = 0usize;
                    'claims: while let Some(range) = queue.claim() {
                        for idx in range {
                            let mut ids = Vec::new();
                            solve_partition(&mut replica, &parts[idx], m, &mut ids);
                            let batch: Vec<Tree> = dedup(ids)
                                .into_iter()
                                .map(|id| replica.arena.materialize(id))
                                .collect();
                            progress.units_done.fetch_add(1, Ordering::Relaxed);
                            solved += 1;
                            if !batch.is_empty() && tx.send(batch).is_err() {
                                // Collector is gone; nothing left to deliver to.
                                break 'claims;
                            }
                        }
                    }
                    tracing::debug!(%worker, solved, arena = replica.arena.len(), "worker finished");
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => tracing::warn!(worker = i, error = %e, "could not spawn worker"),
            }
        }
        drop(tx);
        if handles.is_empty() {
            return Err(Error::Worker("no worker thread could be spawned".into()));
        }

        let drained = drain(rx, collector);

        let failed = handles
            .into_iter()
            .map(|h| h.join())
            .filter(|joined| joined.is_err())
            .count();
        if failed > 0 {
            return Err(Error::Worker(format!("{failed} worker thread(s) panicked")));
        }
        drained
    })?;

    Ok(RunStats {
        threads: workers,
        units: parts.len(),
    })
}

/// Consumes the receiver so that an early return disconnects the workers.
fn drain(rx: Receiver<Vec<Tree>>, collector: &mut Collector<'_>) -> Result<()> {
    for batch in rx.iter() {
        collector.extend(batch)?;
    }
    Ok(())
}

/// Exact-leaf table built level by level, then the union of levels `1..=m`.
pub fn run_parallel_specialized(
    n: usize,
    m: usize,
    threads: usize,
    progress: &Progress,
    collector: &mut Collector<'_>,
) -> Result<RunStats> {
    let levels = m.min(n);
    let cells = n * levels;
    progress.units_total.store(cells, Ordering::Relaxed);

    let mut memo = Memo::new();
    build_exact_parallel(&mut memo, n, levels, threads, &progress.units_done);
    let ids = trees_up_to_leaves(&mut memo, n, levels);
    tracing::debug!(n, m, found = ids.len(), arena = memo.arena.len(), "exact table built");

    for id in ids {
        collector.accept(memo.arena.materialize(id))?;
    }
    Ok(RunStats {
        threads,
        units: cells,
    })
}

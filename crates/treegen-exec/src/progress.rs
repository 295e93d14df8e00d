//! Periodic progress reporting.
//!
//! Workers and the collector bump shared counters; a reporter thread polls
//! them every interval and forwards a snapshot to `tracing` and an optional
//! sink. The reporter stops as soon as it is dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use serde::Serialize;

/// Counters shared by one run.
#[derive(Debug, Default)]
pub struct Progress {
    /// Unique trees delivered to the caller.
    pub trees: AtomicUsize,
    /// Work units finished (partitions or exact-table cells).
    pub units_done: AtomicUsize,
    pub units_total: AtomicUsize,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, elapsed: Duration) -> ProgressSnapshot {
        ProgressSnapshot {
            elapsed_ms: elapsed.as_millis() as u64,
            trees: self.trees.load(Ordering::Relaxed),
            units_done: self.units_done.load(Ordering::Relaxed),
            units_total: self.units_total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub elapsed_ms: u64,
    pub trees: usize,
    pub units_done: usize,
    pub units_total: usize,
}

impl ProgressSnapshot {
    pub fn trees_per_second(&self) -> f64 {
        if self.elapsed_ms == 0 {
            0.0
        } else {
            self.trees as f64 * 1000.0 / self.elapsed_ms as f64
        }
    }
}

/// Receives snapshots on the reporter thread.
pub trait ProgressSink: Send + Sync {
    fn report(&self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressSnapshot) + Send + Sync,
{
    fn report(&self, snapshot: &ProgressSnapshot) {
        self(snapshot)
    }
}

pub struct ProgressReporter {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn start(
        progress: Arc<Progress>,
        interval: Duration,
        sink: Option<Arc<dyn ProgressSink>>,
    ) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let started = Instant::now();
        let spawned = std::thread::Builder::new()
            .name("treegen-progress".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let snap = progress.snapshot(started.elapsed());
                        tracing::debug!(
                            trees = snap.trees,
                            done = snap.units_done,
                            total = snap.units_total,
                            elapsed_ms = snap.elapsed_ms,
                            "progress"
                        );
                        if let Some(sink) = &sink {
                            sink.report(&snap);
                        }
                    }
                    _ => break,
                }
            });

        let handle = match spawned {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::warn!(error = %e, "progress reporter unavailable");
                None
            }
        };
        Self {
            stop: Some(stop_tx),
            handle,
        }
    }

    /// Stop polling and wait for the reporter thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

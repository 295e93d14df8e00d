//! Replica budget + RAII guards.
//!
//! Every ParallelGeneric worker owns a cache replica. Before a worker is
//! spawned the scheduler reserves its expected footprint here; the guard
//! travels with the worker and returns the bytes when it is dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use treegen_core::budget::{BudgetGuard, MemoryBudget};

struct Ledger {
    capacity: usize,
    reserved: AtomicUsize,
}

impl Ledger {
    fn reserve(&self, bytes: usize) -> bool {
        let mut cur = self.reserved.load(Ordering::Relaxed);
        loop {
            let next = cur.saturating_add(bytes);
            if next > self.capacity {
                return false;
            }
            match self
                .reserved
                .compare_exchange_weak(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.reserved.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Memory budget shared by the workers of one run.
#[derive(Clone)]
pub struct ReplicaBudget {
    ledger: Arc<Ledger>,
}

impl ReplicaBudget {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            ledger: Arc::new(Ledger {
                capacity: capacity_bytes,
                reserved: AtomicUsize::new(0),
            }),
        }
    }

    /// Budget for a machine whose free memory is unknown.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Sized to detected available memory, or unbounded when unknown.
    pub fn for_available(available_bytes: Option<u64>) -> Self {
        match available_bytes {
            Some(bytes) => Self::new(usize::try_from(bytes).unwrap_or(usize::MAX)),
            None => Self::unbounded(),
        }
    }

    /// Reserve up to `desired` worker replicas of `per_worker` bytes each.
    /// Always grants at least one so a run can make progress.
    pub fn reserve_workers(&self, desired: usize, per_worker: usize) -> Vec<ReplicaGuard> {
        let mut guards = Vec::with_capacity(desired.max(1));
        for _ in 0..desired.max(1) {
            match self.try_acquire(per_worker, "replica") {
                Some(g) => guards.push(g),
                None => break,
            }
        }
        if guards.is_empty() {
            guards.push(ReplicaGuard {
                ledger: Arc::clone(&self.ledger),
                bytes: 0,
                tag: "replica-fallback",
            });
        }
        guards
    }
}

/// RAII reservation; dropping it returns the bytes.
pub struct ReplicaGuard {
    ledger: Arc<Ledger>,
    bytes: usize,
    tag: &'static str,
}

impl Drop for ReplicaGuard {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.ledger.release(self.bytes);
            self.bytes = 0;
        }
    }
}

impl BudgetGuard for ReplicaGuard {
    fn bytes(&self) -> usize {
        self.bytes
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl MemoryBudget for ReplicaBudget {
    type Guard = ReplicaGuard;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes > 0 && !self.ledger.reserve(bytes) {
            return None;
        }
        Some(ReplicaGuard {
            ledger: Arc::clone(&self.ledger),
            bytes,
            tag,
        })
    }

    fn capacity_bytes(&self) -> usize {
        self.ledger.capacity
    }

    fn used_bytes(&self) -> usize {
        self.ledger.reserved.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_workers_stops_at_capacity() {
        let budget = ReplicaBudget::new(10_000);
        let guards = budget.reserve_workers(8, 3_000);
        assert_eq!(guards.len(), 3);
        assert_eq!(budget.used_bytes(), 9_000);
        drop(guards);
        assert_eq!(budget.used_bytes(), 0);
    }

    #[test]
    fn at_least_one_worker_is_granted() {
        let budget = ReplicaBudget::new(100);
        let guards = budget.reserve_workers(4, 1_000);
        assert_eq!(guards.len(), 1);
        assert_eq!(guards[0].bytes(), 0);
        assert_eq!(guards[0].tag(), "replica-fallback");
    }

    #[test]
    fn unknown_memory_is_unbounded() {
        let budget = ReplicaBudget::for_available(None);
        assert_eq!(budget.capacity_bytes(), usize::MAX);
        assert_eq!(budget.reserve_workers(16, 1 << 30).len(), 16);
    }
}

//! Abstract memory budget interfaces.
//!
//! The concrete implementation lives in `treegen-mem`. Only traits live here
//! so the scheduler can depend on the API without the detection logic.

/// A guard returned by a memory budget when bytes are reserved.
///
/// Must be RAII (releases on Drop) and `Send` so it can travel with a worker.
pub trait BudgetGuard: Send {
    /// Number of bytes currently accounted for by this guard.
    fn bytes(&self) -> usize;
    /// Debug tag for tracing.
    fn tag(&self) -> &'static str {
        "guard"
    }
}

/// A handle representing a memory-cap enforcer.
///
/// The scheduler reserves one worker's cache replica at a time; when
/// `try_acquire` returns `None` it stops adding workers.
pub trait MemoryBudget: Send + Sync + 'static {
    type Guard: BudgetGuard;

    /// Attempt to reserve `bytes` from the live budget.
    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard>;

    /// Total configured capacity (bytes).
    fn capacity_bytes(&self) -> usize;

    /// Approximate currently reserved bytes (advisory).
    fn used_bytes(&self) -> usize;
}

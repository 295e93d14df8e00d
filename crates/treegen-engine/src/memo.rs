//! Per-thread generation state.
//!
//! A `Memo` owns a mutable arena layer and two caches keyed by
//! (node count, leaf count): `budget` holds "at most that many leaves"
//! answers, `exact` holds "exactly that many leaves" answers. Entries are
//! complete and deduplicated once written and are never invalidated.
//!
//! `snapshot` freezes the arena so replicas can be layered over it. Cloning a
//! cache only clones `Arc`s, and every id it holds is below the frozen length,
//! so replicas never need reconciling.

use std::sync::Arc;

use treegen_core::arena::TreeArena;
use treegen_core::id::NodeId;

/// A cache entry: canonical tree ids in discovery order.
pub type Entry = Arc<[NodeId]>;

#[derive(Debug, Clone, Default)]
pub struct TreeCache {
    rows: Vec<Vec<Option<Entry>>>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, nodes: usize, leaves: usize) -> Option<&Entry> {
        self.rows.get(nodes)?.get(leaves)?.as_ref()
    }

    pub fn insert(&mut self, nodes: usize, leaves: usize, entry: Entry) {
        if self.rows.len() <= nodes {
            self.rows.resize_with(nodes + 1, Vec::new);
        }
        let row = &mut self.rows[nodes];
        if row.len() <= leaves {
            row.resize(leaves + 1, None);
        }
        row[leaves] = Some(entry);
    }

    /// Number of populated keys.
    pub fn len(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.iter().filter(|e| e.is_some()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// When a generic subproblem is big enough to spread its child-count loop
/// across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPolicy {
    pub min_nodes: usize,
    pub min_leaves: usize,
    pub max_threads: usize,
}

impl SplitPolicy {
    /// `remaining` is the node count below the root.
    pub fn applies(&self, remaining: usize, max_leaves: usize) -> bool {
        self.max_threads > 1 && remaining > self.min_nodes && max_leaves > self.min_leaves
    }
}

#[derive(Debug, Default)]
pub struct Memo {
    pub arena: TreeArena,
    pub budget: TreeCache,
    pub exact: TreeCache,
    pub(crate) split: Option<SplitPolicy>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_split(mut self, policy: SplitPolicy) -> Self {
        self.split = Some(policy);
        self
    }

    /// Freeze the arena and capture both caches.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot {
            arena: self.arena.checkpoint(),
            budget: self.budget.clone(),
            exact: self.exact.clone(),
        }
    }
}

/// Read-only state a replica starts from.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub arena: Arc<TreeArena>,
    pub budget: TreeCache,
    pub exact: TreeCache,
}

impl Snapshot {
    /// Ids below this are valid in every replica.
    pub fn shared_len(&self) -> usize {
        self.arena.len()
    }

    /// An independent memo layered over the snapshot. Replicas never split.
    pub fn replica(&self) -> Memo {
        Memo {
            arena: TreeArena::layer_over(Arc::clone(&self.arena)),
            budget: self.budget.clone(),
            exact: self.exact.clone(),
            split: None,
        }
    }

    /// Rough footprint of one replica before it starts growing.
    pub fn replica_bytes(&self) -> usize {
        let entries = self.budget.len() + self.exact.len();
        entries * std::mem::size_of::<Option<Entry>>() + self.arena.approx_bytes() / 8
    }
}

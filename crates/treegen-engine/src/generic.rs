//! Generic at-most-M recurrence.
//!
//! `T(n, m)`: every canonical tree with `n` nodes and at most `m` leaves.
//! - `T(0, m)` and `T(n, 0)` are empty.
//! - `T(1, m)` is the lone leaf.
//! - Otherwise: for each child count `k` and each partition of `n - 1` into
//!   `k` parts, assemble children drawn from `T(part, m)`, then deduplicate.
//!
//! Each child carries at least one leaf, so `k` stops at `min(n - 1, m)`.

use std::collections::HashSet;
use std::sync::Arc;

use treegen_core::id::NodeId;
use treegen_core::partition::partitions;

use crate::assembler::assemble;
use crate::memo::{Entry, Memo, SplitPolicy};

/// `T(n, max_leaves)`, memoized in `memo.budget`.
pub fn trees_with_budget(memo: &mut Memo, n: usize, max_leaves: usize) -> Entry {
    if let Some(hit) = memo.budget.get(n, max_leaves) {
        return Arc::clone(hit);
    }

    let found: Vec<NodeId> = if n == 0 || max_leaves == 0 {
        Vec::new()
    } else if n == 1 {
        vec![memo.arena.leaf()]
    } else {
        match memo.split {
            Some(policy) if policy.applies(n - 1, max_leaves) => {
                split_by_child_count(memo, n, max_leaves, policy)
            }
            _ => {
                let mut out = Vec::new();
                for k in 1..=max_children(n, max_leaves) {
                    children_with_count(memo, n, k, max_leaves, &mut out);
                }
                dedup(out)
            }
        }
    };

    let entry: Entry = Arc::from(found);
    memo.budget.insert(n, max_leaves, Arc::clone(&entry));
    entry
}

/// Assemble every root whose child sizes are `partition` (sizes of the
/// subtrees under the root), appending raw results to `out`.
pub fn solve_partition(memo: &mut Memo, partition: &[usize], max_leaves: usize, out: &mut Vec<NodeId>) {
    let mut options = Vec::with_capacity(partition.len());
    for &part in partition {
        let entry = trees_with_budget(memo, part, max_leaves);
        if entry.is_empty() {
            return;
        }
        options.push(entry);
    }
    assemble(&mut memo.arena, &options, max_leaves, out);
}

/// Fill `memo.budget` for every subtree size up to `limit` under `max_leaves`.
pub fn prewarm(memo: &mut Memo, limit: usize, max_leaves: usize) {
    for size in 1..=limit {
        trees_with_budget(memo, size, max_leaves);
    }
    tracing::debug!(limit, max_leaves, arena = memo.arena.len(), "prewarmed budget cache");
}

pub(crate) fn max_children(n: usize, max_leaves: usize) -> usize {
    n.saturating_sub(1).min(max_leaves)
}

fn children_with_count(memo: &mut Memo, n: usize, k: usize, max_leaves: usize, out: &mut Vec<NodeId>) {
    for partition in partitions(n - 1, k, 1) {
        solve_partition(memo, &partition, max_leaves, out);
    }
}

/// Parallel form of the child-count loop: solve every smaller size first,
/// freeze, hand child counts to scoped threads with private buckets, then
/// import and merge.
fn split_by_child_count(memo: &mut Memo, n: usize, max_leaves: usize, policy: SplitPolicy) -> Vec<NodeId> {
    for size in 1..n {
        trees_with_budget(memo, size, max_leaves);
    }
    let snapshot = memo.snapshot();
    let shared = snapshot.shared_len();

    let counts: Vec<usize> = (1..=max_children(n, max_leaves)).collect();
    let threads = policy.max_threads.min(counts.len()).max(1);
    tracing::debug!(n, max_leaves, threads, "splitting child-count loop");

    let buckets = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let snapshot = &snapshot;
                let mine: Vec<usize> = counts.iter().copied().skip(t).step_by(threads).collect();
                scope.spawn(move || {
                    let mut replica = snapshot.replica();
                    let mut bucket = Vec::new();
                    for k in mine {
                        children_with_count(&mut replica, n, k, max_leaves, &mut bucket);
                    }
                    (replica.arena, bucket)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(done) => done,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect::<Vec<_>>()
    });

    let mut merged = Vec::new();
    for (arena, bucket) in &buckets {
        merged.extend(memo.arena.import(arena, shared, bucket));
    }
    dedup(merged)
}

/// Keep the first occurrence of each id.
pub fn dedup(ids: Vec<NodeId>) -> Vec<NodeId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn serializations(memo: &Memo, entry: &Entry) -> BTreeSet<String> {
        entry
            .iter()
            .map(|id| memo.arena.serialization(*id).to_string())
            .collect()
    }

    #[test]
    fn base_cases() {
        let mut memo = Memo::new();
        assert!(trees_with_budget(&mut memo, 0, 5).is_empty());
        assert!(trees_with_budget(&mut memo, 1, 0).is_empty());
        assert!(trees_with_budget(&mut memo, 3, 0).is_empty());
        let one = trees_with_budget(&mut memo, 1, 1);
        assert_eq!(one.len(), 1);
        assert_eq!(memo.arena.serialization(one[0]), "()");
    }

    #[test]
    fn three_nodes_two_leaves() {
        let mut memo = Memo::new();
        let got = trees_with_budget(&mut memo, 3, 2);
        let want: BTreeSet<String> = ["((),())", "((()))"].iter().map(|s| s.to_string()).collect();
        assert_eq!(serializations(&memo, &got), want);
    }

    #[test]
    fn unconstrained_counts_follow_a000081() {
        let expected = [1, 1, 2, 4, 9, 20, 48, 115, 286, 719];
        let mut memo = Memo::new();
        for (i, want) in expected.iter().enumerate() {
            let n = i + 1;
            assert_eq!(trees_with_budget(&mut memo, n, n).len(), *want, "n={n}");
        }
    }

    #[test]
    fn results_obey_constraints_and_are_unique() {
        let mut memo = Memo::new();
        let got = trees_with_budget(&mut memo, 9, 3);
        let unique: HashSet<_> = got.iter().collect();
        assert_eq!(unique.len(), got.len());
        for id in got.iter() {
            assert_eq!(memo.arena.node_count(*id), 9);
            assert!(memo.arena.leaf_count(*id) <= 3);
        }
    }

    #[test]
    fn memo_hit_returns_same_entry() {
        let mut memo = Memo::new();
        let a = trees_with_budget(&mut memo, 7, 3);
        let b = trees_with_budget(&mut memo, 7, 3);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn split_matches_sequential() {
        let policy = SplitPolicy {
            min_nodes: 5,
            min_leaves: 2,
            max_threads: 4,
        };
        let mut seq = Memo::new();
        let mut par = Memo::new().with_split(policy);
        for (n, m) in [(9, 4), (10, 10), (11, 5)] {
            let a = trees_with_budget(&mut seq, n, m);
            let b = trees_with_budget(&mut par, n, m);
            assert_eq!(serializations(&seq, &a), serializations(&par, &b), "n={n} m={m}");
        }
    }

    #[test]
    fn solve_partition_builds_roots_with_given_child_sizes() {
        let mut memo = Memo::new();
        let mut out = Vec::new();
        solve_partition(&mut memo, &[2, 1], 5, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(memo.arena.serialization(out[0]), "((),(()))");
        let mut none = Vec::new();
        solve_partition(&mut memo, &[1, 1, 1], 2, &mut none);
        assert!(none.is_empty());
    }
}

//! Exact-leaf-count generator.
//!
//! `E(n, k)`: every canonical tree with exactly `n` nodes and `k` leaves.
//! A tree with `k >= 2` leaves is a stem of single-child nodes above a
//! branching root (a root with at least two children), so
//! `E(n, k) = B(n, k) ∪ wrap(E(n - 1, k))`.
//!
//! `B(n, k)` has closed forms for `k <= 4` in terms of chain lengths and
//! smaller exact entries. Larger `k` partitions the leaves over the children,
//! spreads the remaining nodes over them, and assembles from the exact cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use treegen_core::id::NodeId;
use treegen_core::partition::{compositions, partitions};

use crate::assembler::assemble;
use crate::generic::dedup;
use crate::memo::{Entry, Memo};

/// Highest leaf count with a closed form.
pub const CLOSED_FORM_MAX_LEAVES: usize = 4;

/// `E(n, k)`, memoized in `memo.exact`. Missing smaller entries are computed
/// on demand; `build_exact_table` fills them bottom-up instead.
pub fn exact_trees(memo: &mut Memo, n: usize, k: usize) -> Entry {
    if let Some(hit) = memo.exact.get(n, k) {
        return Arc::clone(hit);
    }
    let found = if k == 1 && n >= 1 {
        vec![memo.arena.chain(n)]
    } else if k < 2 || n < k + 1 {
        Vec::new()
    } else {
        let roots = branching_roots(memo, n, k);
        with_stems(memo, n, k, roots)
    };
    let entry: Entry = Arc::from(found);
    memo.exact.insert(n, k, Arc::clone(&entry));
    entry
}

/// Smallest node count that can hold `leaves` leaves.
fn min_nodes(leaves: usize) -> usize {
    if leaves <= 1 {
        leaves
    } else {
        leaves + 1
    }
}

fn with_stems(memo: &mut Memo, n: usize, k: usize, mut roots: Vec<NodeId>) -> Vec<NodeId> {
    let below = exact_trees(memo, n - 1, k);
    for id in below.iter() {
        roots.push(memo.arena.wrap(*id));
    }
    dedup(roots)
}

/// `B(n, k)` for `k >= 2`.
fn branching_roots(memo: &mut Memo, n: usize, k: usize) -> Vec<NodeId> {
    let roots = match k {
        2 => two_leaf_roots(memo, n),
        3 => three_leaf_roots(memo, n),
        4 => four_leaf_roots(memo, n),
        _ => general_roots(memo, n, k),
    };
    dedup(roots)
}

fn chains(memo: &mut Memo, lengths: &[usize]) -> Vec<NodeId> {
    lengths.iter().map(|len| memo.arena.chain(*len)).collect()
}

/// Two chains of lengths `a >= b`, `a + b = n - 1`.
fn two_leaf_roots(memo: &mut Memo, n: usize) -> Vec<NodeId> {
    let mut out = Vec::new();
    for lengths in partitions(n - 1, 2, 1) {
        let children = chains(memo, &lengths);
        out.push(memo.arena.intern(children));
    }
    out
}

/// Three chains, or a chain next to a 2-leaf subtree.
fn three_leaf_roots(memo: &mut Memo, n: usize) -> Vec<NodeId> {
    let mut out = Vec::new();
    for lengths in partitions(n - 1, 3, 1) {
        let children = chains(memo, &lengths);
        out.push(memo.arena.intern(children));
    }
    for pair in (min_nodes(2)..n - 1).rev() {
        let chain = memo.arena.chain(n - 1 - pair);
        for sub in exact_trees(memo, pair, 2).iter() {
            out.push(memo.arena.intern(vec![chain, *sub]));
        }
    }
    out
}

/// Four chains; a 2-leaf subtree and two chains; a chain and a 3-leaf
/// subtree; two 2-leaf subtrees.
fn four_leaf_roots(memo: &mut Memo, n: usize) -> Vec<NodeId> {
    let rest = n - 1;
    let mut out = Vec::new();

    for lengths in partitions(rest, 4, 1) {
        let children = chains(memo, &lengths);
        out.push(memo.arena.intern(children));
    }

    for pair in min_nodes(2)..rest.saturating_sub(1) {
        let subs = exact_trees(memo, pair, 2);
        for lengths in partitions(rest - pair, 2, 1) {
            let [a, b] = [memo.arena.chain(lengths[0]), memo.arena.chain(lengths[1])];
            for sub in subs.iter() {
                out.push(memo.arena.intern(vec![*sub, a, b]));
            }
        }
    }

    for triple in min_nodes(3)..rest {
        let chain = memo.arena.chain(rest - triple);
        for sub in exact_trees(memo, triple, 3).iter() {
            out.push(memo.arena.intern(vec![chain, *sub]));
        }
    }

    for sizes in partitions(rest, 2, min_nodes(2)) {
        let left = exact_trees(memo, sizes[0], 2);
        let right = exact_trees(memo, sizes[1], 2);
        assemble(&mut memo.arena, &[left, right], 4, &mut out);
    }

    out
}

/// Any `k`: partition the leaves over `j >= 2` children, spread `n - 1` nodes
/// over them, assemble from `E(size, leaves)`.
pub(crate) fn general_roots(memo: &mut Memo, n: usize, k: usize) -> Vec<NodeId> {
    let mut out = Vec::new();
    for j in 2..=k {
        for leaves in partitions(k, j, 1) {
            let lower: Vec<usize> = leaves.iter().map(|l| min_nodes(*l)).collect();
            // Children with equal leaf counts are interchangeable; only
            // non-increasing sizes among them are needed.
            let tied: Vec<bool> = (0..j).map(|i| i > 0 && leaves[i] == leaves[i - 1]).collect();
            for sizes in compositions(n - 1, &lower, &tied) {
                let options: Vec<Entry> = sizes
                    .iter()
                    .zip(&leaves)
                    .map(|(size, l)| exact_trees(memo, *size, *l))
                    .collect();
                assemble(&mut memo.arena, &options, k, &mut out);
            }
        }
    }
    out
}

/// Fill `memo.exact` for all `n <= max_nodes`, `k <= max_leaves`: leaf count
/// ascending, node count ascending within each level.
pub fn build_exact_table(memo: &mut Memo, max_nodes: usize, max_leaves: usize) {
    for k in 1..=max_leaves {
        for n in 1..=max_nodes {
            exact_trees(memo, n, k);
        }
    }
}

/// `build_exact_table` with levels above the closed forms spread across
/// `threads`. Within such a level the branching roots for every node count
/// are independent (their children sit on lower levels), so they are built
/// concurrently in replicas and imported; stems are then added in node order.
/// `done` counts finished (n, k) cells.
pub fn build_exact_parallel(
    memo: &mut Memo,
    max_nodes: usize,
    max_leaves: usize,
    threads: usize,
    done: &AtomicUsize,
) {
    for k in 1..=max_leaves {
        if k <= CLOSED_FORM_MAX_LEAVES || threads <= 1 {
            for n in 1..=max_nodes {
                exact_trees(memo, n, k);
                done.fetch_add(1, Ordering::Relaxed);
            }
            continue;
        }

        let snapshot = memo.snapshot();
        let shared = snapshot.shared_len();
        let sizes: Vec<usize> = (min_nodes(k)..=max_nodes).collect();
        let workers = threads.min(sizes.len()).max(1);
        tracing::debug!(k, workers, "building exact level in parallel");

        let parts = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|t| {
                    let snapshot = &snapshot;
                    let mine: Vec<usize> = sizes.iter().copied().skip(t).step_by(workers).collect();
                    scope.spawn(move || {
                        let mut replica = snapshot.replica();
                        let mut found = Vec::with_capacity(mine.len());
                        for n in mine {
                            let roots = branching_roots(&mut replica, n, k);
                            found.push((n, roots));
                        }
                        (replica.arena, found)
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

        let mut roots_by_size: Vec<Vec<NodeId>> = vec![Vec::new(); max_nodes + 1];
        for (arena, found) in &parts {
            for (n, roots) in found {
                roots_by_size[*n] = memo.arena.import(arena, shared, roots);
            }
        }

        for n in 1..=max_nodes {
            let roots = std::mem::take(&mut roots_by_size[n]);
            let found = if n < min_nodes(k) {
                Vec::new()
            } else {
                with_stems(memo, n, k, roots)
            };
            memo.exact.insert(n, k, Arc::from(found));
            done.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Every tree with `n` nodes and at most `max_leaves` leaves, as the union of
/// the exact levels. Levels are disjoint, so no deduplication is needed.
pub fn trees_up_to_leaves(memo: &mut Memo, n: usize, max_leaves: usize) -> Vec<NodeId> {
    let mut out = Vec::new();
    for k in 1..=max_leaves.min(n) {
        out.extend(exact_trees(memo, n, k).iter().copied());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generic::trees_with_budget;
    use std::collections::BTreeSet;

    fn names(memo: &Memo, ids: &[NodeId]) -> BTreeSet<String> {
        ids.iter()
            .map(|id| memo.arena.serialization(*id).to_string())
            .collect()
    }

    #[test]
    fn single_leaf_is_a_chain() {
        let mut memo = Memo::new();
        let one = exact_trees(&mut memo, 1, 1);
        assert_eq!(memo.arena.serialization(one[0]), "()");
        let four = exact_trees(&mut memo, 4, 1);
        assert_eq!(four.len(), 1);
        assert_eq!(memo.arena.serialization(four[0]), "(((())))");
    }

    #[test]
    fn two_leaves_include_stems() {
        let mut memo = Memo::new();
        let got = exact_trees(&mut memo, 4, 2);
        let want: BTreeSet<String> = ["((),(()))", "(((),()))"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names(&memo, &got), want);
        assert!(exact_trees(&mut memo, 2, 2).is_empty());
        assert!(exact_trees(&mut memo, 3, 0).is_empty());
        assert!(exact_trees(&mut memo, 0, 0).is_empty());
    }

    #[test]
    fn closed_forms_match_generic_levels() {
        // |T(n, k)| - |T(n, k - 1)| is the exact-k count.
        let mut exact = Memo::new();
        let mut generic = Memo::new();
        for n in 1..=11 {
            for k in 1..=5 {
                let at_most = trees_with_budget(&mut generic, n, k).len();
                let below = trees_with_budget(&mut generic, n, k - 1).len();
                assert_eq!(exact_trees(&mut exact, n, k).len(), at_most - below, "n={n} k={k}");
            }
        }
    }

    #[test]
    fn closed_forms_match_general_construction() {
        let mut memo = Memo::new();
        build_exact_table(&mut memo, 12, 4);
        for k in 2..=4 {
            for n in (k + 1)..=12 {
                let closed = dedup(branching_roots(&mut memo, n, k));
                let general = dedup(general_roots(&mut memo, n, k));
                assert_eq!(names(&memo, &closed), names(&memo, &general), "n={n} k={k}");
            }
        }
    }

    #[test]
    fn union_of_levels_matches_generic() {
        let mut exact = Memo::new();
        let mut generic = Memo::new();
        let ids = trees_up_to_leaves(&mut exact, 10, 3);
        let reference = trees_with_budget(&mut generic, 10, 3);
        assert_eq!(names(&exact, &ids), names(&generic, &reference));
        assert!(trees_up_to_leaves(&mut exact, 0, 3).is_empty());
    }

    #[test]
    fn parallel_build_matches_sequential() {
        let done = AtomicUsize::new(0);
        let mut par = Memo::new();
        build_exact_parallel(&mut par, 11, 6, 4, &done);
        assert_eq!(done.load(Ordering::Relaxed), 11 * 6);

        let mut seq = Memo::new();
        build_exact_table(&mut seq, 11, 6);
        for k in 1..=6 {
            for n in 1..=11 {
                let a = par.exact.get(n, k).cloned().unwrap_or_else(|| Arc::from(Vec::new()));
                let b = seq.exact.get(n, k).cloned().unwrap_or_else(|| Arc::from(Vec::new()));
                assert_eq!(names(&par, &a), names(&seq, &b), "n={n} k={k}");
            }
        }
    }
}

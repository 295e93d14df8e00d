//! Combination assembly: one subtree per child slot, under a leaf budget.

use treegen_core::arena::TreeArena;
use treegen_core::id::NodeId;

use crate::memo::Entry;

/// Intern every parent whose children pick one id from each `options` slot
/// and whose total leaf count is at most `max_leaves`, appending to `out`.
///
/// A partial pick is abandoned as soon as its leaves, plus the fewest leaves
/// the remaining slots could add, exceed the budget. Parents produced by
/// permuting equal slots are interned to the same id but still appended; the
/// caller deduplicates.
pub fn assemble(
    arena: &mut TreeArena,
    options: &[Entry],
    max_leaves: usize,
    out: &mut Vec<NodeId>,
) {
    if options.iter().any(|o| o.is_empty()) {
        return;
    }

    // floor[i]: fewest leaves slots i.. can contribute.
    let mut floor = vec![0usize; options.len() + 1];
    for i in (0..options.len()).rev() {
        let least = options[i]
            .iter()
            .map(|id| arena.leaf_count(*id))
            .min()
            .unwrap_or(0);
        floor[i] = floor[i + 1] + least;
    }
    if floor[0] > max_leaves {
        return;
    }

    let mut current = Vec::with_capacity(options.len());
    pick(arena, options, &floor, max_leaves, 0, &mut current, out);
}

fn pick(
    arena: &mut TreeArena,
    options: &[Entry],
    floor: &[usize],
    budget_left: usize,
    pos: usize,
    current: &mut Vec<NodeId>,
    out: &mut Vec<NodeId>,
) {
    if pos == options.len() {
        out.push(arena.intern(current.clone()));
        return;
    }
    for &id in options[pos].iter() {
        let leaves = arena.leaf_count(id);
        if leaves + floor[pos + 1] > budget_left {
            continue;
        }
        current.push(id);
        pick(arena, options, floor, budget_left - leaves, pos + 1, current, out);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn cartesian_product_respects_budget() {
        let mut arena = TreeArena::new();
        let chain2 = arena.chain(2); // 1 leaf
        let fork = {
            let l = arena.leaf();
            arena.intern(vec![l, l])
        }; // 2 leaves, 3 nodes
        let chain3 = arena.chain(3);
        let size3: Entry = Arc::from(vec![chain3, fork]);
        let size2: Entry = Arc::from(vec![chain2]);

        let mut out = Vec::new();
        assemble(&mut arena, &[size3.clone(), size2.clone()], 3, &mut out);
        assert_eq!(out.len(), 2);

        let mut out = Vec::new();
        assemble(&mut arena, &[size3, size2], 2, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(arena.serialization(out[0]), "(((())),(()))");
    }

    #[test]
    fn equal_slots_yield_duplicate_ids() {
        let mut arena = TreeArena::new();
        let chain3 = arena.chain(3);
        let l = arena.leaf();
        let fork = arena.intern(vec![l, l]);
        let size3: Entry = Arc::from(vec![chain3, fork]);

        let mut out = Vec::new();
        assemble(&mut arena, &[size3.clone(), size3], 10, &mut out);
        // (a,b) and (b,a) collapse to one node but both are reported.
        assert_eq!(out.len(), 4);
        let unique: std::collections::HashSet<_> = out.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn empty_slot_or_tight_budget_yields_nothing() {
        let mut arena = TreeArena::new();
        let leaf = arena.leaf();
        let one: Entry = Arc::from(vec![leaf]);
        let none: Entry = Arc::from(Vec::new());
        let mut out = Vec::new();
        assemble(&mut arena, &[one.clone(), none], 5, &mut out);
        assert!(out.is_empty());
        assemble(&mut arena, &[one.clone(), one.clone(), one], 2, &mut out);
        assert!(out.is_empty());
    }
}

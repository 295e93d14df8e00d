//! The single consumer of generated trees.

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use treegen_core::error::{Error, Result};
use treegen_core::hash::Fingerprint;
use treegen_core::tree::Tree;

use crate::progress::Progress;

/// Canonicalizes incoming trees and forwards each distinct one exactly once.
pub struct Collector<'a> {
    nodes: usize,
    max_leaves: usize,
    seen: HashSet<Fingerprint>,
    duplicates: usize,
    progress: &'a Progress,
    on_tree: &'a mut dyn FnMut(&Tree),
}

impl<'a> Collector<'a> {
    /// Accepts trees with exactly `nodes` nodes and at most `max_leaves` leaves.
    pub fn new(
        nodes: usize,
        max_leaves: usize,
        progress: &'a Progress,
        on_tree: &'a mut dyn FnMut(&Tree),
    ) -> Self {
        Self {
            nodes,
            max_leaves,
            seen: HashSet::new(),
            duplicates: 0,
            progress,
            on_tree,
        }
    }

    /// `Ok(true)` if the tree was new and delivered.
    pub fn accept(&mut self, mut tree: Tree) -> Result<bool> {
        let (nodes, leaves) = (tree.node_count(), tree.leaf_count());
        if nodes != self.nodes || leaves > self.max_leaves {
            return Err(Error::Invariant(format!(
                "generated tree {} has {} nodes and {} leaves, requested {} nodes and at most {}",
                tree, nodes, leaves, self.nodes, self.max_leaves
            )));
        }
        tree.canonicalize();
        if !self.seen.insert(tree.fingerprint()) {
            self.duplicates += 1;
            return Ok(false);
        }
        (self.on_tree)(&tree);
        self.progress.trees.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    pub fn extend<I: IntoIterator<Item = Tree>>(&mut self, trees: I) -> Result<()> {
        for tree in trees {
            self.accept(tree)?;
        }
        Ok(())
    }

    /// Distinct trees delivered so far.
    pub fn emitted(&self) -> usize {
        self.seen.len()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

//! Owned, canonicalizable unordered rooted tree.
//!
//! `Tree` is the value handed to result callbacks. The generators themselves
//! work on `TreeArena` ids and only materialize `Tree`s at the boundary.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::hash::{fingerprint_str, Fingerprint};

/// A node with an ordered sequence of children. No children means leaf.
///
/// Canonical form: every child list is sorted by the total order below,
/// recursively. Two trees are equal iff their bracket serializations match.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    children: Vec<Tree>,
}

impl Tree {
    /// A single node, which is a leaf.
    pub fn leaf() -> Self {
        Self::default()
    }

    /// Build a tree from children and canonicalize it.
    pub fn new(children: Vec<Tree>) -> Self {
        let mut tree = Self { children };
        tree.canonicalize();
        tree
    }

    /// Build from children that are already canonical and sorted.
    pub(crate) fn from_canonical(children: Vec<Tree>) -> Self {
        Self { children }
    }

    /// Append a child. Canonical order is lost until `canonicalize` runs.
    pub fn add_child(&mut self, child: Tree) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Tree] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Tree::node_count).sum::<usize>()
    }

    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            return 1;
        }
        self.children.iter().map(Tree::leaf_count).sum()
    }

    /// Recursively sort children into canonical order. Idempotent.
    pub fn canonicalize(&mut self) {
        for child in &mut self.children {
            child.canonicalize();
        }
        // Leaves sort first; everything else by serialization.
        self.children
            .sort_by_cached_key(|c| (!c.is_leaf(), c.serialize()));
    }

    /// Bracket encoding: `()` for a leaf, `(c1,c2,...)` otherwise.
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.node_count() * 3);
        self.write_bracket(&mut out);
        out
    }

    fn write_bracket(&self, out: &mut String) {
        out.push('(');
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            child.write_bracket(out);
        }
        out.push(')');
    }

    /// Digest of the current serialization; a dedup key once canonical.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint_str(&self.serialize())
    }

    /// ASCII diagram, one node per line, each line starting with `prefix`.
    pub fn render(&self, prefix: &str) -> String {
        let mut out = String::new();
        self.write_diagram(&mut out, prefix, true);
        out
    }

    fn write_diagram(&self, out: &mut String, prefix: &str, is_last: bool) {
        out.push_str(prefix);
        out.push_str(if is_last { "└── " } else { "├── " });
        out.push_str(if self.is_leaf() { "Leaf" } else { "Node" });
        out.push('\n');

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        let last = self.children.len().saturating_sub(1);
        for (i, child) in self.children.iter().enumerate() {
            child.write_diagram(out, &child_prefix, i == last);
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

// Equal serializations <=> equal ordered structure, so compare structurally.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children
    }
}

impl Eq for Tree {}

impl Hash for Tree {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.children.len());
        for child in &self.children {
            child.hash(state);
        }
    }
}

impl PartialOrd for Tree {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order: the leaf is the unique minimum, then bracket strings compare
/// lexicographically.
impl Ord for Tree {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_leaf(), other.is_leaf()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.serialize().cmp(&other.serialize()),
        }
    }
}

//! Hash-consed arena of canonical tree nodes.
//!
//! Each node stores its children as `NodeId`s sorted by the canonical order,
//! so a canonical child list maps to exactly one id and deduplication reduces
//! to id comparison.
//!
//! Arenas are layered: `freeze` turns an arena into a shared read-only base,
//! `layer_over` starts a mutable layer on top of it. Ids below the base length
//! mean the same node in every layer over that base; higher ids are local.
//! `import` moves nodes between sibling layers.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::id::NodeId;
use crate::tree::Tree;

#[derive(Debug)]
struct Slot {
    children: Box<[NodeId]>,
    nodes: u32,
    leaves: u32,
    /// Bracket serialization; the ordering key.
    key: Box<str>,
}

#[derive(Debug, Default)]
pub struct TreeArena {
    base: Option<Arc<TreeArena>>,
    /// Length of `base` (0 without one).
    offset: usize,
    slots: Vec<Slot>,
    interned: HashMap<Box<[NodeId]>, NodeId>,
}

impl TreeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty mutable layer over a frozen arena.
    pub fn layer_over(base: Arc<TreeArena>) -> Self {
        Self {
            offset: base.len(),
            base: Some(base),
            slots: Vec::new(),
            interned: HashMap::new(),
        }
    }

    pub fn freeze(self) -> Arc<TreeArena> {
        Arc::new(self)
    }

    /// Freeze everything interned so far and continue in a fresh layer on top.
    /// Returns the frozen part; its ids stay valid in this arena.
    pub fn checkpoint(&mut self) -> Arc<TreeArena> {
        if self.slots.is_empty() {
            if let Some(base) = &self.base {
                return Arc::clone(base);
            }
        }
        let frozen = Arc::new(std::mem::take(self));
        *self = TreeArena::layer_over(Arc::clone(&frozen));
        frozen
    }

    /// Total number of nodes visible from this layer.
    pub fn len(&self) -> usize {
        self.offset + self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of ids shared with the base.
    pub fn base_len(&self) -> usize {
        self.offset
    }

    fn slot(&self, id: NodeId) -> &Slot {
        let i = id.index();
        match &self.base {
            Some(base) if i < self.offset => base.slot(id),
            _ => &self.slots[i - self.offset],
        }
    }

    fn lookup(&self, children: &[NodeId]) -> Option<NodeId> {
        if let Some(base) = &self.base {
            if let Some(id) = base.lookup(children) {
                return Some(id);
            }
        }
        self.interned.get(children).copied()
    }

    /// Sort `children` canonically and return the id of the resulting node,
    /// creating it if it is new.
    pub fn intern(&mut self, mut children: Vec<NodeId>) -> NodeId {
        children.sort_by(|a, b| self.cmp_nodes(*a, *b));
        if let Some(id) = self.lookup(&children) {
            return id;
        }

        let (nodes, leaves) = if children.is_empty() {
            (1, 1)
        } else {
            children.iter().fold((1u32, 0u32), |(n, l), c| {
                let s = self.slot(*c);
                (n + s.nodes, l + s.leaves)
            })
        };

        let mut key = String::with_capacity(nodes as usize * 3);
        key.push('(');
        for (i, c) in children.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            key.push_str(&self.slot(*c).key);
        }
        key.push(')');

        let id = NodeId::new(self.len() as u32);
        let children: Box<[NodeId]> = children.into_boxed_slice();
        self.interned.insert(children.clone(), id);
        self.slots.push(Slot {
            children,
            nodes,
            leaves,
            key: key.into_boxed_str(),
        });
        id
    }

    pub fn leaf(&mut self) -> NodeId {
        self.intern(Vec::new())
    }

    /// New root whose only child is `id`.
    pub fn wrap(&mut self, id: NodeId) -> NodeId {
        self.intern(vec![id])
    }

    /// Path of `len` nodes ending in a leaf; `len` is clamped to at least 1.
    pub fn chain(&mut self, len: usize) -> NodeId {
        let mut id = self.leaf();
        for _ in 1..len {
            id = self.wrap(id);
        }
        id
    }

    pub fn node_count(&self, id: NodeId) -> usize {
        self.slot(id).nodes as usize
    }

    pub fn leaf_count(&self, id: NodeId) -> usize {
        self.slot(id).leaves as usize
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.slot(id).children.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slot(id).children
    }

    pub fn serialization(&self, id: NodeId) -> &str {
        &self.slot(id).key
    }

    /// Canonical total order: leaf first, then bracket strings.
    pub fn cmp_nodes(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        match (self.is_leaf(a), self.is_leaf(b)) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.slot(a).key.cmp(&self.slot(b).key),
        }
    }

    /// Copy `ids` from a sibling layer. Both arenas must share their first
    /// `shared` ids (the common frozen base); those are reused as-is.
    pub fn import(&mut self, other: &TreeArena, shared: usize, ids: &[NodeId]) -> Vec<NodeId> {
        let mut seen = HashMap::new();
        ids.iter()
            .map(|id| self.import_one(other, shared, *id, &mut seen))
            .collect()
    }

    fn import_one(
        &mut self,
        other: &TreeArena,
        shared: usize,
        id: NodeId,
        seen: &mut HashMap<NodeId, NodeId>,
    ) -> NodeId {
        if id.index() < shared {
            return id;
        }
        if let Some(mapped) = seen.get(&id) {
            return *mapped;
        }
        let children = other
            .children(id)
            .iter()
            .map(|c| self.import_one(other, shared, *c, seen))
            .collect();
        let mapped = self.intern(children);
        seen.insert(id, mapped);
        mapped
    }

    /// Owned canonical `Tree` for `id`.
    pub fn materialize(&self, id: NodeId) -> Tree {
        let children = self
            .children(id)
            .iter()
            .map(|c| self.materialize(*c))
            .collect();
        Tree::from_canonical(children)
    }

    /// Intern an owned tree (in any sibling order).
    pub fn intern_tree(&mut self, tree: &Tree) -> NodeId {
        let children = tree.children().iter().map(|c| self.intern_tree(c)).collect();
        self.intern(children)
    }

    /// Rough heap footprint of this layer and its bases.
    pub fn approx_bytes(&self) -> usize {
        let per_slot = std::mem::size_of::<Slot>() + std::mem::size_of::<(Box<[NodeId]>, NodeId)>();
        let local: usize = self
            .slots
            .iter()
            .map(|s| per_slot + 2 * s.children.len() * std::mem::size_of::<NodeId>() + s.key.len())
            .sum();
        local + self.base.as_ref().map_or(0, |b| b.approx_bytes())
    }
}

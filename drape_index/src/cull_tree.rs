// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quad-subdividing cull tree: structure, updates, queries.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::types::{Mbr, Scalar};

const ROOT: usize = 0;

/// Tuning knobs for a [`CullTree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CullTreeConfig {
    /// Drawables a childless node holds before it splits into quadrants.
    pub max_per_node: usize,
    /// Nodes at this depth never split and accumulate drawables past the cap.
    pub max_depth: u32,
}

impl Default for CullTreeConfig {
    fn default() -> Self {
        Self {
            max_per_node: 8,
            max_depth: 12,
        }
    }
}

/// How a query region relates to a node's bounds.
///
/// Returned by the classifier passed to [`CullTree::query_with`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Containment {
    /// Entirely outside the query region; the subtree is pruned.
    Outside,
    /// Partially inside; local drawables are tested and children visited.
    Partial,
    /// Entirely inside; the node's cached descendant set is taken without descending.
    Inside,
}

/// Generational handle for a tree node.
///
/// Only used for introspection ([`CullTree::nodes`]); node slots are reused
/// after pruning and the generation distinguishes old handles from new ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef(u32, u32);

impl NodeRef {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "NodeRef uses 32-bit indices by design."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    /// Arena slot of the node.
    pub const fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Introspection counters for tuning and tests.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TreeStats {
    /// Live nodes, including the root.
    pub nodes: usize,
    /// Live nodes without children.
    pub leaves: usize,
    /// Deepest live node (root is depth 0).
    pub max_depth: u32,
    /// Drawables currently indexed.
    pub drawables: usize,
    /// Drawables per node divided by the per-node cap.
    pub fill_factor: f64,
}

/// Summary of one live node, yielded by [`CullTree::nodes`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NodeInfo<T> {
    /// Handle of the node.
    pub node: NodeRef,
    /// The node's quadrant of the root box.
    pub bounds: Mbr<T>,
    /// Depth below the root.
    pub depth: u32,
    /// Drawables stored directly at the node.
    pub local: usize,
    /// Drawables stored anywhere below the node.
    pub descendants: usize,
}

#[derive(Clone, Debug)]
struct Node<T, D> {
    generation: u32,
    bounds: Mbr<T>,
    depth: u32,
    parent: Option<usize>,
    children: [Option<usize>; 4],
    split: bool,
    drawables: BTreeSet<D>,
    child_drawables: BTreeSet<D>,
}

impl<T, D: Ord> Node<T, D> {
    fn new(generation: u32, bounds: Mbr<T>, depth: u32, parent: Option<usize>) -> Self {
        Self {
            generation,
            bounds,
            depth,
            parent,
            children: [None; 4],
            split: false,
            drawables: BTreeSet::new(),
            child_drawables: BTreeSet::new(),
        }
    }

    fn has_children(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }

    fn is_empty(&self) -> bool {
        self.drawables.is_empty() && self.child_drawables.is_empty() && !self.has_children()
    }
}

/// A recursive quad subdivision of a bounded local coordinate space.
///
/// Each node stores up to [`CullTreeConfig::max_per_node`] drawable references
/// before splitting into quadrants. Drawables larger than any quadrant stay at
/// the node that straddles them. Every node caches the set of drawables stored
/// anywhere beneath it, so a region that fully contains a node is answered
/// without descending.
///
/// Drawables whose bounds fall outside the root box are kept at the root.
pub struct CullTree<T: Scalar, D: Copy + Ord + Debug> {
    config: CullTreeConfig,
    nodes: Vec<Option<Node<T, D>>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    bounds_of: BTreeMap<D, Mbr<T>>,
}

impl<T: Scalar, D: Copy + Ord + Debug> Debug for CullTree<T, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("CullTree")
            .field("config", &self.config)
            .field("root", &self.root_bounds())
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("drawables", &self.bounds_of.len())
            .finish_non_exhaustive()
    }
}

impl<T: Scalar, D: Copy + Ord + Debug> CullTree<T, D> {
    /// Create an empty tree over `root` with default tuning.
    pub fn new(root: Mbr<T>) -> Self {
        Self::with_config(root, CullTreeConfig::default())
    }

    /// Create an empty tree over `root`.
    pub fn with_config(root: Mbr<T>, config: CullTreeConfig) -> Self {
        debug_assert!(config.max_per_node > 0, "node cap must be positive");
        Self {
            config,
            nodes: alloc::vec![Some(Node::new(1, root, 0, None))],
            generations: alloc::vec![1],
            free_list: Vec::new(),
            bounds_of: BTreeMap::new(),
        }
    }

    /// Tuning this tree was built with.
    pub fn config(&self) -> CullTreeConfig {
        self.config
    }

    /// Bounds of the root node.
    pub fn root_bounds(&self) -> Mbr<T> {
        self.node(ROOT).bounds
    }

    /// Number of drawables indexed.
    pub fn len(&self) -> usize {
        self.bounds_of.len()
    }

    /// True if no drawables are indexed.
    pub fn is_empty(&self) -> bool {
        self.bounds_of.is_empty()
    }

    /// Whether `drawable` is indexed.
    pub fn contains(&self, drawable: D) -> bool {
        self.bounds_of.contains_key(&drawable)
    }

    /// Bounds `drawable` was inserted with.
    pub fn bounds_of(&self, drawable: D) -> Option<Mbr<T>> {
        self.bounds_of.get(&drawable).copied()
    }

    /// Drop every drawable and node except an empty root.
    pub fn clear(&mut self) {
        let root = self.root_bounds();
        *self = Self::with_config(root, self.config);
    }

    /// Insert `drawable` with `bounds`.
    ///
    /// Re-inserting a drawable that is already present moves it to the new bounds.
    /// An empty `bounds` is a no-op and returns `false`.
    pub fn insert(&mut self, bounds: Mbr<T>, drawable: D) -> bool {
        if bounds.is_empty() {
            log::trace!("cull tree: ignoring {drawable:?} with empty bounds");
            return false;
        }
        if self.bounds_of.contains_key(&drawable) {
            self.remove(drawable);
        }
        self.bounds_of.insert(drawable, bounds);

        let mut idx = ROOT;
        loop {
            let node = self.node(idx);
            if node.split {
                match self.quadrant_for(idx, &bounds) {
                    Some(q) => {
                        idx = self.ensure_child(idx, q);
                        continue;
                    }
                    None => {
                        self.store(idx, drawable);
                        return true;
                    }
                }
            }
            if node.drawables.len() < self.config.max_per_node
                || node.depth >= self.config.max_depth
            {
                self.store(idx, drawable);
                return true;
            }
            self.split(idx);
        }
    }

    /// Remove `drawable`, pruning nodes that become empty.
    ///
    /// Removing a drawable that was never inserted is a no-op and returns `false`.
    pub fn remove(&mut self, drawable: D) -> bool {
        let Some(bounds) = self.bounds_of.remove(&drawable) else {
            return false;
        };
        let mut idx = ROOT;
        loop {
            if self.node_mut(idx).drawables.remove(&drawable) {
                break;
            }
            let next = if self.node(idx).split {
                self.quadrant_for(idx, &bounds)
                    .and_then(|q| self.node(idx).children[q])
            } else {
                None
            };
            match next {
                Some(child) => idx = child,
                None => {
                    debug_assert!(false, "drawable {drawable:?} missing from its insertion path");
                    return false;
                }
            }
        }

        let mut cur = self.node(idx).parent;
        while let Some(p) = cur {
            let parent = self.node_mut(p);
            parent.child_drawables.remove(&drawable);
            cur = parent.parent;
        }
        self.possible_remove_child(idx);
        true
    }

    /// Drawables whose bounds intersect `region`.
    ///
    /// Subtrees outside `region` are pruned, and nodes entirely inside it
    /// contribute their cached descendant sets without further descent.
    /// An empty `region` yields an empty set.
    pub fn query_rect(&self, region: &Mbr<T>) -> BTreeSet<D> {
        if region.is_empty() {
            return BTreeSet::new();
        }
        self.query_with(|b| {
            if region.contains_mbr(b) {
                Containment::Inside
            } else if region.intersects(b) {
                Containment::Partial
            } else {
                Containment::Outside
            }
        })
    }

    /// Drawables accepted by a caller-supplied classifier.
    ///
    /// The classifier is asked about node bounds to steer the traversal, and
    /// about individual drawable bounds where a node is only partially inside.
    /// Camera frusta plug in here.
    pub fn query_with<F>(&self, mut classify: F) -> BTreeSet<D>
    where
        F: FnMut(&Mbr<T>) -> Containment,
    {
        let mut out = BTreeSet::new();
        let mut stack = alloc::vec![ROOT];
        while let Some(idx) = stack.pop() {
            let node = self.node(idx);
            // The root also holds drawables that fall outside its own box, so
            // it is always visited and its local drawables are tested one by one.
            let containment = classify(&node.bounds);
            if idx != ROOT && containment == Containment::Outside {
                continue;
            }
            if idx != ROOT && containment == Containment::Inside {
                out.extend(node.drawables.iter().copied());
                out.extend(node.child_drawables.iter().copied());
                continue;
            }
            for d in &node.drawables {
                if classify(&self.bounds_of[d]) != Containment::Outside {
                    out.insert(*d);
                }
            }
            if idx == ROOT && containment == Containment::Inside {
                out.extend(node.child_drawables.iter().copied());
                continue;
            }
            if containment == Containment::Outside {
                continue;
            }
            stack.extend(node.children.iter().flatten().copied());
        }
        out
    }

    /// Every drawable in the tree.
    pub fn all(&self) -> BTreeSet<D> {
        let root = self.node(ROOT);
        root.drawables
            .union(&root.child_drawables)
            .copied()
            .collect()
    }

    /// Iterate over live nodes in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeInfo<T>> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| {
            n.as_ref().map(|n| NodeInfo {
                node: NodeRef::new(i, n.generation),
                bounds: n.bounds,
                depth: n.depth,
                local: n.drawables.len(),
                descendants: n.child_drawables.len(),
            })
        })
    }

    /// Node count, depth and fill counters.
    pub fn stats(&self) -> TreeStats {
        let mut nodes = 0;
        let mut leaves = 0;
        let mut max_depth = 0;
        for n in self.nodes.iter().flatten() {
            nodes += 1;
            if !n.has_children() {
                leaves += 1;
            }
            max_depth = max_depth.max(n.depth);
        }
        let drawables = self.bounds_of.len();
        let capacity = nodes * self.config.max_per_node;
        TreeStats {
            nodes,
            leaves,
            max_depth,
            drawables,
            fill_factor: if capacity == 0 {
                0.0
            } else {
                drawables as f64 / capacity as f64
            },
        }
    }

    /// Verify that every node's cached descendant set is exactly the union of
    /// its children's local and descendant sets, and that every drawable is
    /// stored exactly once.
    pub fn check_consistency(&self) -> bool {
        let mut seen = 0;
        for (i, n) in self.nodes.iter().enumerate() {
            let Some(n) = n.as_ref() else {
                continue;
            };
            seen += n.drawables.len();
            let mut expected = BTreeSet::new();
            for c in n.children.iter().flatten() {
                let Some(child) = self.nodes[*c].as_ref() else {
                    return false;
                };
                if child.parent != Some(i) {
                    return false;
                }
                expected.extend(child.drawables.iter().copied());
                expected.extend(child.child_drawables.iter().copied());
            }
            if expected != n.child_drawables {
                return false;
            }
            if !n.drawables.is_disjoint(&n.child_drawables) {
                return false;
            }
        }
        seen == self.bounds_of.len()
    }

    // --- internals ---

    fn node(&self, idx: usize) -> &Node<T, D> {
        self.nodes[idx].as_ref().expect("dangling cull tree node")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<T, D> {
        self.nodes[idx].as_mut().expect("dangling cull tree node")
    }

    fn quadrant_for(&self, idx: usize, bounds: &Mbr<T>) -> Option<usize> {
        let node = self.node(idx);
        (0..4).find(|&q| node.bounds.quadrant(q).contains_mbr(bounds))
    }

    fn ensure_child(&mut self, idx: usize, q: usize) -> usize {
        if let Some(child) = self.node(idx).children[q] {
            return child;
        }
        let (bounds, depth) = {
            let n = self.node(idx);
            (n.bounds.quadrant(q), n.depth + 1)
        };
        let child = if let Some(slot) = self.free_list.pop() {
            let generation = self.generations[slot].saturating_add(1);
            self.generations[slot] = generation;
            self.nodes[slot] = Some(Node::new(generation, bounds, depth, Some(idx)));
            slot
        } else {
            self.nodes.push(Some(Node::new(1, bounds, depth, Some(idx))));
            self.generations.push(1);
            self.nodes.len() - 1
        };
        self.node_mut(idx).children[q] = Some(child);
        child
    }

    fn store(&mut self, idx: usize, drawable: D) {
        self.node_mut(idx).drawables.insert(drawable);
        let mut cur = self.node(idx).parent;
        while let Some(p) = cur {
            let parent = self.node_mut(p);
            parent.child_drawables.insert(drawable);
            cur = parent.parent;
        }
    }

    fn split(&mut self, idx: usize) {
        self.node_mut(idx).split = true;
        let local: Vec<D> = self.node(idx).drawables.iter().copied().collect();
        let mut moved = 0_usize;
        for d in local {
            let bounds = self.bounds_of[&d];
            let Some(q) = self.quadrant_for(idx, &bounds) else {
                continue;
            };
            let child = self.ensure_child(idx, q);
            let node = self.node_mut(idx);
            node.drawables.remove(&d);
            node.child_drawables.insert(d);
            self.node_mut(child).drawables.insert(d);
            moved += 1;
        }
        log::trace!(
            "cull tree: split node {idx} at depth {}, moved {moved} drawables down",
            self.node(idx).depth
        );
    }

    fn possible_remove_child(&mut self, mut idx: usize) {
        while idx != ROOT && self.node(idx).is_empty() {
            let Some(parent) = self.node(idx).parent else {
                break;
            };
            let p = self.node_mut(parent);
            for c in &mut p.children {
                if *c == Some(idx) {
                    *c = None;
                }
            }
            if !p.has_children() {
                p.split = false;
            }
            self.nodes[idx] = None;
            self.free_list.push(idx);
            log::trace!("cull tree: pruned empty node {idx}");
            idx = parent;
        }
        if idx == ROOT && !self.node(ROOT).has_children() {
            self.node_mut(ROOT).split = false;
        }
    }
}

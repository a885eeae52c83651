// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clustering of screen objects that cannot be placed without overlap.
//!
//! A [`ClusterEngine`] lives for one layout pass. Objects are offered in
//! priority order; each one ends up [`Placement::Placed`] on its own,
//! [`Placement::Clustered`] into a synthetic [`ClusterObject`], or
//! [`Placement::Rejected`] when it belongs to no cluster group or its cluster
//! marker would cover something it cannot absorb.

use alloc::vec::Vec;
use kurbo::{Point, Rect, Size};

use crate::footprint::{Footprint, polygons_overlap, rect_points};
use crate::overlap::OverlapGrid;

bitflags::bitflags! {
    /// Kind of screen object, as seen by a [`ClusterPolicy`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Category: u8 {
        /// Point marker or icon.
        const MARKER = 0b0000_0001;
        /// Text label.
        const LABEL  = 0b0000_0010;
        /// Screen-space shape.
        const SHAPE  = 0b0000_0100;
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::MARKER
    }
}

/// Identifier of a cluster within one layout pass.
///
/// While a pass runs, an identifier names the cluster's creation slot and
/// keeps resolving to the surviving cluster after it is merged away.
/// [`ClusterEngine::finish`] renumbers the survivors densely in creation
/// order. Identifiers carry no meaning across passes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(pub u32);

/// Decides which categories may share a cluster.
///
/// The engine only ever merges objects of the same cluster group; the policy
/// adds a category constraint on top of that.
pub trait ClusterPolicy {
    /// Whether an object or cluster of category `a` may join one of category `b`.
    fn compatible(&self, a: Category, b: Category) -> bool;
}

/// Screen-space overlap is the only criterion.
#[derive(Copy, Clone, Debug, Default)]
pub struct AnyCategory;

impl ClusterPolicy for AnyCategory {
    fn compatible(&self, _a: Category, _b: Category) -> bool {
        true
    }
}

/// Markers only cluster with markers, labels with labels, and so on.
#[derive(Copy, Clone, Debug, Default)]
pub struct SameCategory;

impl ClusterPolicy for SameCategory {
    fn compatible(&self, a: Category, b: Category) -> bool {
        a == b
    }
}

/// Cluster sizing and the merge-pass bound.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClusterConfig {
    /// On-screen size of a cluster marker.
    pub marker_size: Size,
    /// Upper bound on merge passes in [`ClusterEngine::resolve_clusters`].
    ///
    /// `None` uses the number of live clusters plus one, which can never be
    /// reached since every pass but the last merges at least one pair.
    pub max_merge_passes: Option<usize>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            marker_size: Size::new(32.0, 32.0),
            max_merge_passes: None,
        }
    }
}

/// One candidate offered to the engine.
#[derive(Clone, Debug)]
pub struct SimpleObject<K> {
    /// Caller's back-reference to the original entry.
    pub key: K,
    /// Where the object wants to go.
    pub footprint: Footprint,
    /// Category, for the [`ClusterPolicy`].
    pub category: Category,
    /// Objects only cluster within their group; `None` never clusters.
    pub group: Option<u32>,
}

/// Where an object ended up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Shown on its own at its footprint.
    Placed,
    /// Absorbed into a cluster.
    Clustered(ClusterId),
    /// Overlapped something and could not cluster.
    Rejected,
}

/// A resolved cluster, as handed out by [`ClusterEngine::finish`].
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterObject<K> {
    /// Dense identifier for this pass.
    pub id: ClusterId,
    /// Cluster group shared by every child.
    pub group: u32,
    /// Union of the children's categories.
    pub category: Category,
    /// Children, in the order they joined.
    pub children: Vec<K>,
    /// Marker footprint: children's centers, inflated by half the marker size.
    pub footprint: Footprint,
}

#[derive(Clone, Debug)]
struct Cluster {
    group: u32,
    category: Category,
    members: Vec<usize>,
    footprint: Footprint,
    /// Grid slot of the registered footprint; `None` while it is being settled.
    slot: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Placed,
    Clustered { cluster: usize },
    Rejected,
}

/// Per-pass clustering state machine on top of an [`OverlapGrid`].
///
/// Cluster footprints obey the same rule as placed objects: a cluster marker
/// never covers a placed object or a cluster it cannot merge with. Placed
/// objects of the same group under a marker are absorbed into it; anything
/// else keeps the cluster from showing and its members are rejected.
pub struct ClusterEngine<'p, K, P: ClusterPolicy + ?Sized = AnyCategory> {
    config: ClusterConfig,
    policy: &'p P,
    grid: OverlapGrid,
    /// Grid slot to the individually placed, clusterable object occupying it.
    owners: Vec<Option<usize>>,
    objects: Vec<SimpleObject<K>>,
    states: Vec<State>,
    clusters: Vec<Option<Cluster>>,
    /// Working cluster index to the cluster that absorbed it in a merge.
    merged_into: Vec<Option<usize>>,
}

impl<K, P: ClusterPolicy + ?Sized> core::fmt::Debug for ClusterEngine<'_, K, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClusterEngine")
            .field("config", &self.config)
            .field("grid", &self.grid)
            .field("objects", &self.objects.len())
            .field("live_clusters", &self.live_clusters())
            .finish_non_exhaustive()
    }
}

impl<K, P: ClusterPolicy + ?Sized> ClusterEngine<'_, K, P> {
    /// Number of objects offered so far.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of clusters that have not been merged away or hidden.
    pub fn live_clusters(&self) -> usize {
        self.clusters.iter().flatten().count()
    }
}

impl<'p, K: Copy, P: ClusterPolicy + ?Sized> ClusterEngine<'p, K, P> {
    /// Start a pass over `grid`, which may already hold foreign objects.
    pub fn new(grid: OverlapGrid, config: ClusterConfig, policy: &'p P) -> Self {
        Self {
            config,
            policy,
            grid,
            owners: Vec::new(),
            objects: Vec::new(),
            states: Vec::new(),
            clusters: Vec::new(),
            merged_into: Vec::new(),
        }
    }

    /// Register an object without testing it; it is always [`Placement::Placed`].
    pub fn place_unchecked(&mut self, object: SimpleObject<K>) -> usize {
        self.grid.add_unchecked(&object.footprint.points);
        self.push(object, State::Placed)
    }

    /// Offer the next object in priority order.
    ///
    /// Returns the object's index in this pass.
    pub fn add_object(&mut self, object: SimpleObject<K>) -> usize {
        let conflict = match self.grid.try_insert(&object.footprint.points) {
            Ok(slot) => {
                let index = self.objects.len();
                self.set_owner(slot, Some(index));
                return self.push(object, State::Placed);
            }
            Err(conflict) => conflict,
        };
        let Some(group) = object.group else {
            return self.push(object, State::Rejected);
        };
        let center = object.footprint.center;
        let category = object.category;
        let index = self.push(object, State::Rejected);

        if let Some(c) = self.cluster_covering(group, category, center) {
            self.join(c, index);
            return index;
        }

        let mut members = Vec::new();
        let mut taken = Vec::new();
        if let Some(&Some(other)) = self.owners.get(conflict)
            && self.absorbable(other, group, category)
        {
            self.grid.remove(conflict);
            self.owners[conflict] = None;
            members.push(other);
            taken.push(other);
        }
        members.push(index);
        let cluster = self.create_cluster(group, members);
        if !self.settle(cluster, taken) {
            self.dissolve(cluster);
        }
        index
    }

    /// Seed a cluster directly from `members`, bypassing placement.
    ///
    /// The members must share a cluster group; objects without one are
    /// rejected instead. Returns the cluster's working index, or `None` when
    /// nothing could be clustered or the cluster's marker would cover
    /// something it cannot absorb.
    pub fn add_cluster(&mut self, members: Vec<SimpleObject<K>>) -> Option<usize> {
        let mut indices = Vec::with_capacity(members.len());
        let mut group = None;
        for object in members {
            match (object.group, group) {
                (Some(g), None) => group = Some(g),
                (Some(g), Some(h)) if g == h => {}
                _ => {
                    self.push(object, State::Rejected);
                    continue;
                }
            }
            indices.push(self.push(object, State::Rejected));
        }
        let group = group?;
        let cluster = self.create_cluster(group, indices);
        if self.settle(cluster, Vec::new()) {
            Some(cluster)
        } else {
            self.dissolve(cluster);
            None
        }
    }

    /// Merge overlapping clusters until a pass makes no merge.
    ///
    /// Only clusters in the same group whose categories the policy accepts are
    /// merged. A merge whose marker would cover a foreign object is undone
    /// and the later cluster is hidden instead. Returns the number of merges
    /// performed; running it again on its own output returns zero.
    pub fn resolve_clusters(&mut self) -> usize {
        let bound = self
            .config
            .max_merge_passes
            .unwrap_or_else(|| self.live_clusters() + 1);
        let mut merges = 0;
        let mut passes = 0;
        loop {
            let merged = self.merge_pass();
            if merged == 0 {
                break;
            }
            merges += merged;
            passes += 1;
            if passes >= bound {
                log::error!("cluster resolution hit the merge pass bound ({bound})");
                debug_assert!(false, "cluster resolution exceeded {bound} merge passes");
                break;
            }
        }
        if merges > 0 {
            log::trace!("merged {merges} clusters in {passes} passes");
        }
        merges
    }

    /// Current placement of object `index`.
    ///
    /// Cluster identifiers are working ones; see [`ClusterId`].
    pub fn placement(&self, index: usize) -> Option<Placement> {
        let state = self.states.get(index)?;
        Some(match *state {
            State::Placed => Placement::Placed,
            State::Clustered { cluster } => Placement::Clustered(ClusterId(to_u32(cluster))),
            State::Rejected => Placement::Rejected,
        })
    }

    /// Children of a cluster, in the order they joined.
    ///
    /// An identifier of a cluster that was merged away yields the children of
    /// the cluster it was merged into; a hidden cluster yields none.
    pub fn objects_for_cluster(&self, id: ClusterId) -> Vec<K> {
        let Some(cluster) = self.live_index(id).and_then(|i| self.clusters[i].as_ref()) else {
            return Vec::new();
        };
        cluster.members.iter().map(|&i| self.objects[i].key).collect()
    }

    /// End the pass: final placements (in offer order) and resolved clusters.
    ///
    /// Cluster identifiers in both are dense, in creation order.
    pub fn finish(self) -> (Vec<(K, Placement)>, Vec<ClusterObject<K>>) {
        let mut dense = alloc::vec![0_u32; self.clusters.len()];
        let mut next = 0;
        for (i, c) in self.clusters.iter().enumerate() {
            if c.is_some() {
                dense[i] = next;
                next += 1;
            }
        }
        let placements = self
            .objects
            .iter()
            .zip(&self.states)
            .map(|(o, state)| {
                let placement = match *state {
                    State::Placed => Placement::Placed,
                    State::Clustered { cluster } => Placement::Clustered(ClusterId(dense[cluster])),
                    State::Rejected => Placement::Rejected,
                };
                (o.key, placement)
            })
            .collect();
        let clusters = self
            .clusters
            .iter()
            .enumerate()
            .filter_map(|(i, c)| Some((i, c.as_ref()?)))
            .map(|(i, c)| ClusterObject {
                id: ClusterId(dense[i]),
                group: c.group,
                category: c.category,
                children: c.members.iter().map(|&m| self.objects[m].key).collect(),
                footprint: c.footprint.clone(),
            })
            .collect();
        (placements, clusters)
    }

    fn push(&mut self, object: SimpleObject<K>, state: State) -> usize {
        self.objects.push(object);
        self.states.push(state);
        self.objects.len() - 1
    }

    fn set_owner(&mut self, slot: usize, owner: Option<usize>) {
        if self.owners.len() <= slot {
            self.owners.resize(slot + 1, None);
        }
        self.owners[slot] = owner;
    }

    fn absorbable(&self, other: usize, group: u32, category: Category) -> bool {
        let o = &self.objects[other];
        matches!(self.states[other], State::Placed)
            && o.group == Some(group)
            && self.policy.compatible(o.category, category)
    }

    fn cluster_covering(&self, group: u32, category: Category, center: Point) -> Option<usize> {
        self.clusters.iter().enumerate().find_map(|(i, c)| {
            let c = c.as_ref()?;
            let covers = c.slot.is_some()
                && c.group == group
                && self.policy.compatible(category, c.category)
                && c.footprint.bounds().is_some_and(|r| r.contains(center));
            covers.then_some(i)
        })
    }

    /// Whether grid `slot` holds a cluster that a cluster of `group` and
    /// `category` would merge with.
    fn merges_with(&self, slot: usize, group: u32, category: Category) -> bool {
        self.clusters.iter().flatten().any(|c| {
            c.slot == Some(slot) && c.group == group && self.policy.compatible(category, c.category)
        })
    }

    fn live_index(&self, id: ClusterId) -> Option<usize> {
        let mut i = id.0 as usize;
        loop {
            if self.clusters.get(i)?.is_some() {
                return Some(i);
            }
            i = (*self.merged_into.get(i)?)?;
        }
    }

    /// Push an unregistered cluster; [`Self::settle`] registers it.
    fn create_cluster(&mut self, group: u32, members: Vec<usize>) -> usize {
        let id = self.clusters.len();
        let category = members
            .iter()
            .fold(Category::empty(), |acc, &i| acc | self.objects[i].category);
        for &m in &members {
            self.states[m] = State::Clustered { cluster: id };
        }
        let footprint = self.cluster_footprint(&members);
        self.clusters.push(Some(Cluster {
            group,
            category,
            members,
            footprint,
            slot: None,
        }));
        self.merged_into.push(None);
        id
    }

    /// Add `index` to a registered cluster, or reject it if the grown marker
    /// would cover something the cluster cannot absorb.
    fn join(&mut self, cluster: usize, index: usize) {
        let category = self.objects[index].category;
        let Some(c) = self.clusters[cluster].as_mut() else {
            return;
        };
        let before = c.category;
        c.members.push(index);
        c.category |= category;
        if let Some(slot) = c.slot.take() {
            self.grid.remove(slot);
        }
        self.states[index] = State::Clustered { cluster };
        if self.settle(cluster, Vec::new()) {
            return;
        }
        self.states[index] = State::Rejected;
        if let Some(c) = self.clusters[cluster].as_mut() {
            c.members.retain(|&m| m != index);
            c.category = before;
        }
        self.register(cluster);
    }

    /// Register an unregistered cluster's footprint.
    ///
    /// Placed objects of the same group under the footprint join the cluster,
    /// which can grow the footprint, so this repeats until nothing more joins.
    /// Clusters it would merge with are left to [`Self::resolve_clusters`].
    /// Anything else under the footprint blocks it: the objects in `taken`
    /// and those absorbed here go back to being placed, the cluster stays
    /// unregistered and `false` is returned.
    fn settle(&mut self, cluster: usize, mut taken: Vec<usize>) -> bool {
        loop {
            let Some(c) = self.clusters[cluster].as_ref() else {
                return false;
            };
            let (group, category) = (c.group, c.category);
            let footprint = self.cluster_footprint(&c.members);
            let mut absorbed = Vec::new();
            for slot in self.grid.conflicts(&footprint.points) {
                let owner = self.owners.get(slot).copied().flatten();
                match owner {
                    Some(other) if self.absorbable(other, group, category) => {
                        absorbed.push((slot, other));
                    }
                    _ if self.merges_with(slot, group, category) => {}
                    _ => {
                        self.put_back(cluster, &taken);
                        return false;
                    }
                }
            }
            if absorbed.is_empty() {
                let slot = self.grid.add_unchecked(&footprint.points);
                if let Some(c) = self.clusters[cluster].as_mut() {
                    c.slot = Some(slot);
                    c.footprint = footprint;
                }
                return true;
            }
            for (slot, other) in absorbed {
                self.grid.remove(slot);
                self.owners[slot] = None;
                self.states[other] = State::Clustered { cluster };
                let category = self.objects[other].category;
                if let Some(c) = self.clusters[cluster].as_mut() {
                    c.members.push(other);
                    c.category |= category;
                }
                taken.push(other);
            }
        }
    }

    /// Return absorbed objects to their own grid slots.
    fn put_back(&mut self, cluster: usize, taken: &[usize]) {
        for &o in taken {
            let slot = self.grid.add_unchecked(&self.objects[o].footprint.points);
            self.set_owner(slot, Some(o));
            self.states[o] = State::Placed;
        }
        let Some(members) = self.clusters[cluster]
            .as_ref()
            .map(|c| c.members.iter().copied().filter(|m| !taken.contains(m)).collect::<Vec<_>>())
        else {
            return;
        };
        let category = members
            .iter()
            .fold(Category::empty(), |acc, &i| acc | self.objects[i].category);
        if let Some(c) = self.clusters[cluster].as_mut() {
            c.members = members;
            c.category = category;
        }
    }

    /// Register a cluster's footprint as is, for one that was valid before.
    fn register(&mut self, cluster: usize) {
        let Some(members) = self.clusters[cluster].as_ref().map(|c| c.members.clone()) else {
            return;
        };
        let footprint = self.cluster_footprint(&members);
        let slot = self.grid.add_unchecked(&footprint.points);
        if let Some(c) = self.clusters[cluster].as_mut() {
            c.slot = Some(slot);
            c.footprint = footprint;
        }
    }

    /// Hide a cluster and reject its members.
    fn dissolve(&mut self, cluster: usize) {
        let Some(c) = self.clusters[cluster].take() else {
            return;
        };
        if let Some(slot) = c.slot {
            self.grid.remove(slot);
        }
        for m in c.members {
            self.states[m] = State::Rejected;
        }
        log::trace!("cluster {cluster} would cover a foreign object and is hidden");
    }

    fn merge_pass(&mut self) -> usize {
        let mut merged = 0;
        for i in 0..self.clusters.len() {
            for j in i + 1..self.clusters.len() {
                let (Some(a), Some(b)) = (&self.clusters[i], &self.clusters[j]) else {
                    continue;
                };
                let mergeable = a.group == b.group
                    && self.policy.compatible(a.category, b.category)
                    && polygons_overlap(&a.footprint.points, &b.footprint.points);
                if !mergeable {
                    continue;
                }
                let Some(b) = self.clusters[j].take() else {
                    continue;
                };
                if let Some(slot) = b.slot {
                    self.grid.remove(slot);
                }
                let Some(a) = self.clusters[i].as_mut() else {
                    continue;
                };
                let (kept, before) = (a.members.len(), a.category);
                a.members.extend_from_slice(&b.members);
                a.category |= b.category;
                if let Some(slot) = a.slot.take() {
                    self.grid.remove(slot);
                }
                for &m in &b.members {
                    self.states[m] = State::Clustered { cluster: i };
                }
                if self.settle(i, Vec::new()) {
                    self.merged_into[j] = Some(i);
                    merged += 1;
                    continue;
                }
                for &m in &b.members {
                    self.states[m] = State::Rejected;
                }
                if let Some(a) = self.clusters[i].as_mut() {
                    a.members.truncate(kept);
                    a.category = before;
                }
                self.register(i);
                log::trace!("merging cluster {j} into {i} would cover a foreign object");
            }
        }
        merged
    }

    fn cluster_footprint(&self, members: &[usize]) -> Footprint {
        let mut bounds: Option<Rect> = None;
        let mut sum = Point::ZERO;
        let mut importance = 0.0;
        for &m in members {
            let fp = &self.objects[m].footprint;
            let p = fp.center;
            bounds = Some(bounds.map_or(Rect::from_points(p, p), |r| r.union_pt(p)));
            sum.x += p.x;
            sum.y += p.y;
            importance += fp.importance;
        }
        let n = members.len().max(1) as f64;
        let center = Point::new(sum.x / n, sum.y / n);
        let half = self.config.marker_size * 0.5;
        let rect = bounds
            .unwrap_or(Rect::from_points(center, center))
            .inflate(half.width, half.height);
        Footprint::new(rect_points(rect), center, importance)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Cluster counts per pass stay far below u32::MAX."
)]
fn to_u32(n: usize) -> u32 {
    n as u32
}

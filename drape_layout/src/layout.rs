// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One frame of label and marker layout.

use alloc::vec::Vec;
use core::cmp::Ordering;
use kurbo::{Point, Rect};

use crate::cluster::{
    Category, ClusterConfig, ClusterEngine, ClusterId, ClusterObject, ClusterPolicy, Placement,
    SimpleObject,
};
use crate::footprint::Footprint;
use crate::overlap::{OverlapGrid, OverlapGridConfig};

/// A screen object competing for space this frame.
#[derive(Clone, Debug)]
pub struct LayoutObject<K> {
    /// Caller's identifier, echoed back in the result.
    pub id: K,
    /// Polygon, anchor and importance for this frame.
    pub footprint: Footprint,
    /// Kind of object, consulted by the cluster policy.
    pub category: Category,
    /// Objects only cluster with others of the same group. `None` means the
    /// object is hidden rather than clustered when it does not fit.
    pub cluster_group: Option<u32>,
    /// Placed without an overlap test, ahead of everything else.
    pub always_place: bool,
    /// Stable tie-break between equally important objects; lower goes first.
    pub order: u64,
}

impl<K> LayoutObject<K> {
    /// An unclustered marker with the given footprint.
    pub fn new(id: K, footprint: Footprint) -> Self {
        Self {
            id,
            footprint,
            category: Category::MARKER,
            cluster_group: None,
            always_place: false,
            order: 0,
        }
    }
}

/// The outcome for one object.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Decision {
    /// Drawn on its own, anchored at this screen position.
    Visible(Point),
    /// Represented by a cluster marker.
    ClusteredInto(ClusterId),
    /// Not drawn this frame.
    Hidden,
}

/// Settings for a [`LayoutPass`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LayoutConfig {
    /// Overlap grid sizing.
    pub grid: OverlapGridConfig,
    /// Cluster marker size and merge bound.
    pub cluster: ClusterConfig,
}

/// Decisions for every input object plus the clusters they formed.
#[derive(Clone, Debug)]
pub struct LayoutResult<K> {
    /// One entry per input object, in input order.
    pub decisions: Vec<(K, Decision)>,
    /// Resolved clusters; [`ClusterId`]s index this list.
    pub clusters: Vec<ClusterObject<K>>,
}

impl<K: PartialEq> LayoutResult<K> {
    /// Decision for `id`, if it was part of the pass.
    pub fn decision(&self, id: &K) -> Option<Decision> {
        self.decisions
            .iter()
            .find_map(|(k, d)| (k == id).then_some(*d))
    }

    /// Children of a cluster; empty for an unknown id.
    pub fn objects_for_cluster(&self, id: ClusterId) -> &[K] {
        self.clusters
            .get(id.0 as usize)
            .map_or(&[][..], |c| c.children.as_slice())
    }

    /// Number of objects drawn on their own.
    pub fn visible_count(&self) -> usize {
        self.count(|d| matches!(d, Decision::Visible(_)))
    }

    /// Number of objects folded into clusters.
    pub fn clustered_count(&self) -> usize {
        self.count(|d| matches!(d, Decision::ClusteredInto(_)))
    }

    /// Number of objects not drawn.
    pub fn hidden_count(&self) -> usize {
        self.count(|d| matches!(d, Decision::Hidden))
    }

    fn count(&self, f: impl Fn(&Decision) -> bool) -> usize {
        self.decisions.iter().filter(|(_, d)| f(d)).count()
    }
}

/// Stateless layout runner.
///
/// Layout is recomputed wholesale for every relevant view change; nothing
/// carries over between passes except what the caller keeps from the result.
#[derive(Copy, Clone, Debug, Default)]
pub struct LayoutPass;

impl LayoutPass {
    /// Lay out `objects` over `viewport`.
    ///
    /// Objects entirely outside the viewport are hidden. The rest are offered
    /// to the overlap grid with `always_place` objects first, then by
    /// descending importance, then by ascending `order`, then by input
    /// position, so identical input always gives identical output.
    pub fn run<K: Clone, P: ClusterPolicy + ?Sized>(
        viewport: Rect,
        objects: &[LayoutObject<K>],
        config: &LayoutConfig,
        policy: &P,
    ) -> LayoutResult<K> {
        let viewport = viewport.abs();
        let mut queue: Vec<usize> = (0..objects.len())
            .filter(|&i| on_screen(&objects[i].footprint, viewport))
            .collect();
        queue.sort_by(|&a, &b| priority(&objects[a], &objects[b]).then(a.cmp(&b)));

        let grid = OverlapGrid::with_cell_size(viewport, config.grid.cell_size);
        let mut engine: ClusterEngine<'_, usize, P> =
            ClusterEngine::new(grid, config.cluster, policy);
        for &i in &queue {
            let o = &objects[i];
            let simple = SimpleObject {
                key: i,
                footprint: o.footprint.clone(),
                category: o.category,
                group: o.cluster_group,
            };
            if o.always_place {
                engine.place_unchecked(simple);
            } else {
                engine.add_object(simple);
            }
        }
        engine.resolve_clusters();
        let (placements, clusters) = engine.finish();

        let mut decisions: Vec<(K, Decision)> = objects
            .iter()
            .map(|o| (o.id.clone(), Decision::Hidden))
            .collect();
        for (i, placement) in placements {
            decisions[i].1 = match placement {
                Placement::Placed => Decision::Visible(objects[i].footprint.center),
                Placement::Clustered(c) => Decision::ClusteredInto(c),
                Placement::Rejected => Decision::Hidden,
            };
        }
        let clusters: Vec<ClusterObject<K>> = clusters
            .into_iter()
            .map(|c| ClusterObject {
                id: c.id,
                group: c.group,
                category: c.category,
                children: c.children.iter().map(|&i| objects[i].id.clone()).collect(),
                footprint: c.footprint,
            })
            .collect();

        log::debug!(
            "layout pass: {} objects, {} on screen, {} clusters",
            objects.len(),
            queue.len(),
            clusters.len()
        );
        LayoutResult {
            decisions,
            clusters,
        }
    }
}

fn on_screen(footprint: &Footprint, viewport: Rect) -> bool {
    footprint.bounds().is_some_and(|b| {
        b.x0 <= viewport.x1 && viewport.x0 <= b.x1 && b.y0 <= viewport.y1 && viewport.y0 <= b.y1
    })
}

fn priority<K>(a: &LayoutObject<K>, b: &LayoutObject<K>) -> Ordering {
    b.always_place
        .cmp(&a.always_place)
        .then(b.footprint.importance.total_cmp(&a.footprint.importance))
        .then(a.order.cmp(&b.order))
}

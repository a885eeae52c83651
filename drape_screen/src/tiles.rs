// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ranking tiles or tree nodes for loading and refinement.

use drape_index::{CullTree, Scalar};
use glam::DVec3;

use crate::aabb3::Aabb3;
use crate::importance::{ImportanceOptions, LocalToDisplay, project_aabb};
use crate::view::ViewState;

/// Importance of one tile this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TileImportance<K> {
    /// Caller's tile key.
    pub key: K,
    /// Projected, weighted pixel area.
    pub importance: f64,
    /// Whether any of the tile covers the viewport.
    pub on_screen: bool,
}

/// Score `tiles` for `view` and sort them, most important first.
///
/// Ties keep input order. Tiles with zero importance are still reported, at
/// the end, so the pager can tell "off screen" from "unknown".
pub fn rank_tiles<K: Clone, L: LocalToDisplay + ?Sized>(
    view: &ViewState,
    display: &L,
    tiles: &[(K, Aabb3)],
    options: &ImportanceOptions,
) -> Vec<TileImportance<K>> {
    let mut ranked: Vec<TileImportance<K>> = tiles
        .iter()
        .map(|(key, bounds)| {
            let p = project_aabb(view, display, bounds, options);
            TileImportance {
                key: key.clone(),
                importance: p.importance,
                on_screen: p.on_screen,
            }
        })
        .collect();
    // `sort_by` is stable, which keeps ties in input order.
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    log::trace!(
        "ranked {} tiles, {} on screen",
        ranked.len(),
        ranked.iter().filter(|t| t.on_screen).count()
    );
    ranked
}

/// Rank the live nodes of a cull tree, each extruded over `z_range`.
///
/// Keys are the nodes' arena slots.
pub fn rank_tree_nodes<T, D, L>(
    view: &ViewState,
    display: &L,
    tree: &CullTree<T, D>,
    z_range: (f64, f64),
    options: &ImportanceOptions,
) -> Vec<TileImportance<usize>>
where
    T: Scalar + Into<f64>,
    D: Copy + Ord + core::fmt::Debug,
    L: LocalToDisplay + ?Sized,
{
    let tiles: Vec<(usize, Aabb3)> = tree
        .nodes()
        .map(|n| {
            let b = n.bounds;
            let bounds = Aabb3::new(
                DVec3::new(b.min_x.into(), b.min_y.into(), z_range.0),
                DVec3::new(b.max_x.into(), b.max_y.into(), z_range.1),
            );
            (n.node.slot(), bounds)
        })
        .collect();
    rank_tiles(view, display, &tiles, options)
}

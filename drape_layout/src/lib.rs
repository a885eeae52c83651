// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drape Layout: deciding which screen objects show, hide, or cluster.
//!
//! Every frame, markers and labels compete for screen space. This crate takes
//! their projected [`Footprint`]s and returns a [`Decision`] per object:
//!
//! - [`OverlapGrid`] is a uniform grid over the viewport that accepts a polygon
//!   only if it overlaps nothing already placed.
//! - [`ClusterEngine`] folds clusterable objects that did not fit into
//!   [`ClusterObject`]s and merges overlapping clusters until none overlap.
//! - [`LayoutPass`] runs both in importance order and reports the outcome.
//!
//! Nothing here persists across frames. Callers re-run the pass whenever the
//! view changes enough to matter.
//!
//! # Example
//!
//! ```rust
//! use drape_layout::{
//!     AnyCategory, ClusterId, Decision, Footprint, LayoutConfig, LayoutObject, LayoutPass,
//! };
//! use kurbo::{Point, Rect, Size, Vec2};
//!
//! let label = |id: &'static str, x: f64, importance: f64| {
//!     let mut o = LayoutObject::new(
//!         id,
//!         Footprint::rect(Point::new(x, 50.0), Size::new(10.0, 10.0), Vec2::ZERO, importance),
//!     );
//!     o.cluster_group = Some(0);
//!     o
//! };
//!
//! let viewport = Rect::new(0.0, 0.0, 200.0, 100.0);
//! let objects = [label("a", 50.0, 2.0), label("b", 55.0, 1.0), label("c", 150.0, 1.0)];
//! let result = LayoutPass::run(viewport, &objects, &LayoutConfig::default(), &AnyCategory);
//!
//! // `a` and `b` collide, so they share a cluster; `c` stands alone.
//! assert_eq!(result.objects_for_cluster(ClusterId(0)), ["a", "b"]);
//! assert_eq!(result.decision(&"c"), Some(Decision::Visible(Point::new(150.0, 50.0))));
//! ```
//!
//! ## Ordering
//!
//! The grid itself is order-agnostic; the pass feeds it `always_place` objects
//! first, then by descending importance, with a stable tie-break so identical
//! input gives identical output.
//!
//! ## Clustering policy
//!
//! Objects only cluster within the same cluster group. A [`ClusterPolicy`]
//! further restricts which [`Category`] combinations may merge;
//! [`AnyCategory`] and [`SameCategory`] are provided.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod cluster;
pub mod footprint;
pub mod layout;
pub mod overlap;

pub use cluster::{
    AnyCategory, Category, ClusterConfig, ClusterEngine, ClusterId, ClusterObject, ClusterPolicy,
    Placement, SameCategory, SimpleObject,
};
pub use footprint::{
    Footprint, convex_hull, polygon_area, polygon_bounds, polygons_overlap, rect_points,
    rects_overlap,
};
pub use layout::{Decision, LayoutConfig, LayoutObject, LayoutPass, LayoutResult};
pub use overlap::{OverlapGrid, OverlapGridConfig};

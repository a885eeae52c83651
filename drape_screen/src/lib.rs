// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drape Screen: from 3D volumes to screen footprints and importance.
//!
//! - [`ViewState`] holds one frame's camera and a staleness generation.
//! - [`project_volume`] turns eight display-space corners into a convex
//!   [`ScreenProjection`]: footprint polygon, on-screen flag and importance
//!   (projected pixel area, optionally weighted by surface facing).
//! - [`Frustum`] and [`classify_mbr`] drive [`drape_index::CullTree::query_with`].
//! - [`rank_tiles`] orders tiles or tree nodes for paging.
//!
//! Clipping happens in homogeneous coordinates before the perspective divide.
//! Volumes that contain the eye or reach behind the near plane while visible
//! are reported as covering the whole viewport instead of producing inverted
//! geometry.
//!
//! # Example
//!
//! ```rust
//! use drape_screen::{Aabb3, FlatDisplay, ImportanceOptions, ViewState, project_aabb};
//! use glam::DVec3;
//! use kurbo::Size;
//!
//! let view = ViewState::look_at_perspective(
//!     DVec3::new(0.0, 0.0, 10.0),
//!     DVec3::ZERO,
//!     DVec3::Y,
//!     std::f64::consts::FRAC_PI_2,
//!     Size::new(800.0, 600.0),
//!     0.1,
//!     100.0,
//! );
//! let tile = Aabb3::new(DVec3::new(-1.0, -1.0, 0.0), DVec3::new(1.0, 1.0, 0.0));
//! let p = project_aabb(&view, &FlatDisplay, &tile, &ImportanceOptions::default());
//! assert!(p.on_screen);
//! assert!(p.importance > 0.0);
//!
//! let behind = Aabb3::new(DVec3::new(-1.0, -1.0, 20.0), DVec3::new(1.0, 1.0, 21.0));
//! let p = project_aabb(&view, &FlatDisplay, &behind, &ImportanceOptions::default());
//! assert!(!p.on_screen && p.footprint.is_empty());
//! ```
//!
//! Projection matrices use the `[0, 1]` clip depth convention.

mod aabb3;
mod clip;
mod importance;
mod tiles;
mod view;

pub use aabb3::Aabb3;
pub use clip::{clip_against, clip_polygon};
pub use importance::{
    FlatDisplay, GlobeDisplay, ImportanceOptions, LocalToDisplay, ScreenProjection, classify_mbr,
    project_aabb, project_volume,
};
pub use tiles::{TileImportance, rank_tiles, rank_tree_nodes};
pub use view::{Frustum, ViewState};

// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drape Scene: feature managers feeding a render thread through a change queue.
//!
//! Nothing in this crate touches GPU state. Managers turn features and styles
//! into [`ChangeRequest`]s and submit them as ordered [`ChangeSet`]s to a
//! shared [`ChangeQueue`]; the render thread drains the queue at the start of
//! each frame and applies the batches through its own [`ChangeApplier`].
//! [`SceneState`] is a reference applier that only keeps bookkeeping.
//!
//! - [`SceneContext`] bundles the [`IdentityRegistry`], the queue and the
//!   [`ViewGeneration`]; construct one per scene and clone it into managers.
//! - [`VectorManager`], [`MarkerManager`], [`LabelManager`] and
//!   [`ShapeManager`] implement [`SceneManager`]. Each `add` returns the
//!   identity of a [`SceneRepresentation`] used later to remove or enable
//!   everything the add created.
//! - [`LayoutManager`] lays out markers and labels once per view change and
//!   submits only the difference from the previous frame.
//! - Styles ([`VectorStyle`], [`MarkerStyle`], [`LabelStyle`], [`ShapeStyle`])
//!   are typed, parsed from JSON once, and validated.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use drape_layout::{AnyCategory, LayoutConfig};
//! use drape_scene::{
//!     LayoutManager, Marker, MarkerManager, MarkerStyle, SceneContext, SceneManager, SceneState,
//! };
//! use drape_screen::{FlatDisplay, ViewState};
//! use glam::{DMat4, DVec3};
//! use kurbo::Size;
//!
//! let context = SceneContext::new();
//! let layout = Arc::new(LayoutManager::new(
//!     context.clone(),
//!     LayoutConfig::default(),
//!     AnyCategory,
//! ));
//! let markers = MarkerManager::new(context.clone(), Arc::clone(&layout));
//!
//! // Two overlapping pins in the same cluster group, one far away.
//! let style = MarkerStyle {
//!     width: 16.0,
//!     height: 16.0,
//!     cluster_group: Some(0),
//!     ..MarkerStyle::default()
//! };
//! let pins = markers
//!     .add(
//!         &[
//!             Marker::at(DVec3::new(100.0, 100.0, 0.0)),
//!             Marker::at(DVec3::new(104.0, 102.0, 0.0)),
//!             Marker::at(DVec3::new(300.0, 200.0, 0.0)),
//!         ],
//!         &style,
//!     )
//!     .unwrap();
//!
//! // Local units are pixels in this view.
//! let view = ViewState::new(
//!     DMat4::IDENTITY,
//!     DMat4::orthographic_rh(0.0, 400.0, 300.0, 0.0, -1.0, 1.0),
//!     Size::new(400.0, 300.0),
//! );
//! layout.run(&view, &FlatDisplay);
//!
//! let mut scene = SceneState::new();
//! context.queue.apply_pending(&mut scene);
//! // The lone pin and one cluster marker show.
//! assert_eq!(scene.enabled_drawables().count(), 2);
//! assert_eq!(layout.cluster_markers()[0].children.len(), 2);
//!
//! markers.remove(&[pins]);
//! context.queue.apply_pending(&mut scene);
//! assert_eq!(scene.released(), 1);
//! ```
//!
//! ## Ordering
//!
//! Requests in one batch apply in order, and batches apply in submission
//! order. A manager submits while holding its table lock, so the add, enable
//! and removal of one representation reach the queue in the order they
//! happened. A request that refers to an identity only a later batch creates
//! is a caller bug and is not detected.

mod anchored;
mod change;
mod error;
mod generation;
mod identity;
mod label;
mod layout_manager;
mod manager;
mod marker;
mod representation;
mod shape;
mod style;
mod vector;

pub use change::{
    ChangeApplier, ChangeQueue, ChangeRequest, ChangeSet, Drawable, DrawableKind, DrawableState,
    RequestKind, SceneState, SequencedBatch,
};
pub use error::{SceneError, StyleError};
pub use generation::{GenerationTicket, ViewGeneration};
pub use identity::{Identity, IdentityRegistry};
pub use label::{Label, LabelManager, text_extent};
pub use layout_manager::{ClusterMarker, LayoutEntry, LayoutFrame, LayoutManager};
pub use manager::{SceneContext, SceneManager};
pub use marker::{Marker, MarkerManager};
pub use representation::SceneRepresentation;
pub use shape::{Shape, ShapeManager};
pub use style::{DrawParams, LabelStyle, MarkerStyle, Rgba, ShapeStyle, Style, VectorStyle};
pub use vector::{VectorFeature, VectorManager};

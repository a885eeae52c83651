// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drape Index: bounding rectangles and a quad-subdividing cull tree.
//!
//! Drape Index is the bottom layer of the Drape culling stack.
//!
//! - [`Mbr`] is a 2D minimum bounding rectangle with an explicit "empty" state,
//!   generic over `f32`, `f64`, and `i64`.
//! - [`CullTree`] partitions drawable references over a bounded local
//!   coordinate space so that visibility queries touch only the nodes that can
//!   possibly be on screen.
//!
//! The tree does not know what a drawable is. Callers hand it an opaque,
//! ordered reference (an identifier) together with the drawable's bounds, and
//! get sets of references back from queries.
//!
//! # Example
//!
//! ```rust
//! use drape_index::{CullTree, CullTreeConfig, Mbr};
//!
//! let mut tree: CullTree<f64, u32> = CullTree::with_config(
//!     Mbr::new(0.0, 0.0, 100.0, 100.0),
//!     CullTreeConfig { max_per_node: 8, max_depth: 4 },
//! );
//! for i in 0..20_u32 {
//!     let x = f64::from(i % 5) * 20.0;
//!     let y = f64::from(i / 5) * 20.0;
//!     tree.insert(Mbr::<f64>::from_xywh(x, y, 1.0, 1.0), i);
//! }
//!
//! // Everything intersects the root box.
//! assert_eq!(tree.query_rect(&tree.root_bounds()).len(), 20);
//!
//! // A small window only sees its neighbourhood.
//! let hits = tree.query_rect(&Mbr::new(0.0, 0.0, 10.0, 10.0));
//! assert_eq!(hits.into_iter().collect::<Vec<_>>(), [0]);
//! ```
//!
//! ## Queries
//!
//! - [`CullTree::query_rect`]: everything whose bounds intersect a rectangle.
//! - [`CullTree::query_with`]: traversal steered by a [`Containment`]
//!   classifier, which is how camera frusta drive culling.
//!
//! Neither query produces false negatives.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod cull_tree;
pub mod types;

pub use cull_tree::{Containment, CullTree, CullTreeConfig, NodeInfo, NodeRef, TreeStats};
pub use types::{Mbr, Scalar};

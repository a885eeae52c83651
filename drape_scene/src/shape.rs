// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Circles, rectangles and spheres.

use std::sync::Arc;

use drape_index::Mbr;
use drape_screen::{
    Aabb3, ImportanceOptions, LocalToDisplay, TileImportance, ViewState, rank_tiles,
};
use glam::DVec3;

use crate::change::{ChangeRequest, ChangeSet, Drawable, DrawableKind};
use crate::error::SceneError;
use crate::identity::Identity;
use crate::manager::{ManagerCore, SceneContext, SceneManager, enable_changes};
use crate::representation::SceneRepresentation;
use crate::style::{ShapeStyle, Style};

/// A simple solid in local coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    /// A flat disc at `center.z`.
    Circle {
        /// Center point.
        center: DVec3,
        /// Radius in local units.
        radius: f64,
    },
    /// A flat axis-aligned rectangle at height `z`.
    Rectangle {
        /// Extent in x and y.
        bounds: Mbr<f64>,
        /// Height.
        z: f64,
    },
    /// A sphere.
    Sphere {
        /// Center point.
        center: DVec3,
        /// Radius in local units.
        radius: f64,
    },
}

impl Shape {
    /// Local bounding box.
    pub fn bounds(&self) -> Aabb3 {
        match *self {
            Self::Circle { center, radius } => Aabb3::new(
                center - DVec3::new(radius, radius, 0.0),
                center + DVec3::new(radius, radius, 0.0),
            ),
            Self::Rectangle { bounds, z } => Aabb3::from_mbr(&bounds, z, z),
            Self::Sphere { center, radius } => {
                Aabb3::new(center - DVec3::splat(radius), center + DVec3::splat(radius))
            }
        }
    }

    fn check(&self, index: usize) -> Result<(), SceneError> {
        let invalid = |reason| Err(SceneError::InvalidFeature { index, reason });
        match *self {
            Self::Circle { center, radius } | Self::Sphere { center, radius } => {
                if !center.is_finite() {
                    return invalid("non-finite center");
                }
                if !(radius.is_finite() && radius >= 0.0) {
                    return invalid("radius must be a non-negative number");
                }
            }
            Self::Rectangle { bounds, z } => {
                if bounds.is_empty() {
                    return invalid("empty rectangle");
                }
                let corners = [bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y, z];
                if !corners.iter().all(|v| v.is_finite()) {
                    return invalid("non-finite coordinate");
                }
            }
        }
        Ok(())
    }
}

/// Manager for shapes.
///
/// Besides the usual add, remove and enable, it ranks its shapes by projected
/// screen area so a caller can spend tessellation or loading effort where it
/// shows.
#[derive(Debug)]
pub struct ShapeManager {
    core: ManagerCore<Vec<(Identity, Aabb3)>>,
}

impl ShapeManager {
    /// An empty manager.
    pub fn new(context: SceneContext) -> Self {
        Self {
            core: ManagerCore::new("shape", context),
        }
    }

    /// Add shapes drawn with `style`; returns the representation identity.
    pub fn add(&self, shapes: &[Shape], style: &ShapeStyle) -> Result<Identity, SceneError> {
        style.validate()?;
        for (i, s) in shapes.iter().enumerate() {
            s.check(i)?;
        }
        let registry = &self.core.context().registry;
        let id = registry.allocate();
        let drawables = registry.allocate_many(shapes.len());

        let mut rep = SceneRepresentation::new(id);
        rep.fade = style.draw.fade;
        rep.enabled = style.draw.enable;
        let mut changes = ChangeSet::new();
        let mut extents = Vec::with_capacity(shapes.len());
        for (shape, &d) in shapes.iter().zip(&drawables) {
            let bounds = shape.bounds();
            let mut drawable = Drawable::new(
                d,
                DrawableKind::Shape {
                    sample_count: style.sample_count,
                },
                bounds.to_mbr(),
            );
            drawable.color = style.color;
            drawable.draw_priority = style.draw.draw_priority;
            drawable.visible_range = (style.draw.min_visible, style.draw.max_visible);
            drawable.fade = style.draw.fade;
            drawable.enabled = style.draw.enable;
            changes.push(ChangeRequest::AddDrawable(drawable));
            rep.drawables.insert(d);
            if style.draw.selectable {
                let s = registry.allocate();
                changes.push(ChangeRequest::AddSelectable {
                    id: s,
                    bounds: bounds.to_mbr(),
                });
                if !style.draw.enable {
                    changes.push(ChangeRequest::EnableSelectable(s, false));
                }
                rep.selectables.insert(s);
            }
            extents.push((d, bounds));
        }
        Ok(self.core.insert(rep, extents, changes, |_, _| {}))
    }

    /// [`add`](Self::add) with the style given as a JSON value.
    pub fn add_json(
        &self,
        shapes: &[Shape],
        style: &serde_json::Value,
    ) -> Result<Identity, SceneError> {
        let style = ShapeStyle::from_value(style)?;
        self.add(shapes, &style)
    }

    /// Enabled shape drawables ranked by importance for `view`, highest first.
    pub fn rank_visible<L: LocalToDisplay + ?Sized>(
        &self,
        view: &ViewState,
        display: &L,
        options: &ImportanceOptions,
    ) -> Vec<TileImportance<Identity>> {
        let mut tiles = Vec::new();
        self.core.for_each(|rep, extents| {
            if rep.enabled {
                tiles.extend(extents.iter().copied());
            }
        });
        // Ties in rank keep this order.
        tiles.sort_by_key(|(id, _)| *id);
        rank_tiles(view, display, &tiles, options)
    }
}

impl SceneManager for ShapeManager {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn remove(&self, ids: &[Identity]) {
        self.core.remove(ids, |_, _, _| {});
    }

    fn enable(&self, ids: &[Identity], enabled: bool) {
        self.core
            .enable(ids, enabled, |rep, _, changes| enable_changes(rep, enabled, changes));
    }

    fn representation(&self, id: Identity) -> Option<Arc<SceneRepresentation>> {
        self.core.get(id)
    }

    fn representation_count(&self) -> usize {
        self.core.len()
    }
}

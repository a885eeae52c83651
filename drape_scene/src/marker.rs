// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Screen-space markers anchored at local points.

use std::sync::Arc;

use drape_layout::Category;
use glam::DVec3;
use kurbo::Size;

use crate::anchored::{Anchored, AnchoredCore, AnchoredStyle, ScreenObject};
use crate::change::DrawableKind;
use crate::error::SceneError;
use crate::identity::Identity;
use crate::layout_manager::{LayoutEntry, LayoutManager};
use crate::manager::{SceneContext, SceneManager};
use crate::representation::SceneRepresentation;
use crate::style::{MarkerStyle, Style};

/// One marker.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    /// Anchor in local coordinates.
    pub position: DVec3,
    /// Screen rotation, radians.
    pub rotation: f64,
    /// Overrides the style's layout importance.
    pub importance: Option<f64>,
}

impl Marker {
    /// An unrotated marker at `position`.
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            rotation: 0.0,
            importance: None,
        }
    }
}

impl Anchored for Marker {
    fn anchor(&self) -> DVec3 {
        self.position
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }
}

/// Manager for markers.
///
/// With `layout` on in the style, markers are added disabled and the shared
/// [`LayoutManager`] decides each frame which ones show, which cluster and
/// which stay hidden. Without it they show unconditionally.
#[derive(Debug)]
pub struct MarkerManager {
    objects: AnchoredCore,
}

impl MarkerManager {
    /// A manager registering laid-out markers with `layout`.
    pub fn new(context: SceneContext, layout: Arc<LayoutManager>) -> Self {
        Self {
            objects: AnchoredCore::new("marker", context, layout),
        }
    }

    /// Add markers drawn with `style`; returns the representation identity.
    pub fn add(&self, markers: &[Marker], style: &MarkerStyle) -> Result<Identity, SceneError> {
        style.validate()?;
        let shared = AnchoredStyle {
            draw: &style.draw,
            color: style.color,
            laid_out: style.layout,
        };
        let size = Size::new(style.width, style.height);
        self.objects.add(markers, shared, |m, d| ScreenObject {
            kind: DrawableKind::Marker { size: [style.width, style.height] },
            entry: LayoutEntry {
                rotation: m.rotation,
                importance: m.importance.unwrap_or(style.layout_importance),
                category: Category::MARKER,
                cluster_group: style.cluster_group,
                ..LayoutEntry::new(d, m.position, size)
            },
        })
    }

    /// [`add`](Self::add) with the style given as a JSON value.
    pub fn add_json(
        &self,
        markers: &[Marker],
        style: &serde_json::Value,
    ) -> Result<Identity, SceneError> {
        let style = MarkerStyle::from_value(style)?;
        self.add(markers, &style)
    }
}

impl SceneManager for MarkerManager {
    fn name(&self) -> &'static str {
        self.objects.core().name()
    }

    fn remove(&self, ids: &[Identity]) {
        self.objects.remove(ids);
    }

    fn enable(&self, ids: &[Identity], enabled: bool) {
        self.objects.enable(ids, enabled);
    }

    fn representation(&self, id: Identity) -> Option<Arc<SceneRepresentation>> {
        self.objects.core().get(id)
    }

    fn representation_count(&self) -> usize {
        self.objects.core().len()
    }
}

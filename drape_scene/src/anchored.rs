// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plumbing shared by the managers of point-anchored screen objects.
//!
//! Markers and labels differ only in what they draw and how big their layout
//! box is. Everything else, from validation to registering with the
//! [`LayoutManager`] and toggling, lives here.

use std::sync::Arc;

use drape_index::Mbr;
use glam::DVec3;

use crate::change::{ChangeRequest, ChangeSet, Drawable, DrawableKind};
use crate::error::SceneError;
use crate::identity::Identity;
use crate::layout_manager::{LayoutEntry, LayoutManager};
use crate::manager::{ManagerCore, SceneContext, enable_changes};
use crate::representation::SceneRepresentation;
use crate::style::{DrawParams, Rgba};

/// A feature pinned to one local point and drawn in screen space.
pub(crate) trait Anchored {
    fn anchor(&self) -> DVec3;
    fn rotation(&self) -> f64;
}

/// How one anchored feature looks, as built by its manager.
pub(crate) struct ScreenObject {
    pub(crate) kind: DrawableKind,
    /// Layout box; only registered when the style asks for layout.
    pub(crate) entry: LayoutEntry,
}

/// Shared style knobs of anchored features.
#[derive(Copy, Clone, Debug)]
pub(crate) struct AnchoredStyle<'a> {
    pub(crate) draw: &'a DrawParams,
    pub(crate) color: Rgba,
    pub(crate) laid_out: bool,
}

/// Representation table of one anchored-feature manager.
///
/// The record's extra flag says whether the representation's drawables are
/// under layout control.
#[derive(Debug)]
pub(crate) struct AnchoredCore {
    core: ManagerCore<bool>,
    layout: Arc<LayoutManager>,
}

impl AnchoredCore {
    pub(crate) fn new(name: &'static str, context: SceneContext, layout: Arc<LayoutManager>) -> Self {
        Self {
            core: ManagerCore::new(name, context),
            layout,
        }
    }

    pub(crate) fn core(&self) -> &ManagerCore<bool> {
        &self.core
    }

    /// Add one representation holding a drawable per feature.
    ///
    /// Laid-out drawables are added disabled and registered with layout,
    /// which enables the ones it places. Nothing is added if any feature has
    /// a non-finite anchor or rotation.
    pub(crate) fn add<T: Anchored>(
        &self,
        features: &[T],
        style: AnchoredStyle<'_>,
        mut build: impl FnMut(&T, Identity) -> ScreenObject,
    ) -> Result<Identity, SceneError> {
        for (index, f) in features.iter().enumerate() {
            if !f.anchor().is_finite() || !f.rotation().is_finite() {
                return Err(SceneError::InvalidFeature {
                    index,
                    reason: "non-finite position",
                });
            }
        }
        let draw = style.draw;
        let registry = &self.core.context().registry;
        let id = registry.allocate();
        let drawables = registry.allocate_many(features.len());

        let mut rep = SceneRepresentation::new(id);
        rep.fade = draw.fade;
        rep.enabled = draw.enable;
        let mut changes = ChangeSet::new();
        let mut entries = Vec::new();
        for (f, &d) in features.iter().zip(&drawables) {
            let a = f.anchor();
            let point = Mbr::new(a.x, a.y, a.x, a.y);
            let ScreenObject { kind, entry } = build(f, d);
            let mut drawable = Drawable::new(d, kind, point);
            drawable.color = style.color;
            drawable.draw_priority = draw.draw_priority;
            drawable.visible_range = (draw.min_visible, draw.max_visible);
            drawable.fade = draw.fade;
            drawable.enabled = draw.enable && !style.laid_out;
            changes.push(ChangeRequest::AddDrawable(drawable));
            rep.drawables.insert(d);
            if draw.selectable {
                let s = registry.allocate();
                changes.push(ChangeRequest::AddSelectable { id: s, bounds: point });
                if !draw.enable {
                    changes.push(ChangeRequest::EnableSelectable(s, false));
                }
                rep.selectables.insert(s);
            }
            if style.laid_out {
                entries.push(entry);
            }
        }

        Ok(self.core.insert(rep, style.laid_out, changes, |_, &laid_out| {
            if laid_out {
                self.layout.add_entries(entries);
                if !draw.enable {
                    self.layout.set_enabled(&drawables, false);
                }
            }
        }))
    }

    /// Remove representations, unregistering laid-out drawables from layout.
    pub(crate) fn remove(&self, ids: &[Identity]) {
        self.core.remove(ids, |rep, &laid_out, _| {
            if laid_out {
                let drawables: Vec<Identity> = rep.drawables.iter().copied().collect();
                self.layout.remove_entries(&drawables);
            }
        });
    }

    /// Show or hide representations.
    ///
    /// For laid-out drawables enabling only makes them eligible again; the
    /// next layout pass shows them. Disabling hides whatever layout currently
    /// shows.
    pub(crate) fn enable(&self, ids: &[Identity], enabled: bool) {
        self.core.enable(ids, enabled, |rep, &laid_out, changes| {
            if !laid_out {
                enable_changes(rep, enabled, changes);
                return;
            }
            let drawables: Vec<Identity> = rep.drawables.iter().copied().collect();
            for d in self.layout.set_enabled(&drawables, enabled) {
                changes.push(ChangeRequest::EnableDrawable(d, false));
            }
            for &s in &rep.selectables {
                changes.push(ChangeRequest::EnableSelectable(s, enabled));
            }
        });
    }
}

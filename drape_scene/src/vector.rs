// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lines and polygons, culled through a [`CullTree`].

use std::collections::BTreeSet;
use std::sync::Arc;

use drape_index::{CullTree, CullTreeConfig, Mbr, TreeStats};
use drape_screen::{LocalToDisplay, ViewState, classify_mbr};
use kurbo::Point;
use parking_lot::Mutex;

use crate::change::{ChangeRequest, ChangeSet, Drawable, DrawableKind};
use crate::error::SceneError;
use crate::identity::Identity;
use crate::manager::{ManagerCore, SceneContext, SceneManager, enable_changes};
use crate::representation::SceneRepresentation;
use crate::style::{Style, VectorStyle};

/// One line string or polygon ring in local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorFeature {
    /// Vertices in order.
    pub points: Vec<Point>,
    /// Whether the last vertex connects back to the first.
    pub closed: bool,
}

impl VectorFeature {
    /// An open line string.
    pub fn line(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    /// A closed ring.
    pub fn polygon(points: Vec<Point>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    fn bounds(&self) -> Mbr<f64> {
        let mut mbr = Mbr::empty();
        for p in &self.points {
            mbr.add_point(p.x, p.y);
        }
        mbr
    }

    fn check(&self, index: usize) -> Result<(), SceneError> {
        let needed = if self.closed { 3 } else { 2 };
        if self.points.len() < needed {
            return Err(SceneError::InvalidFeature {
                index,
                reason: "too few points",
            });
        }
        if !self.points.iter().all(|p| p.is_finite()) {
            return Err(SceneError::InvalidFeature {
                index,
                reason: "non-finite coordinate",
            });
        }
        Ok(())
    }
}

/// Manager for vector features.
///
/// Every feature becomes one drawable. Drawables are indexed in a cull tree
/// owned by the manager, which answers visibility queries for a region or a
/// camera.
#[derive(Debug)]
pub struct VectorManager {
    core: ManagerCore<()>,
    tree: Mutex<CullTree<f64, Identity>>,
}

impl VectorManager {
    /// A manager indexing features within `root`.
    pub fn new(context: SceneContext, root: Mbr<f64>) -> Self {
        Self::with_config(context, root, CullTreeConfig::default())
    }

    /// A manager with explicit tree settings.
    pub fn with_config(context: SceneContext, root: Mbr<f64>, config: CullTreeConfig) -> Self {
        Self {
            core: ManagerCore::new("vector", context),
            tree: Mutex::new(CullTree::with_config(root, config)),
        }
    }

    /// Add features drawn with `style`; returns the representation identity.
    ///
    /// Nothing is added if any feature is invalid.
    pub fn add(&self, features: &[VectorFeature], style: &VectorStyle) -> Result<Identity, SceneError> {
        style.validate()?;
        for (i, f) in features.iter().enumerate() {
            f.check(i)?;
        }
        let registry = &self.core.context().registry;
        let id = registry.allocate();
        let drawables = registry.allocate_many(features.len());

        let mut rep = SceneRepresentation::new(id);
        rep.fade = style.draw.fade;
        rep.enabled = style.draw.enable;
        let mut changes = ChangeSet::new();
        let mut indexed = Vec::with_capacity(features.len());
        for (feature, &d) in features.iter().zip(&drawables) {
            let bounds = feature.bounds();
            let mut drawable = Drawable::new(
                d,
                DrawableKind::Vector {
                    line_width: style.line_width,
                    filled: style.filled && feature.closed,
                },
                bounds,
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
                changes.push(ChangeRequest::AddSelectable { id: s, bounds });
                if !style.draw.enable {
                    changes.push(ChangeRequest::EnableSelectable(s, false));
                }
                rep.selectables.insert(s);
            }
            indexed.push((d, bounds));
        }

        Ok(self.core.insert(rep, (), changes, |_, ()| {
            let mut tree = self.tree.lock();
            for (d, bounds) in indexed {
                if !tree.insert(bounds, d) {
                    log::debug!("vector: {d} has empty bounds and is never culled in");
                }
            }
        }))
    }

    /// [`add`](Self::add) with the style given as a JSON value.
    pub fn add_json(
        &self,
        features: &[VectorFeature],
        style: &serde_json::Value,
    ) -> Result<Identity, SceneError> {
        let style = VectorStyle::from_value(style)?;
        self.add(features, &style)
    }

    /// Drawables whose bounds intersect `region`.
    pub fn visible_in(&self, region: &Mbr<f64>) -> BTreeSet<Identity> {
        self.tree.lock().query_rect(region)
    }

    /// Drawables in the view volume of `view`, with local coordinates mapped
    /// through `display` and extruded over `z_range`.
    pub fn visible_from<L: LocalToDisplay + ?Sized>(
        &self,
        view: &ViewState,
        display: &L,
        z_range: (f64, f64),
    ) -> BTreeSet<Identity> {
        self.tree
            .lock()
            .query_with(|mbr| classify_mbr(view, display, mbr, z_range))
    }

    /// Shape of the cull tree.
    pub fn tree_stats(&self) -> TreeStats {
        self.tree.lock().stats()
    }
}

impl SceneManager for VectorManager {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn remove(&self, ids: &[Identity]) {
        self.core.remove(ids, |rep, (), _| {
            let mut tree = self.tree.lock();
            for &d in &rep.drawables {
                tree.remove(d);
            }
        });
    }

    fn enable(&self, ids: &[Identity], enabled: bool) {
        self.core
            .enable(ids, enabled, |rep, (), changes| enable_changes(rep, enabled, changes));
    }

    fn representation(&self, id: Identity) -> Option<Arc<SceneRepresentation>> {
        self.core.get(id)
    }

    fn representation_count(&self) -> usize {
        self.core.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::SceneState;
    use drape_screen::FlatDisplay;
    use glam::{DMat4, DVec3};
    use kurbo::Size;

    fn manager() -> (SceneContext, VectorManager) {
        let context = SceneContext::new();
        let vm = VectorManager::new(context.clone(), Mbr::new(0.0, 0.0, 100.0, 100.0));
        (context, vm)
    }

    fn square(x: f64, y: f64) -> VectorFeature {
        VectorFeature::polygon(vec![
            Point::new(x, y),
            Point::new(x + 1.0, y),
            Point::new(x + 1.0, y + 1.0),
            Point::new(x, y + 1.0),
        ])
    }

    #[test]
    fn add_query_remove() {
        let (context, vm) = manager();
        let features: Vec<VectorFeature> = (0..20)
            .map(|i| square(f64::from(i % 5) * 20.0, f64::from(i / 5) * 20.0))
            .collect();
        let id = vm.add(&features, &VectorStyle::default()).unwrap();
        assert_eq!(vm.visible_in(&Mbr::new(0.0, 0.0, 100.0, 100.0)).len(), 20);
        assert_eq!(vm.visible_in(&Mbr::new(0.0, 0.0, 5.0, 5.0)).len(), 1);

        let mut scene = SceneState::new();
        context.queue.apply_pending(&mut scene);
        assert_eq!(scene.drawable_count(), 20);

        vm.remove(&[id]);
        assert!(vm.visible_in(&Mbr::new(0.0, 0.0, 100.0, 100.0)).is_empty());
        assert_eq!(vm.representation_count(), 0);
        context.queue.apply_pending(&mut scene);
        assert_eq!(scene.drawable_count(), 0);
        assert_eq!(scene.released(), 1);
    }

    #[test]
    fn invalid_features_add_nothing() {
        let (context, vm) = manager();
        let bad = [square(0.0, 0.0), VectorFeature::line(vec![Point::new(1.0, 1.0)])];
        assert!(matches!(
            vm.add(&bad, &VectorStyle::default()),
            Err(SceneError::InvalidFeature { index: 1, .. })
        ));
        let nan = [VectorFeature::line(vec![Point::ZERO, Point::new(f64::NAN, 0.0)])];
        assert!(vm.add(&nan, &VectorStyle::default()).is_err());
        assert!(context.queue.is_empty());
        assert_eq!(vm.representation_count(), 0);
    }

    #[test]
    fn json_styles_are_validated() {
        let (_, vm) = manager();
        let style = serde_json::json!({ "lineWidth": -2.0 });
        assert!(matches!(
            vm.add_json(&[square(1.0, 1.0)], &style),
            Err(SceneError::Style(_))
        ));
        let style = serde_json::json!({ "lineWidth": 2.0, "selectable": true, "filled": true });
        let id = vm.add_json(&[square(1.0, 1.0)], &style).unwrap();
        let rep = vm.representation(id).unwrap();
        assert_eq!(rep.drawables.len(), 1);
        assert_eq!(rep.selectables.len(), 1);
    }

    #[test]
    fn enable_toggles_drawables_and_selectables() {
        let (context, vm) = manager();
        let style = VectorStyle {
            draw: crate::DrawParams {
                selectable: true,
                ..crate::DrawParams::default()
            },
            ..VectorStyle::default()
        };
        let id = vm.add(&[square(1.0, 1.0)], &style).unwrap();
        vm.enable(&[id], false);
        let mut scene = SceneState::new();
        context.queue.apply_pending(&mut scene);
        let rep = vm.representation(id).unwrap();
        assert!(!rep.enabled);
        let d = *rep.drawables.first().unwrap();
        let s = *rep.selectables.first().unwrap();
        assert!(!scene.drawable(d).unwrap().enabled);
        assert_eq!(scene.selectable(s).map(|s| s.1), Some(false));
    }

    #[test]
    fn camera_culling() {
        let (_, vm) = manager();
        vm.add(&[square(10.0, 10.0), square(90.0, 90.0)], &VectorStyle::default())
            .unwrap();
        let view = ViewState::look_at_perspective(
            DVec3::new(10.5, 10.5, 10.0),
            DVec3::new(10.5, 10.5, 0.0),
            DVec3::Y,
            0.5,
            Size::new(100.0, 100.0),
            0.1,
            100.0,
        );
        let seen = vm.visible_from(&view, &FlatDisplay, (0.0, 0.0));
        assert_eq!(seen.len(), 1, "only the square under the camera: {seen:?}");
        assert_eq!(vm.tree_stats().drawables, 2);

        let everything = ViewState::new(
            DMat4::IDENTITY,
            DMat4::orthographic_rh(0.0, 100.0, 0.0, 100.0, -1.0, 1.0),
            Size::new(100.0, 100.0),
        );
        assert_eq!(vm.visible_from(&everything, &FlatDisplay, (0.0, 0.0)).len(), 2);
    }

    #[test]
    fn globe_culling_keeps_drawables_between_node_corners() {
        use core::f64::consts::{FRAC_PI_2, PI};
        use drape_screen::GlobeDisplay;

        let context = SceneContext::new();
        let vm = VectorManager::new(context, Mbr::new(-PI, -FRAC_PI_2, PI, FRAC_PI_2));
        let patch = |lon: f64, lat: f64| {
            VectorFeature::polygon(vec![
                Point::new(lon, lat),
                Point::new(lon + 0.02, lat),
                Point::new(lon + 0.02, lat + 0.02),
                Point::new(lon, lat + 0.02),
            ])
        };
        let fillers: Vec<VectorFeature> = (0..8)
            .map(|i| patch(f64::from(i) * 0.75 - 2.9, f64::from(i % 3) * 0.5 - 0.5))
            .collect();
        vm.add(&fillers, &VectorStyle::default()).unwrap();
        let first = |id| *vm.representation(id).unwrap().drawables.first().unwrap();
        let target = first(vm.add(&[patch(-FRAC_PI_2, -0.1)], &VectorStyle::default()).unwrap());
        let aside = first(vm.add(&[patch(0.0, 0.0)], &VectorStyle::default()).unwrap());

        let globe = GlobeDisplay::default();
        let surface = globe.local_to_display(DVec3::new(-FRAC_PI_2 + 0.01, -0.09, 0.0));
        let view = ViewState::look_at_perspective(
            surface * 1.5,
            surface,
            DVec3::Z,
            0.6,
            Size::new(256.0, 256.0),
            0.01,
            10.0,
        );
        let seen = vm.visible_from(&view, &globe, (0.0, 0.0));
        assert!(seen.contains(&target), "the patch under the camera is culled: {seen:?}");
        assert!(!seen.contains(&aside), "a patch a quarter turn away is kept");
    }
}

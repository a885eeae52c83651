// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Screen-space text labels.
//!
//! Glyphs are rendered elsewhere; for layout a label is a box whose width is
//! estimated from its character count.

use std::sync::Arc;

use drape_layout::Category;
use glam::DVec3;
use kurbo::{Size, Vec2};

use crate::anchored::{Anchored, AnchoredCore, AnchoredStyle, ScreenObject};
use crate::change::DrawableKind;
use crate::error::SceneError;
use crate::identity::Identity;
use crate::layout_manager::{LayoutEntry, LayoutManager};
use crate::manager::{SceneContext, SceneManager};
use crate::representation::SceneRepresentation;
use crate::style::{LabelStyle, Style};

/// One label.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    /// The text.
    pub text: String,
    /// Anchor in local coordinates.
    pub position: DVec3,
    /// Screen rotation, radians.
    pub rotation: f64,
}

impl Label {
    /// An unrotated label.
    pub fn new(text: impl Into<String>, position: DVec3) -> Self {
        Self {
            text: text.into(),
            position,
            rotation: 0.0,
        }
    }
}

impl Anchored for Label {
    fn anchor(&self) -> DVec3 {
        self.position
    }

    fn rotation(&self) -> f64 {
        self.rotation
    }
}

/// Estimated pixel size of `text` set in `style`.
pub fn text_extent(text: &str, style: &LabelStyle) -> Size {
    let chars = text.chars().count() as f64;
    Size::new(chars * style.font_size * style.glyph_aspect, style.font_size)
}

/// Manager for labels. Works like the marker manager, with text-sized boxes.
#[derive(Debug)]
pub struct LabelManager {
    objects: AnchoredCore,
}

impl LabelManager {
    /// A manager registering laid-out labels with `layout`.
    pub fn new(context: SceneContext, layout: Arc<LayoutManager>) -> Self {
        Self {
            objects: AnchoredCore::new("label", context, layout),
        }
    }

    /// Add labels set in `style`; returns the representation identity.
    pub fn add(&self, labels: &[Label], style: &LabelStyle) -> Result<Identity, SceneError> {
        style.validate()?;
        let shared = AnchoredStyle {
            draw: &style.draw,
            color: style.text_color,
            laid_out: style.layout,
        };
        self.objects.add(labels, shared, |l, d| ScreenObject {
            kind: DrawableKind::Label {
                text: l.text.clone(),
                font_size: style.font_size,
            },
            entry: LayoutEntry {
                offset: Vec2::new(style.offset[0], style.offset[1]),
                rotation: l.rotation,
                importance: style.layout_importance,
                category: Category::LABEL,
                cluster_group: style.cluster_group,
                ..LayoutEntry::new(d, l.position, text_extent(&l.text, style))
            },
        })
    }

    /// [`add`](Self::add) with the style given as a JSON value.
    pub fn add_json(
        &self,
        labels: &[Label],
        style: &serde_json::Value,
    ) -> Result<Identity, SceneError> {
        let style = LabelStyle::from_value(style)?;
        self.add(labels, &style)
    }
}

impl SceneManager for LabelManager {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::SceneState;
    use drape_layout::{AnyCategory, Decision, LayoutConfig, SameCategory};
    use drape_screen::{FlatDisplay, ViewState};
    use glam::DMat4;

    fn pixel_view() -> ViewState {
        ViewState::new(
            DMat4::IDENTITY,
            DMat4::orthographic_rh(0.0, 200.0, 100.0, 0.0, -1.0, 1.0),
            Size::new(200.0, 100.0),
        )
    }

    #[test]
    fn extent_follows_character_count() {
        let style = LabelStyle {
            font_size: 10.0,
            glyph_aspect: 0.5,
            ..LabelStyle::default()
        };
        assert_eq!(text_extent("abcd", &style), Size::new(20.0, 10.0));
        assert_eq!(text_extent("åäö", &style), Size::new(15.0, 10.0), "chars, not bytes");
        assert_eq!(text_extent("", &style).width, 0.0);
    }

    #[test]
    fn long_labels_collide_where_short_ones_fit() {
        let context = SceneContext::new();
        let layout = Arc::new(LayoutManager::new(
            context.clone(),
            LayoutConfig::default(),
            AnyCategory,
        ));
        let lm = LabelManager::new(context.clone(), Arc::clone(&layout));
        let style = LabelStyle {
            font_size: 10.0,
            glyph_aspect: 0.5,
            ..LabelStyle::default()
        };
        // Anchors 30 px apart: 5-char boxes (25 px) fit, 10-char boxes (50 px) do not.
        lm.add(
            &[
                Label::new("short", DVec3::new(50.0, 50.0, 0.0)),
                Label::new("short", DVec3::new(80.0, 50.0, 0.0)),
            ],
            &style,
        )
        .unwrap();
        let long = lm
            .add(
                &[
                    Label::new("a long one", DVec3::new(50.0, 80.0, 0.0)),
                    Label::new("a long one", DVec3::new(80.0, 80.0, 0.0)),
                ],
                &style,
            )
            .unwrap();
        layout.run(&pixel_view(), &FlatDisplay);
        let mut scene = SceneState::new();
        context.queue.apply_pending(&mut scene);
        assert_eq!(scene.enabled_drawables().count(), 3);

        let rep = lm.representation(long).unwrap();
        let shown = rep.drawables.iter().filter(|d| layout.is_shown(**d)).count();
        assert_eq!(shown, 1);
    }

    #[test]
    fn category_policy_keeps_labels_apart_from_markers() {
        let context = SceneContext::new();
        let layout = Arc::new(LayoutManager::new(
            context.clone(),
            LayoutConfig::default(),
            SameCategory,
        ));
        let lm = LabelManager::new(context.clone(), Arc::clone(&layout));
        let mm = crate::MarkerManager::new(context.clone(), Arc::clone(&layout));
        let group = Some(1);
        lm.add(
            &[Label::new("label", DVec3::new(50.0, 50.0, 0.0))],
            &LabelStyle {
                cluster_group: group,
                layout_importance: 2.0,
                ..LabelStyle::default()
            },
        )
        .unwrap();
        mm.add(
            &[crate::Marker::at(DVec3::new(52.0, 50.0, 0.0))],
            &crate::MarkerStyle {
                cluster_group: group,
                ..crate::MarkerStyle::default()
            },
        )
        .unwrap();
        let frame = layout.compute(&pixel_view(), &FlatDisplay);
        let result = frame.result();
        assert_eq!(result.visible_count(), 1);
        let (_, label) = &result.decisions[0];
        assert!(matches!(label, Decision::Visible(_)), "the label keeps its place");
        assert_eq!(result.hidden_count(), 1, "a marker of its own would cover the label");
        assert!(result.clusters.is_empty());
    }
}

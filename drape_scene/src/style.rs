// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed per-feature styles, parsed once at the boundary.
//!
//! Style sheets arrive as JSON objects with camelCase keys. Each feature type
//! has its own struct; missing keys take the struct's defaults, and every
//! parsed style is validated before a manager sees it.
//!
//! ```rust
//! use drape_scene::{MarkerStyle, Style};
//!
//! let style = MarkerStyle::from_json(r##"{ "color": "#ff8800", "width": 24, "clusterGroup": 1 }"##)
//!     .unwrap();
//! assert_eq!(style.cluster_group, Some(1));
//! assert!(MarkerStyle::from_json(r#"{ "minVisible": 5, "maxVisible": 1 }"#).is_err());
//! ```

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::StyleError;

/// 8-bit RGBA color, written as `#rrggbb` or `#rrggbbaa` in style sheets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// Opaque white.
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    /// Opaque black.
    pub const BLACK: Self = Self([0, 0, 0, 255]);

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn parse(text: &str) -> Result<Self, StyleError> {
        let bad = || StyleError::Color(text.to_owned());
        let hex = text.strip_prefix('#').ok_or_else(bad)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(bad());
        }
        let mut out = [255_u8; 4];
        for (i, slot) in out.iter_mut().take(hex.len() / 2).enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| bad())?;
        }
        Ok(Self(out))
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let [r, g, b, a] = self.0;
        serializer.serialize_str(&format!("#{r:02x}{g:02x}{b:02x}{a:02x}"))
    }
}

/// Parameters every drawable shares.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DrawParams {
    /// Sort key for drawing; higher draws later.
    pub draw_priority: i32,
    /// Nearest viewer distance at which the feature shows.
    pub min_visible: f64,
    /// Farthest viewer distance at which the feature shows.
    pub max_visible: f64,
    /// Fade-in time in seconds, `0..=1`.
    pub fade: f32,
    /// Initial enable state.
    pub enable: bool,
    /// Whether features register for selection.
    pub selectable: bool,
}

impl Default for DrawParams {
    fn default() -> Self {
        Self {
            draw_priority: 0,
            min_visible: 0.0,
            max_visible: f64::MAX,
            fade: 0.0,
            enable: true,
            selectable: false,
        }
    }
}

impl DrawParams {
    fn validate(&self) -> Result<(), StyleError> {
        non_negative("minVisible", self.min_visible)?;
        if self.min_visible > self.max_visible {
            return Err(StyleError::InvertedRange {
                min: self.min_visible,
                max: self.max_visible,
            });
        }
        if !(0.0..=1.0).contains(&self.fade) {
            return Err(StyleError::Fade(self.fade));
        }
        Ok(())
    }
}

/// Line and polygon features.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VectorStyle {
    /// Shared drawable parameters.
    #[serde(flatten)]
    pub draw: DrawParams,
    /// Stroke or fill color.
    pub color: Rgba,
    /// Line width in pixels.
    pub line_width: f32,
    /// Fill closed polygons instead of outlining them.
    pub filled: bool,
}

/// Screen-space point markers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerStyle {
    /// Shared drawable parameters.
    #[serde(flatten)]
    pub draw: DrawParams,
    /// Tint color.
    pub color: Rgba,
    /// Marker width in pixels.
    pub width: f64,
    /// Marker height in pixels.
    pub height: f64,
    /// Take part in overlap layout.
    pub layout: bool,
    /// Layout priority; higher claims space first.
    pub layout_importance: f64,
    /// Markers in the same group may cluster.
    pub cluster_group: Option<u32>,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            draw: DrawParams::default(),
            color: Rgba::WHITE,
            width: 32.0,
            height: 32.0,
            layout: true,
            layout_importance: 1.0,
            cluster_group: None,
        }
    }
}

/// Screen-space text labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelStyle {
    /// Shared drawable parameters.
    #[serde(flatten)]
    pub draw: DrawParams,
    /// Text color.
    pub text_color: Rgba,
    /// Nominal font size in pixels.
    pub font_size: f64,
    /// Average glyph advance as a fraction of the font size.
    pub glyph_aspect: f64,
    /// Pixel offset of the label box from its anchor.
    pub offset: [f64; 2],
    /// Take part in overlap layout.
    pub layout: bool,
    /// Layout priority; higher claims space first.
    pub layout_importance: f64,
    /// Labels in the same group may cluster.
    pub cluster_group: Option<u32>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            draw: DrawParams::default(),
            text_color: Rgba::BLACK,
            font_size: 16.0,
            glyph_aspect: 0.6,
            offset: [0.0, 0.0],
            layout: true,
            layout_importance: 1.0,
            cluster_group: None,
        }
    }
}

/// Circles, rectangles and spheres.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShapeStyle {
    /// Shared drawable parameters.
    #[serde(flatten)]
    pub draw: DrawParams,
    /// Fill color.
    pub color: Rgba,
    /// Tessellation steps around curved shapes.
    pub sample_count: u32,
}

/// A style that can be read from a JSON style sheet.
pub trait Style: DeserializeOwned {
    /// Check ranges the type system cannot express.
    fn validate(&self) -> Result<(), StyleError>;

    /// Shared drawable parameters.
    fn draw(&self) -> &DrawParams;

    /// Parse and validate a JSON value.
    fn from_value(value: &serde_json::Value) -> Result<Self, StyleError> {
        let style = Self::deserialize(value)?;
        style.validate()?;
        Ok(style)
    }

    /// Parse and validate JSON text.
    fn from_json(text: &str) -> Result<Self, StyleError> {
        let style: Self = serde_json::from_str(text)?;
        style.validate()?;
        Ok(style)
    }
}

impl Style for VectorStyle {
    fn validate(&self) -> Result<(), StyleError> {
        self.draw.validate()?;
        non_negative("lineWidth", f64::from(self.line_width))
    }

    fn draw(&self) -> &DrawParams {
        &self.draw
    }
}

impl Style for MarkerStyle {
    fn validate(&self) -> Result<(), StyleError> {
        self.draw.validate()?;
        non_negative("width", self.width)?;
        non_negative("height", self.height)?;
        non_negative("layoutImportance", self.layout_importance)
    }

    fn draw(&self) -> &DrawParams {
        &self.draw
    }
}

impl Style for LabelStyle {
    fn validate(&self) -> Result<(), StyleError> {
        self.draw.validate()?;
        non_negative("fontSize", self.font_size)?;
        non_negative("glyphAspect", self.glyph_aspect)?;
        non_negative("layoutImportance", self.layout_importance)
    }

    fn draw(&self) -> &DrawParams {
        &self.draw
    }
}

impl Style for ShapeStyle {
    fn validate(&self) -> Result<(), StyleError> {
        self.draw.validate()
    }

    fn draw(&self) -> &DrawParams {
        &self.draw
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), StyleError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StyleError::Negative { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn colors_parse_with_and_without_alpha() {
        assert_eq!(Rgba::parse("#102030").unwrap(), Rgba([0x10, 0x20, 0x30, 0xff]));
        assert_eq!(Rgba::parse("#10203040").unwrap(), Rgba([0x10, 0x20, 0x30, 0x40]));
        assert!(matches!(Rgba::parse("102030"), Err(StyleError::Color(_))));
        assert!(Rgba::parse("#12345").is_err());
        assert!(Rgba::parse("#gg0000").is_err());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let style = LabelStyle::from_value(&json!({ "fontSize": 20 })).unwrap();
        assert_eq!(style.font_size, 20.0);
        assert_eq!(style.text_color, Rgba::BLACK);
        assert!(style.layout);
        assert!(style.draw.enable);
    }

    #[test]
    fn shared_params_are_flattened() {
        let style = VectorStyle::from_value(&json!({
            "color": "#00ff00",
            "lineWidth": 3.5,
            "drawPriority": 7,
            "minVisible": 0.5,
            "maxVisible": 2.0,
            "selectable": true,
        }))
        .unwrap();
        assert_eq!(style.draw.draw_priority, 7);
        assert!(style.draw.selectable);
        assert_eq!(style.color, Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(matches!(
            MarkerStyle::from_value(&json!({ "minVisible": 3.0, "maxVisible": 1.0 })),
            Err(StyleError::InvertedRange { .. })
        ));
        assert!(matches!(
            MarkerStyle::from_value(&json!({ "width": -1.0 })),
            Err(StyleError::Negative { field: "width", .. })
        ));
        assert!(matches!(
            ShapeStyle::from_value(&json!({ "fade": 2.0 })),
            Err(StyleError::Fade(_))
        ));
        assert!(matches!(
            VectorStyle::from_json("{ \"color\": 12 }"),
            Err(StyleError::Json(_))
        ));
        assert!(matches!(
            VectorStyle::from_json("{ \"color\": \"red\" }"),
            Err(StyleError::Json(_))
        ));
    }

    #[test]
    fn colors_serialize_back_to_hex() {
        let text = serde_json::to_string(&Rgba([1, 2, 3, 4])).unwrap();
        assert_eq!(text, "\"#01020304\"");
    }
}

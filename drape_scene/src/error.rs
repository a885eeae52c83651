// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised at the configuration boundary.

/// A style failed to parse or validate.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    /// The JSON did not match the style's shape.
    #[error("malformed style: {0}")]
    Json(#[from] serde_json::Error),
    /// `min_visible` is above `max_visible`.
    #[error("visible range is inverted: min {min} > max {max}")]
    InvertedRange {
        /// Lower bound as given.
        min: f64,
        /// Upper bound as given.
        max: f64,
    },
    /// A size, width or importance was negative or not finite.
    #[error("`{field}` must be a non-negative number, got {value}")]
    Negative {
        /// Style field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Fade outside `0..=1`.
    #[error("fade must be within 0..=1, got {0}")]
    Fade(f32),
    /// A color string that is not `#rrggbb` or `#rrggbbaa`.
    #[error("invalid color `{0}`")]
    Color(String),
}

/// Errors returned by scene managers.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The style was rejected.
    #[error(transparent)]
    Style(#[from] StyleError),
    /// A feature had non-finite coordinates or too few points.
    #[error("feature {index} is invalid: {reason}")]
    InvalidFeature {
        /// Position of the feature in the input batch.
        index: usize,
        /// What was wrong with it.
        reason: &'static str,
    },
}

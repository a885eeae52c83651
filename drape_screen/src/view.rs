// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Camera state and frustum planes.

use drape_index::Containment;
use glam::{DMat4, DVec3, DVec4, Vec4Swizzles};
use kurbo::{Point, Rect, Size};

use crate::aabb3::Aabb3;

/// One frame's camera: matrices, eye, viewport and a staleness counter.
///
/// Projection matrices follow the `[0, 1]` clip depth convention of
/// [`DMat4::perspective_rh`] and [`DMat4::orthographic_rh`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewState {
    /// World to eye.
    pub view: DMat4,
    /// Eye to clip.
    pub projection: DMat4,
    /// Eye position in world space.
    pub eye: DVec3,
    /// Viewport size in pixels.
    pub viewport: Size,
    /// Monotonic counter bumped whenever the view changes meaningfully.
    pub generation: u64,
}

impl ViewState {
    /// A view from explicit matrices. The eye is recovered from `view`.
    pub fn new(view: DMat4, projection: DMat4, viewport: Size) -> Self {
        let eye = view.inverse().w_axis.xyz();
        Self {
            view,
            projection,
            eye,
            viewport,
            generation: 0,
        }
    }

    /// A right-handed perspective camera looking from `eye` at `target`.
    ///
    /// `fov_y` is the vertical field of view in radians.
    pub fn look_at_perspective(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y: f64,
        viewport: Size,
        near: f64,
        far: f64,
    ) -> Self {
        let aspect = if viewport.height > 0.0 {
            viewport.width / viewport.height
        } else {
            1.0
        };
        let view = DMat4::look_at_rh(eye, target, up);
        let projection = DMat4::perspective_rh(fov_y, aspect, near, far);
        Self {
            view,
            projection,
            eye,
            viewport,
            generation: 0,
        }
    }

    /// Same view, tagged with `generation`.
    #[must_use]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Combined world-to-clip matrix.
    pub fn view_projection(&self) -> DMat4 {
        self.projection * self.view
    }

    /// The viewport as a rectangle with its origin at the top left.
    pub fn viewport_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO, self.viewport)
    }

    /// Viewport area in square pixels; the largest importance a volume can have.
    pub fn viewport_area(&self) -> f64 {
        self.viewport.width * self.viewport.height
    }

    /// World point to homogeneous clip coordinates.
    pub fn to_clip(&self, p: DVec3) -> DVec4 {
        self.view_projection() * p.extend(1.0)
    }

    /// Clip coordinates to screen pixels, y down. `clip.w` must be positive.
    pub fn clip_to_screen(&self, clip: DVec4) -> Point {
        let ndc = clip.xyz() / clip.w;
        Point::new(
            (ndc.x * 0.5 + 0.5) * self.viewport.width,
            (0.5 - ndc.y * 0.5) * self.viewport.height,
        )
    }

    /// World point to screen pixels.
    ///
    /// `None` if the point is behind the eye or outside the view volume.
    pub fn project_point(&self, p: DVec3) -> Option<Point> {
        let clip = self.to_clip(p);
        if clip.w <= 0.0 || !Frustum::CLIP_PLANES.iter().all(|plane| plane.dot(clip) >= 0.0) {
            return None;
        }
        Some(self.clip_to_screen(clip))
    }

    /// World-space frustum planes for this view.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }
}

/// Six inward-facing planes: left, right, bottom, top, near, far.
///
/// A point `p` is inside when `plane.dot(p.extend(1.0)) >= 0` for every plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frustum {
    /// Planes as `(normal, distance)`.
    pub planes: [DVec4; 6],
}

impl Frustum {
    /// The same six planes in clip space, for `[0, 1]` depth.
    pub const CLIP_PLANES: [DVec4; 6] = [
        DVec4::new(1.0, 0.0, 0.0, 1.0),
        DVec4::new(-1.0, 0.0, 0.0, 1.0),
        DVec4::new(0.0, 1.0, 0.0, 1.0),
        DVec4::new(0.0, -1.0, 0.0, 1.0),
        DVec4::new(0.0, 0.0, 1.0, 0.0),
        DVec4::new(0.0, 0.0, -1.0, 1.0),
    ];

    /// Extract the planes from a world-to-clip matrix (Gribb and Hartmann).
    pub fn from_view_projection(m: &DMat4) -> Self {
        let planes = Self::CLIP_PLANES.map(|c| {
            // Transposed multiply: combine matrix rows by the clip-space plane.
            let p = m.transpose() * c;
            let len = p.xyz().length();
            if len > 0.0 { p / len } else { p }
        });
        Self { planes }
    }

    /// Whether `p` is inside or on every plane.
    pub fn contains(&self, p: DVec3) -> bool {
        let h = p.extend(1.0);
        self.planes.iter().all(|plane| plane.dot(h) >= 0.0)
    }

    /// Three-way box classification using the positive and negative vertices.
    ///
    /// Conservative: boxes near frustum corners may be reported `Partial`
    /// while lying outside, but never `Outside` while visible.
    pub fn classify(&self, b: &Aabb3) -> Containment {
        if b.is_empty() {
            return Containment::Outside;
        }
        let mut inside = true;
        for plane in &self.planes {
            let n = plane.xyz();
            let positive = DVec3::select(n.cmpge(DVec3::ZERO), b.max, b.min);
            if n.dot(positive) + plane.w < 0.0 {
                return Containment::Outside;
            }
            let negative = DVec3::select(n.cmpge(DVec3::ZERO), b.min, b.max);
            if n.dot(negative) + plane.w < 0.0 {
                inside = false;
            }
        }
        if inside {
            Containment::Inside
        } else {
            Containment::Partial
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> ViewState {
        ViewState::look_at_perspective(
            DVec3::new(0.0, 0.0, 10.0),
            DVec3::ZERO,
            DVec3::Y,
            core::f64::consts::FRAC_PI_2,
            Size::new(800.0, 600.0),
            0.1,
            100.0,
        )
    }

    #[test]
    fn target_projects_to_viewport_center() {
        let view = camera();
        let p = view.project_point(DVec3::ZERO).unwrap();
        assert!((p.x - 400.0).abs() < 1e-9, "x = {}", p.x);
        assert!((p.y - 300.0).abs() < 1e-9, "y = {}", p.y);
        let up = view.project_point(DVec3::new(0.0, 1.0, 0.0)).unwrap();
        assert!(up.y < 300.0, "screen y grows downward");
    }

    #[test]
    fn points_behind_the_eye_do_not_project() {
        let view = camera();
        assert!(view.project_point(DVec3::new(0.0, 0.0, 20.0)).is_none());
        assert!(view.project_point(DVec3::new(1000.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn eye_is_recovered_from_the_view_matrix() {
        let view = camera();
        let rebuilt = ViewState::new(view.view, view.projection, view.viewport);
        assert!((rebuilt.eye - view.eye).length() < 1e-9, "eye = {:?}", rebuilt.eye);
    }

    #[test]
    fn frustum_classifies_boxes() {
        let f = camera().frustum();
        assert!(f.contains(DVec3::ZERO));
        assert!(!f.contains(DVec3::new(0.0, 0.0, 11.0)));
        let small = Aabb3::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        let behind = Aabb3::new(DVec3::new(-1.0, -1.0, 20.0), DVec3::new(1.0, 1.0, 30.0));
        let straddle = Aabb3::new(DVec3::new(-1.0, -1.0, 5.0), DVec3::new(1.0, 1.0, 15.0));
        assert_eq!(f.classify(&small), Containment::Inside);
        assert_eq!(f.classify(&behind), Containment::Outside);
        assert_eq!(f.classify(&straddle), Containment::Partial);
        assert_eq!(f.classify(&Aabb3::empty()), Containment::Outside);
    }
}

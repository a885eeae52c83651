// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Polygon clipping in homogeneous clip space.
//!
//! Clipping happens before the perspective divide, so vertices behind the eye
//! (negative `w`) are cut away instead of wrapping around to the far side of
//! the screen.

use glam::DVec4;

use crate::view::Frustum;

/// Clip a planar polygon against all six clip-space planes.
///
/// Returns an empty vector when nothing survives or fewer than three vertices
/// remain.
pub fn clip_polygon(polygon: &[DVec4]) -> Vec<DVec4> {
    let mut current = polygon.to_vec();
    for plane in &Frustum::CLIP_PLANES {
        if current.len() < 3 {
            return Vec::new();
        }
        current = clip_against(&current, *plane);
    }
    if current.len() < 3 {
        current.clear();
    }
    current
}

/// One Sutherland-Hodgman step: keep the part of `polygon` where
/// `plane.dot(v) >= 0`.
pub fn clip_against(polygon: &[DVec4], plane: DVec4) -> Vec<DVec4> {
    let mut out = Vec::with_capacity(polygon.len() + 2);
    let Some(&last) = polygon.last() else {
        return out;
    };
    let mut prev = last;
    let mut prev_d = plane.dot(prev);
    for &v in polygon {
        let d = plane.dot(v);
        if d >= 0.0 {
            if prev_d < 0.0 {
                out.push(intersect(prev, prev_d, v, d));
            }
            out.push(v);
        } else if prev_d >= 0.0 {
            out.push(intersect(prev, prev_d, v, d));
        }
        prev = v;
        prev_d = d;
    }
    out
}

fn intersect(a: DVec4, da: f64, b: DVec4, db: f64) -> DVec4 {
    let t = da / (da - db);
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(z: f64, w: f64) -> Vec<DVec4> {
        vec![
            DVec4::new(-0.5, -0.5, z, w),
            DVec4::new(0.5, -0.5, z, w),
            DVec4::new(0.5, 0.5, z, w),
            DVec4::new(-0.5, 0.5, z, w),
        ]
    }

    #[test]
    fn fully_inside_polygon_is_unchanged() {
        let q = quad(0.5, 1.0);
        assert_eq!(clip_polygon(&q), q);
    }

    #[test]
    fn polygon_behind_near_plane_vanishes() {
        assert!(clip_polygon(&quad(-0.5, 1.0)).is_empty());
    }

    #[test]
    fn straddling_polygon_is_cut_at_the_plane() {
        let tri = [
            DVec4::new(0.0, 0.0, -1.0, 1.0),
            DVec4::new(0.0, 0.0, 1.0, 1.0),
            DVec4::new(0.5, 0.0, 1.0, 1.0),
        ];
        let near = DVec4::new(0.0, 0.0, 1.0, 0.0);
        let out = clip_against(&tri, near);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| v.z >= 0.0), "all vertices on the near side");
        assert!(out.iter().any(|v| v.z == 0.0), "new vertices lie on the plane");
    }

    #[test]
    fn wide_polygon_is_clamped_to_the_side_planes() {
        let big = vec![
            DVec4::new(-4.0, -4.0, 0.5, 1.0),
            DVec4::new(4.0, -4.0, 0.5, 1.0),
            DVec4::new(4.0, 4.0, 0.5, 1.0),
            DVec4::new(-4.0, 4.0, 0.5, 1.0),
        ];
        let out = clip_polygon(&big);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| v.x.abs() <= 1.0 && v.y.abs() <= 1.0), "clamped: {out:?}");
    }
}

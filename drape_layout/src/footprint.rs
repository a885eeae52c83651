// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Screen footprints and the polygon helpers layout needs.
//!
//! Footprints are small convex polygons (a rotated label box, the hull of a
//! projected volume). Overlap tests use the separating axis theorem, so a
//! concave input is treated as its convex hull would be.

use alloc::vec::Vec;
use kurbo::{Point, Rect, Size, Vec2};

/// Where a candidate lands on screen this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Footprint {
    /// Polygon vertices in screen pixels.
    pub points: Vec<Point>,
    /// Anchor point, used for cluster membership and as the visible position.
    pub center: Point,
    /// On-screen significance; higher claims screen space first. Never negative.
    pub importance: f64,
}

impl Footprint {
    /// A footprint from an explicit polygon.
    pub fn new(points: Vec<Point>, center: Point, importance: f64) -> Self {
        Self {
            points,
            center,
            importance: importance.max(0.0),
        }
    }

    /// An axis-aligned box of `size` whose center sits at `center + offset`.
    pub fn rect(center: Point, size: Size, offset: Vec2, importance: f64) -> Self {
        let c = center + offset;
        let r = Rect::from_center_size(c, size);
        Self::new(rect_points(r), center, importance)
    }

    /// A box of `size` rotated by `rotation` radians about `center`.
    ///
    /// `cos_sin` is `(rotation.cos(), rotation.sin())`, taken as input so the
    /// crate stays usable without a float math library.
    pub fn rotated_rect(center: Point, size: Size, cos_sin: (f64, f64), importance: f64) -> Self {
        let (c, s) = cos_sin;
        let hw = size.width * 0.5;
        let hh = size.height * 0.5;
        let points = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
            .into_iter()
            .map(|(x, y)| Point::new(center.x + x * c - y * s, center.y + x * s + y * c))
            .collect();
        Self::new(points, center, importance)
    }

    /// Axis-aligned bounds of the polygon; `None` without vertices.
    pub fn bounds(&self) -> Option<Rect> {
        polygon_bounds(&self.points)
    }

    /// Polygon area in square pixels.
    pub fn area(&self) -> f64 {
        polygon_area(&self.points)
    }

    /// Whether the two footprints share interior area.
    pub fn overlaps(&self, other: &Self) -> bool {
        polygons_overlap(&self.points, &other.points)
    }
}

/// The four corners of `r`, counter-clockwise in a y-up frame.
pub fn rect_points(r: Rect) -> Vec<Point> {
    alloc::vec![
        Point::new(r.x0, r.y0),
        Point::new(r.x1, r.y0),
        Point::new(r.x1, r.y1),
        Point::new(r.x0, r.y1),
    ]
}

/// Axis-aligned bounds of a point set; `None` if it is empty.
pub fn polygon_bounds(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    let mut r = Rect::from_points(*first, *first);
    for p in rest {
        r.x0 = r.x0.min(p.x);
        r.y0 = r.y0.min(p.y);
        r.x1 = r.x1.max(p.x);
        r.y1 = r.y1.max(p.y);
    }
    Some(r)
}

/// Unsigned shoelace area. Fewer than three vertices have no area.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    abs(twice) * 0.5
}

/// Strict overlap test for two convex polygons.
///
/// Polygons that only touch along an edge or at a corner do not overlap.
/// Empty inputs never overlap anything.
pub fn polygons_overlap(a: &[Point], b: &[Point]) -> bool {
    let (Some(ra), Some(rb)) = (polygon_bounds(a), polygon_bounds(b)) else {
        return false;
    };
    if !rects_overlap(ra, rb) {
        return false;
    }
    !has_separating_axis(a, b) && !has_separating_axis(b, a)
}

/// Strict rectangle overlap: shared edges do not count.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Convex hull (Andrew's monotone chain), counter-clockwise, without collinear points.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let mut lower = half_hull(pts.iter());
    let mut upper = half_hull(pts.iter().rev());
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

fn half_hull<'a>(points: impl Iterator<Item = &'a Point>) -> Vec<Point> {
    let mut chain: Vec<Point> = Vec::new();
    for p in points {
        while let [.., o, a] = chain.as_slice() {
            if (*a - *o).cross(*p - *o) <= 0.0 {
                chain.pop();
            } else {
                break;
            }
        }
        chain.push(*p);
    }
    chain
}

fn has_separating_axis(poly: &[Point], other: &[Point]) -> bool {
    if poly.len() < 2 {
        return false;
    }
    for (i, a) in poly.iter().enumerate() {
        let b = poly[(i + 1) % poly.len()];
        let edge = b - *a;
        let axis = Vec2::new(-edge.y, edge.x);
        if axis.x == 0.0 && axis.y == 0.0 {
            continue;
        }
        let (min_a, max_a) = project(poly, axis);
        let (min_b, max_b) = project(other, axis);
        if max_a <= min_b || max_b <= min_a {
            return true;
        }
    }
    false
}

fn project(points: &[Point], axis: Vec2) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for p in points {
        let d = p.to_vec2().dot(axis);
        lo = lo.min(d);
        hi = hi.max(d);
    }
    (lo, hi)
}

#[inline]
fn abs(v: f64) -> f64 {
    if v < 0.0 { -v } else { v }
}

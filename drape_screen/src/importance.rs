// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Screen footprints and importance for 3D volumes.
//!
//! A volume is eight corners in display space, laid out like
//! [`Aabb3::corners`]. Its footprint is the convex hull of its front faces
//! after clipping in homogeneous coordinates; its importance is the
//! footprint's pixel area, optionally scaled by how squarely the surface faces
//! the eye.

use drape_index::{Containment, Mbr};
use drape_layout::{Footprint, convex_hull, polygon_area};
use glam::{DVec3, DVec4};
use kurbo::Point;

use crate::aabb3::Aabb3;
use crate::clip::clip_polygon;
use crate::view::ViewState;

/// Faces of an eight-corner volume as corner-index cycles.
const FACES: [[usize; 4]; 6] = [
    [0, 2, 6, 4],
    [1, 3, 7, 5],
    [0, 1, 5, 4],
    [2, 3, 7, 6],
    [0, 1, 3, 2],
    [4, 5, 7, 6],
];

/// Maps local coordinates (what trees and tiles store) into display space.
pub trait LocalToDisplay {
    /// Display-space position of a local point.
    fn local_to_display(&self, local: DVec3) -> DVec3;

    /// Outward surface normal at a local point, for back-facing attenuation.
    ///
    /// Flat displays have no curvature worth weighting and return `None`.
    fn surface_normal(&self, _local: DVec3) -> Option<DVec3> {
        None
    }

    /// Display-space box holding every point of a local box.
    ///
    /// The default maps the eight corners, which is exact for affine maps.
    /// Curved displays override it so that culling stays conservative.
    fn display_bounds(&self, local: &Aabb3) -> Aabb3 {
        let mut shown = Aabb3::empty();
        for c in local.corners() {
            shown.add_point(self.local_to_display(c));
        }
        shown
    }
}

/// Local and display coordinates coincide.
#[derive(Copy, Clone, Debug, Default)]
pub struct FlatDisplay;

impl LocalToDisplay for FlatDisplay {
    fn local_to_display(&self, local: DVec3) -> DVec3 {
        local
    }
}

/// Local `(longitude, latitude, height)` in radians and display units, wrapped
/// onto a sphere of `radius` centered at the origin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GlobeDisplay {
    /// Sphere radius in display units.
    pub radius: f64,
}

impl Default for GlobeDisplay {
    fn default() -> Self {
        Self { radius: 1.0 }
    }
}

impl LocalToDisplay for GlobeDisplay {
    fn local_to_display(&self, local: DVec3) -> DVec3 {
        let (sin_lon, cos_lon) = local.x.sin_cos();
        let (sin_lat, cos_lat) = local.y.sin_cos();
        let r = self.radius + local.z;
        DVec3::new(r * cos_lat * cos_lon, r * cos_lat * sin_lon, r * sin_lat)
    }

    fn surface_normal(&self, local: DVec3) -> Option<DVec3> {
        self.local_to_display(DVec3::new(local.x, local.y, 0.0))
            .try_normalize()
    }

    /// Interval bounds of the spherical map over the box.
    ///
    /// A patch bulges between its corners, so the corners alone can all lie
    /// outside a plane the patch crosses.
    fn display_bounds(&self, local: &Aabb3) -> Aabb3 {
        if local.is_empty() {
            return Aabb3::empty();
        }
        let lon = (local.min.x, local.max.x);
        let lat = (local.min.y, local.max.y);
        let r = (self.radius + local.min.z, self.radius + local.max.z);
        let cos_lat = cos_range(lat);
        let x = mul_range(mul_range(r, cos_lat), cos_range(lon));
        let y = mul_range(mul_range(r, cos_lat), sin_range(lon));
        let z = mul_range(r, sin_range(lat));
        Aabb3::new(DVec3::new(x.0, y.0, z.0), DVec3::new(x.1, y.1, z.1))
    }
}

/// Range of `sin` over `[a, b]`.
fn sin_range((a, b): (f64, f64)) -> (f64, f64) {
    use core::f64::consts::{FRAC_PI_2, TAU};
    if b - a >= TAU || (b - a).is_nan() {
        return (-1.0, 1.0);
    }
    let (sa, sb) = (a.sin(), b.sin());
    let reaches = |peak: f64| {
        let k = ((a - peak) / TAU).ceil();
        peak + k * TAU <= b
    };
    let hi = if reaches(FRAC_PI_2) { 1.0 } else { sa.max(sb) };
    let lo = if reaches(-FRAC_PI_2) { -1.0 } else { sa.min(sb) };
    (lo, hi)
}

/// Range of `cos` over `[a, b]`.
fn cos_range((a, b): (f64, f64)) -> (f64, f64) {
    use core::f64::consts::FRAC_PI_2;
    sin_range((a + FRAC_PI_2, b + FRAC_PI_2))
}

fn mul_range(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    let p = [a.0 * b.0, a.0 * b.1, a.1 * b.0, a.1 * b.1];
    p.into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Knobs for [`project_volume`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ImportanceOptions {
    /// Outward surface normal of the volume in display space.
    ///
    /// When set, importance is scaled by the cosine between the normal and
    /// the direction to the eye, and drops to zero on the far side.
    pub surface_normal: Option<DVec3>,
    /// Importance below this is reported as zero.
    pub min_importance: f64,
}

impl Default for ImportanceOptions {
    fn default() -> Self {
        Self {
            surface_normal: None,
            min_importance: 0.0,
        }
    }
}

/// Result of projecting one volume.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenProjection {
    /// Convex footprint in screen pixels; empty or at least three vertices.
    pub footprint: Vec<Point>,
    /// Anchor of the footprint: vertex centroid, or the viewport center on fallback.
    pub center: Point,
    /// Whether the footprint covers a nonzero area of the viewport.
    pub on_screen: bool,
    /// Pixel area, after normal weighting.
    pub importance: f64,
    /// Set when the eye is inside the volume or the volume straddles the
    /// near plane; the footprint is then the whole viewport.
    pub fallback: bool,
}

impl ScreenProjection {
    /// The off-screen result.
    pub fn off_screen() -> Self {
        Self {
            footprint: Vec::new(),
            center: Point::ZERO,
            on_screen: false,
            importance: 0.0,
            fallback: false,
        }
    }

    /// The projection as a layout footprint, if on screen.
    pub fn to_footprint(&self) -> Option<Footprint> {
        self.on_screen
            .then(|| Footprint::new(self.footprint.clone(), self.center, self.importance))
    }
}

/// Project a volume given by its eight display-space corners.
///
/// Faces turned away from the eye are skipped, the rest are clipped against
/// the view volume before the divide, and the surviving vertices are hulled.
/// An eye inside the volume, or a volume that reaches behind the near plane
/// while still visible, yields the whole viewport with maximal importance.
pub fn project_volume(
    view: &ViewState,
    corners: &[DVec3; 8],
    options: &ImportanceOptions,
) -> ScreenProjection {
    let clip: [DVec4; 8] = corners.map(|c| view.to_clip(c));
    let centroid = corners.iter().copied().sum::<DVec3>() / 8.0;

    let mut oriented = false;
    let mut front = 0;
    let mut screen: Vec<Point> = Vec::new();
    for face in &FACES {
        let p = face.map(|i| corners[i]);
        let Some(normal) = (p[1] - p[0]).cross(p[3] - p[0]).try_normalize() else {
            continue;
        };
        let face_center = (p[0] + p[1] + p[2] + p[3]) * 0.25;
        let outward = normal.dot(face_center - centroid);
        let to_eye = normal.dot(view.eye - face_center);
        let facing = if outward.abs() > f64::EPSILON {
            oriented = true;
            to_eye * outward.signum() > 0.0
        } else {
            // Flat volume: either side of the face may be the visible one.
            to_eye.abs() > f64::EPSILON
        };
        if !facing {
            continue;
        }
        front += 1;
        let clipped = clip_polygon(&face.map(|i| clip[i]));
        screen.extend(
            clipped
                .into_iter()
                .filter(|v| v.w > 0.0)
                .map(|v| view.clip_to_screen(v)),
        );
    }

    if front == 0 {
        return if oriented {
            log::trace!("eye inside volume, using full-viewport fallback");
            fallback(view, options)
        } else {
            ScreenProjection::off_screen()
        };
    }

    let hull = convex_hull(&screen);
    let area = polygon_area(&hull);
    if hull.len() < 3 || area <= 0.0 {
        return ScreenProjection::off_screen();
    }
    let straddles = clip.iter().any(|c| c.z < 0.0) && clip.iter().any(|c| c.z >= 0.0);
    if straddles {
        log::trace!("volume straddles the near plane, using full-viewport fallback");
        return fallback(view, options);
    }

    let n = hull.len() as f64;
    let sum = hull.iter().fold(Point::ZERO, |acc, p| Point::new(acc.x + p.x, acc.y + p.y));
    let importance = weighted(view, centroid, area, options);
    ScreenProjection {
        center: Point::new(sum.x / n, sum.y / n),
        footprint: hull,
        on_screen: true,
        importance,
        fallback: false,
    }
}

/// Project a local-space box through `display`.
///
/// When `options` carries no surface normal, the display's normal at the
/// box's center is used.
pub fn project_aabb<L: LocalToDisplay + ?Sized>(
    view: &ViewState,
    display: &L,
    aabb: &Aabb3,
    options: &ImportanceOptions,
) -> ScreenProjection {
    if aabb.is_empty() {
        return ScreenProjection::off_screen();
    }
    let corners = aabb.corners().map(|c| display.local_to_display(c));
    let mut options = *options;
    if options.surface_normal.is_none() {
        options.surface_normal = display.surface_normal(aabb.center());
    }
    project_volume(view, &corners, &options)
}

/// Classify a local rectangle, extruded over `z_range`, against the view.
///
/// Suitable as a [`drape_index::CullTree::query_with`] classifier. Boxes are
/// taken through [`LocalToDisplay::display_bounds`], so a node is only
/// reported outside when no point of it can be seen.
pub fn classify_mbr<L: LocalToDisplay + ?Sized>(
    view: &ViewState,
    display: &L,
    mbr: &Mbr<f64>,
    z_range: (f64, f64),
) -> Containment {
    let local = Aabb3::from_mbr(mbr, z_range.0, z_range.1);
    if local.is_empty() {
        return Containment::Outside;
    }
    view.frustum().classify(&display.display_bounds(&local))
}

fn fallback(view: &ViewState, options: &ImportanceOptions) -> ScreenProjection {
    let r = view.viewport_rect();
    let area = view.viewport_area();
    ScreenProjection {
        footprint: drape_layout::rect_points(r),
        center: r.center(),
        on_screen: area > 0.0,
        importance: if area >= options.min_importance { area } else { 0.0 },
        fallback: true,
    }
}

fn weighted(view: &ViewState, centroid: DVec3, area: f64, options: &ImportanceOptions) -> f64 {
    let mut importance = area;
    if let Some(normal) = options.surface_normal.and_then(DVec3::try_normalize) {
        let facing = (view.eye - centroid)
            .try_normalize()
            .map_or(1.0, |dir| normal.dot(dir));
        importance *= facing.max(0.0);
    }
    if importance < options.min_importance {
        0.0
    } else {
        importance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;

    fn camera() -> ViewState {
        ViewState::look_at_perspective(
            DVec3::new(0.0, 0.0, 10.0),
            DVec3::ZERO,
            DVec3::Y,
            core::f64::consts::FRAC_PI_2,
            Size::new(800.0, 800.0),
            0.1,
            100.0,
        )
    }

    fn cube(center: DVec3, half: f64) -> [DVec3; 8] {
        Aabb3::new(center - DVec3::splat(half), center + DVec3::splat(half)).corners()
    }

    #[test]
    fn box_in_front_projects_to_a_convex_footprint() {
        let view = camera();
        let p = project_volume(&view, &cube(DVec3::ZERO, 1.0), &ImportanceOptions::default());
        assert!(p.on_screen);
        assert!(!p.fallback);
        assert!(p.footprint.len() >= 4, "footprint: {:?}", p.footprint);
        // The near face sits 9 units away; 2 units across at 90 degrees fov is 800 * 2 / 18 px.
        let near_face = (800.0 * 2.0 / 18.0_f64).powi(2);
        assert!(p.importance >= near_face * 0.99, "importance {}", p.importance);
        assert!((p.center.x - 400.0).abs() < 1e-6, "centered: {:?}", p.center);
    }

    #[test]
    fn nearer_boxes_are_more_important() {
        let view = camera();
        let opts = ImportanceOptions::default();
        let near = project_volume(&view, &cube(DVec3::new(0.0, 0.0, 5.0), 0.5), &opts);
        let far = project_volume(&view, &cube(DVec3::new(0.0, 0.0, -20.0), 0.5), &opts);
        assert!(near.importance > far.importance);
    }

    #[test]
    fn box_entirely_behind_the_near_plane_is_off_screen() {
        let view = camera();
        let p = project_volume(
            &view,
            &cube(DVec3::new(0.0, 0.0, 20.0), 1.0),
            &ImportanceOptions::default(),
        );
        assert!(!p.on_screen);
        assert!(p.footprint.is_empty(), "no degenerate footprint: {:?}", p.footprint);
        assert_eq!(p.importance, 0.0);
    }

    #[test]
    fn box_off_to_the_side_is_off_screen() {
        let view = camera();
        let p = project_volume(
            &view,
            &cube(DVec3::new(100.0, 0.0, 0.0), 1.0),
            &ImportanceOptions::default(),
        );
        assert!(!p.on_screen);
        assert!(p.footprint.is_empty());
    }

    #[test]
    fn eye_inside_volume_falls_back_to_full_viewport() {
        let view = camera();
        let p = project_volume(
            &view,
            &cube(DVec3::new(0.0, 0.0, 10.0), 2.0),
            &ImportanceOptions::default(),
        );
        assert!(p.fallback);
        assert!(p.on_screen);
        assert_eq!(p.importance, view.viewport_area());
        assert_eq!(p.footprint.len(), 4);
    }

    #[test]
    fn near_plane_straddle_falls_back_when_visible() {
        let view = camera();
        // Long box along the view axis reaching past the eye, offset so the
        // eye is outside it.
        let b = Aabb3::new(DVec3::new(-1.0, -3.0, -5.0), DVec3::new(1.0, -1.0, 15.0));
        let p = project_volume(&view, &b.corners(), &ImportanceOptions::default());
        assert!(p.fallback);
        assert_eq!(p.importance, view.viewport_area());
    }

    #[test]
    fn back_facing_surface_loses_importance() {
        let view = camera();
        let corners = cube(DVec3::ZERO, 1.0);
        let facing = ImportanceOptions {
            surface_normal: Some(DVec3::Z),
            min_importance: 0.0,
        };
        let away = ImportanceOptions {
            surface_normal: Some(-DVec3::Z),
            min_importance: 0.0,
        };
        let oblique = ImportanceOptions {
            surface_normal: Some(DVec3::new(1.0, 0.0, 1.0)),
            min_importance: 0.0,
        };
        let full = project_volume(&view, &corners, &facing).importance;
        assert!(full > 0.0);
        assert_eq!(project_volume(&view, &corners, &away).importance, 0.0);
        let partial = project_volume(&view, &corners, &oblique).importance;
        assert!(partial > 0.0 && partial < full, "{partial} vs {full}");
    }

    #[test]
    fn flat_tiles_project_and_can_be_classified() {
        let view = camera();
        let tile = Mbr::new(-1.0, -1.0, 1.0, 1.0);
        let b = Aabb3::from_mbr(&tile, 0.0, 0.0);
        let p = project_aabb(&view, &FlatDisplay, &b, &ImportanceOptions::default());
        assert!(p.on_screen);
        let expected = (800.0 * 2.0 / 20.0_f64).powi(2);
        assert!((p.importance - expected).abs() < 1e-6, "{} vs {expected}", p.importance);
        assert_eq!(classify_mbr(&view, &FlatDisplay, &tile, (0.0, 0.0)), Containment::Inside);
        let away = Mbr::new(500.0, 500.0, 501.0, 501.0);
        assert_eq!(classify_mbr(&view, &FlatDisplay, &away, (0.0, 0.0)), Containment::Outside);
    }

    #[test]
    fn globe_far_side_is_unimportant() {
        let globe = GlobeDisplay { radius: 1.0 };
        let view = ViewState::look_at_perspective(
            DVec3::new(3.0, 0.0, 0.0),
            DVec3::ZERO,
            DVec3::Z,
            core::f64::consts::FRAC_PI_3,
            Size::new(512.0, 512.0),
            0.01,
            10.0,
        );
        let tile = |lon: f64| Aabb3::new(DVec3::new(lon - 0.1, -0.1, 0.0), DVec3::new(lon + 0.1, 0.1, 0.01));
        let opts = ImportanceOptions::default();
        let near = project_aabb(&view, &globe, &tile(0.0), &opts);
        let far = project_aabb(&view, &globe, &tile(core::f64::consts::PI), &opts);
        assert!(near.importance > 0.0);
        assert_eq!(far.importance, 0.0);
    }

    #[test]
    fn globe_bounds_hold_the_whole_patch() {
        let globe = GlobeDisplay { radius: 2.0 };
        let patch = Aabb3::new(DVec3::new(-0.8, -0.4, 0.0), DVec3::new(1.9, 1.2, 0.5));
        let shown = globe.display_bounds(&patch);
        for i in 0..=20_u32 {
            for j in 0..=20_u32 {
                for k in 0..=2_u32 {
                    let t = DVec3::new(f64::from(i) / 20.0, f64::from(j) / 20.0, f64::from(k) / 2.0);
                    let p = globe.local_to_display(patch.min + (patch.max - patch.min) * t);
                    let inside = p.cmpge(shown.min - 1e-9).all() && p.cmple(shown.max + 1e-9).all();
                    assert!(inside, "{p} escapes {shown:?}");
                }
            }
        }
        // The patch crosses lon 0 at lat 0, where it reaches x = radius + height.
        let mut corners = Aabb3::empty();
        for c in patch.corners() {
            corners.add_point(globe.local_to_display(c));
        }
        assert!(corners.max.x < 2.0);
        assert!((shown.max.x - 2.5).abs() < 1e-12);
    }

    #[test]
    fn footprint_feeds_layout() {
        let view = camera();
        let p = project_volume(&view, &cube(DVec3::ZERO, 1.0), &ImportanceOptions::default());
        let fp = p.to_footprint().unwrap();
        assert_eq!(fp.importance, p.importance);
        assert!(ScreenProjection::off_screen().to_footprint().is_none());
    }
}

// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned 3D boxes.

use drape_index::Mbr;
use glam::DVec3;

/// Axis-aligned box in local coordinates, with an explicit empty state.
///
/// Tiles and tree nodes carry a 2D [`Mbr`] plus an elevation range; this is
/// the same thing with the range folded in.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb3 {
    /// A box from two corners, which need not be ordered.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The empty box; the first [`Aabb3::add_point`] initializes it.
    pub const fn empty() -> Self {
        Self {
            min: DVec3::splat(f64::INFINITY),
            max: DVec3::splat(f64::NEG_INFINITY),
        }
    }

    /// Extrude a 2D rectangle over `[min_z, max_z]`.
    ///
    /// An empty rectangle yields an empty box.
    pub fn from_mbr(mbr: &Mbr<f64>, min_z: f64, max_z: f64) -> Self {
        if mbr.is_empty() {
            return Self::empty();
        }
        Self::new(
            DVec3::new(mbr.min_x, mbr.min_y, min_z),
            DVec3::new(mbr.max_x, mbr.max_y, max_z),
        )
    }

    /// The 2D footprint in the xy plane.
    pub fn to_mbr(&self) -> Mbr<f64> {
        if self.is_empty() {
            return Mbr::empty();
        }
        Mbr::new(self.min.x, self.min.y, self.max.x, self.max.y)
    }

    /// True before any point has been added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include `p`.
    pub fn add_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow to include `other`. Empty boxes contribute nothing.
    pub fn union(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Closed-interval overlap test; empty boxes intersect nothing.
    pub fn intersects(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Whether `p` lies inside or on the boundary.
    pub fn contains(&self, p: DVec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }

    /// Midpoint; meaningless for an empty box.
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths; zero for an empty box.
    pub fn size(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// The eight corners. Bit 0 of the index selects max x, bit 1 max y, bit 2 max z.
    pub fn corners(&self) -> [DVec3; 8] {
        core::array::from_fn(|i| {
            DVec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }
}

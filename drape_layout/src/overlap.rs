// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid over the viewport for "place unless it collides" tests.

use alloc::vec::Vec;
use kurbo::{Point, Rect, Size};

use crate::footprint::{polygon_bounds, polygons_overlap, rects_overlap};

#[derive(Clone, Debug)]
struct Placed {
    points: Vec<Point>,
    bounds: Rect,
    live: bool,
}

/// Grid sizing for one layout pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OverlapGridConfig {
    /// Target cell size in pixels; roughly the smallest object expected.
    pub cell_size: Size,
}

impl Default for OverlapGridConfig {
    fn default() -> Self {
        Self {
            cell_size: Size::new(32.0, 32.0),
        }
    }
}

/// Fixed-resolution grid of cells covering one viewport.
///
/// Each cell lists the placed objects whose bounding box touches it. Polygons
/// that extend past the viewport are clamped to the edge cells, which keeps
/// the collision test sound for partially off-screen footprints.
///
/// Built once per layout pass and dropped afterwards; it holds no state across
/// frames.
pub struct OverlapGrid {
    bounds: Rect,
    size_x: usize,
    size_y: usize,
    cell_w: f64,
    cell_h: f64,
    cells: Vec<Vec<usize>>,
    objects: Vec<Placed>,
    live: usize,
}

impl core::fmt::Debug for OverlapGrid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let occupied = self.cells.iter().filter(|c| !c.is_empty()).count();
        f.debug_struct("OverlapGrid")
            .field("bounds", &self.bounds)
            .field("size_x", &self.size_x)
            .field("size_y", &self.size_y)
            .field("objects", &self.live)
            .field("occupied_cells", &occupied)
            .finish_non_exhaustive()
    }
}

impl OverlapGrid {
    /// Create a grid of `size_x` × `size_y` cells over `bounds`.
    ///
    /// Zero sizes are bumped to one cell.
    pub fn new(bounds: Rect, size_x: usize, size_y: usize) -> Self {
        let bounds = bounds.abs();
        let size_x = size_x.max(1);
        let size_y = size_y.max(1);
        let cell_w = positive_or_one(bounds.width() / size_x as f64);
        let cell_h = positive_or_one(bounds.height() / size_y as f64);
        Self {
            bounds,
            size_x,
            size_y,
            cell_w,
            cell_h,
            cells: alloc::vec![Vec::new(); size_x * size_y],
            objects: Vec::new(),
            live: 0,
        }
    }

    /// Create a grid over `bounds` whose cells are roughly `cell` in size.
    ///
    /// Pick `cell` close to the smallest object expected on screen.
    pub fn with_cell_size(bounds: Rect, cell: Size) -> Self {
        let bounds = bounds.abs();
        let nx = cells_along(bounds.width(), cell.width);
        let ny = cells_along(bounds.height(), cell.height);
        Self::new(bounds, nx, ny)
    }

    /// The viewport this grid covers.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Grid resolution as `(size_x, size_y)`.
    pub fn resolution(&self) -> (usize, usize) {
        (self.size_x, self.size_y)
    }

    /// Number of registered objects still live.
    pub fn len(&self) -> usize {
        self.live
    }

    /// True if nothing live is registered.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Bounding box of a live registered object.
    pub fn object_bounds(&self, index: usize) -> Option<Rect> {
        self.objects.get(index).filter(|o| o.live).map(|o| o.bounds)
    }

    /// Unregister an object. Indices are never reused within a pass.
    ///
    /// Returns `false` if `index` is unknown or already removed.
    pub fn remove(&mut self, index: usize) -> bool {
        let Some(placed) = self.objects.get_mut(index) else {
            return false;
        };
        if !placed.live {
            return false;
        }
        placed.live = false;
        placed.points.clear();
        let bounds = placed.bounds;
        let cells: Vec<usize> = self.cells_for_rect(bounds).collect();
        for cell in cells {
            self.cells[cell].retain(|&i| i != index);
        }
        self.live -= 1;
        true
    }

    /// Forget every registered object, keeping the allocation.
    pub fn clear(&mut self) {
        for c in &mut self.cells {
            c.clear();
        }
        self.objects.clear();
        self.live = 0;
    }

    /// Register `polygon` if it overlaps nothing already placed.
    ///
    /// Returns `true` when accepted. On rejection nothing is registered.
    pub fn try_add(&mut self, polygon: &[Point]) -> bool {
        self.try_insert(polygon).is_ok()
    }

    /// Like [`OverlapGrid::try_add`], but reports indices.
    ///
    /// `Ok` carries the new object's index. `Err` carries the index of the
    /// earliest registered object the polygon collides with.
    pub fn try_insert(&mut self, polygon: &[Point]) -> Result<usize, usize> {
        if let Some(hit) = self.first_conflict(polygon) {
            return Err(hit);
        }
        Ok(self.add_unchecked(polygon))
    }

    /// Index of the earliest live object `polygon` collides with.
    pub fn first_conflict(&self, polygon: &[Point]) -> Option<usize> {
        let bounds = polygon_bounds(polygon)?;
        self.candidates(bounds).into_iter().find(|&i| {
            let other = &self.objects[i];
            rects_overlap(bounds, other.bounds) && polygons_overlap(polygon, &other.points)
        })
    }

    /// Indices of every live object `polygon` collides with, earliest first.
    pub fn conflicts(&self, polygon: &[Point]) -> Vec<usize> {
        let Some(bounds) = polygon_bounds(polygon) else {
            return Vec::new();
        };
        let mut hits = self.candidates(bounds);
        hits.retain(|&i| {
            let other = &self.objects[i];
            rects_overlap(bounds, other.bounds) && polygons_overlap(polygon, &other.points)
        });
        hits
    }

    /// Register `polygon` without testing it, for objects that must show.
    pub fn add_unchecked(&mut self, polygon: &[Point]) -> usize {
        let index = self.objects.len();
        self.live += 1;
        let Some(bounds) = polygon_bounds(polygon) else {
            self.objects.push(Placed {
                points: Vec::new(),
                bounds: Rect::ZERO,
                live: true,
            });
            return index;
        };
        let cells: Vec<usize> = self.cells_for_rect(bounds).collect();
        for cell in cells {
            self.cells[cell].push(index);
        }
        self.objects.push(Placed {
            points: polygon.to_vec(),
            bounds,
            live: true,
        });
        index
    }

    #[inline]
    fn floor_to_i64(v: f64) -> i64 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "Grid cell indices are clamped to the grid right after."
        )]
        let i = v as i64;
        if (i as f64) > v { i - 1 } else { i }
    }

    fn key_for(&self, x: f64, y: f64) -> (usize, usize) {
        let cx = Self::floor_to_i64((x - self.bounds.x0) / self.cell_w);
        let cy = Self::floor_to_i64((y - self.bounds.y0) / self.cell_h);
        (clamp_index(cx, self.size_x), clamp_index(cy, self.size_y))
    }

    /// Registered objects in the cells under `bounds`, sorted and deduplicated.
    fn candidates(&self, bounds: Rect) -> Vec<usize> {
        let mut candidates: Vec<usize> = Vec::new();
        for cell in self.cells_for_rect(bounds) {
            candidates.extend_from_slice(&self.cells[cell]);
        }
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    fn cells_for_rect(&self, r: Rect) -> impl Iterator<Item = usize> + '_ {
        let (minx, miny) = self.key_for(r.x0, r.y0);
        let (maxx, maxy) = self.key_for(r.x1, r.y1);
        (miny..=maxy).flat_map(move |y| (minx..=maxx).map(move |x| y * self.size_x + x))
    }
}

fn clamp_index(i: i64, size: usize) -> usize {
    if i <= 0 {
        0
    } else {
        usize::try_from(i).map_or(size - 1, |i| i.min(size - 1))
    }
}

fn positive_or_one(v: f64) -> f64 {
    if v > 0.0 { v } else { 1.0 }
}

fn cells_along(extent: f64, cell: f64) -> usize {
    if !(cell > 0.0) || !(extent > 0.0) {
        return 1;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Both operands are positive and the viewport is screen-sized."
    )]
    let n = (extent / cell) as usize;
    n.max(1)
}

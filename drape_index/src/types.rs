// Copyright 2025 the Drape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding rectangles and the scalar abstraction they are generic over.

use core::cmp::Ordering;
use core::fmt::Debug;

/// Minimum bounding rectangle in 2D.
///
/// A freshly created [`Mbr::empty`] is inverted (min above max) and acts as the
/// "nothing added yet" sentinel: it intersects nothing, contains nothing, and is
/// replaced wholesale by the first [`Mbr::add_point`] or [`Mbr::union`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Mbr<T> {
    /// Minimum x (left)
    pub min_x: T,
    /// Minimum y (bottom)
    pub min_y: T,
    /// Maximum x (right)
    pub max_x: T,
    /// Maximum y (top)
    pub max_y: T,
}

impl<T> Mbr<T> {
    /// Create a new rectangle from its lower-left and upper-right corners.
    pub const fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl<T: Scalar> Mbr<T> {
    /// The empty sentinel. Grows to fit the first point or rectangle added to it.
    pub fn empty() -> Self {
        Self {
            min_x: T::highest(),
            min_y: T::highest(),
            max_x: T::lowest(),
            max_y: T::lowest(),
        }
    }

    /// Return true if the rectangle is empty or inverted. Assumes no NaN.
    pub fn is_empty(&self) -> bool {
        lt(self.max_x, self.min_x) || lt(self.max_y, self.min_y)
    }

    /// Expand to include the point, initializing from it if currently empty.
    pub fn add_point(&mut self, x: T, y: T) {
        self.min_x = min_t(self.min_x, x);
        self.min_y = min_t(self.min_y, y);
        self.max_x = max_t(self.max_x, x);
        self.max_y = max_t(self.max_y, y);
    }

    /// Expand to include `other`. An empty `other` leaves `self` untouched.
    pub fn union(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        *self = union_mbr(*self, *other);
    }

    /// Whether the two rectangles share any point. Touching edges count.
    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && le(self.min_x, other.max_x)
            && le(other.min_x, self.max_x)
            && le(self.min_y, other.max_y)
            && le(other.min_y, self.max_y)
    }

    /// Whether this rectangle contains the point (edges inclusive).
    pub fn contains(&self, x: T, y: T) -> bool {
        le(self.min_x, x) && le(self.min_y, y) && le(x, self.max_x) && le(y, self.max_y)
    }

    /// Whether `other` lies entirely within this rectangle.
    pub fn contains_mbr(&self, other: &Self) -> bool {
        !other.is_empty()
            && le(self.min_x, other.min_x)
            && le(self.min_y, other.min_y)
            && le(other.max_x, self.max_x)
            && le(other.max_y, self.max_y)
    }

    /// The overlap of two rectangles; empty if they are disjoint.
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            min_x: max_t(self.min_x, other.min_x),
            min_y: max_t(self.min_y, other.min_y),
            max_x: min_t(self.max_x, other.max_x),
            max_y: min_t(self.max_y, other.max_y),
        }
    }

    /// Midpoint of the rectangle.
    pub fn center(&self) -> (T, T) {
        (
            T::mid(self.min_x, self.max_x),
            T::mid(self.min_y, self.max_y),
        )
    }

    /// Width, clamped at zero for empty rectangles.
    pub fn width(&self) -> T {
        T::max_zero(T::sub(self.max_x, self.min_x))
    }

    /// Height, clamped at zero for empty rectangles.
    pub fn height(&self) -> T {
        T::max_zero(T::sub(self.max_y, self.min_y))
    }

    /// Area in the scalar's widened accumulator type.
    pub fn area(&self) -> T::Acc {
        T::widen(self.width()) * T::widen(self.height())
    }

    /// One quarter of the rectangle, split at its center.
    ///
    /// Quadrants are numbered `0` lower-left, `1` lower-right, `2` upper-left,
    /// `3` upper-right. Any index above 3 is treated as 3.
    pub fn quadrant(&self, q: usize) -> Self {
        let (cx, cy) = self.center();
        let (min_x, max_x) = if q & 1 == 0 {
            (self.min_x, cx)
        } else {
            (cx, self.max_x)
        };
        let (min_y, max_y) = if q < 2 {
            (self.min_y, cy)
        } else {
            (cy, self.max_y)
        };
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl<T: Scalar> Default for Mbr<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl Mbr<f32> {
    /// Create a rectangle from origin and size in f32.
    pub const fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        }
    }
}

impl Mbr<f64> {
    /// Create a rectangle from origin and size in f64.
    pub const fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        }
    }
}

impl Mbr<i64> {
    /// Create a rectangle from origin and size in i64.
    pub const fn from_xywh(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        }
    }
}

/// Numeric scalar abstraction for bounding rectangles.
///
/// Provides the handful of operations the tree needs to split boxes, plus an
/// associated widened accumulator type for area (e.g., f32→f64, i64→i128).
pub trait Scalar: Copy + PartialOrd + Debug {
    /// Widened accumulator type suitable for area computations.
    type Acc: Copy
        + PartialOrd
        + core::ops::Add<Output = Self::Acc>
        + core::ops::Sub<Output = Self::Acc>
        + core::ops::Mul<Output = Self::Acc>
        + Debug;

    /// Subtract two scalar values: a - b.
    fn sub(a: Self, b: Self) -> Self;

    /// Max of the scalar value and zero.
    fn max_zero(v: Self) -> Self;

    /// Midpoint between a and b.
    fn mid(a: Self, b: Self) -> Self;

    /// Largest representable value; the min corner of the empty sentinel.
    fn highest() -> Self;

    /// Smallest representable value; the max corner of the empty sentinel.
    fn lowest() -> Self;

    /// Convert a scalar to the accumulator type.
    fn widen(v: Self) -> Self::Acc;
}

impl Scalar for f32 {
    type Acc = f64;

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a - b
    }

    #[inline]
    fn max_zero(v: Self) -> Self {
        v.max(0.0)
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }

    #[inline]
    fn highest() -> Self {
        Self::INFINITY
    }

    #[inline]
    fn lowest() -> Self {
        Self::NEG_INFINITY
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        v as f64
    }
}

impl Scalar for f64 {
    type Acc = Self;

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a - b
    }

    #[inline]
    fn max_zero(v: Self) -> Self {
        v.max(0.0)
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }

    #[inline]
    fn highest() -> Self {
        Self::INFINITY
    }

    #[inline]
    fn lowest() -> Self {
        Self::NEG_INFINITY
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        v
    }
}

impl Scalar for i64 {
    type Acc = i128;

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a.saturating_sub(b)
    }

    #[inline]
    fn max_zero(v: Self) -> Self {
        v.max(0)
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        // Average without overflow: (a & b) + ((a ^ b) >> 1)
        (a & b) + ((a ^ b) >> 1)
    }

    #[inline]
    fn highest() -> Self {
        Self::MAX
    }

    #[inline]
    fn lowest() -> Self {
        Self::MIN
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        v as i128
    }
}

pub(crate) fn min_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        _ => a,
    }
}

pub(crate) fn max_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        _ => a,
    }
}

pub(crate) fn le<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o != Ordering::Greater)
        .unwrap_or(false)
}

pub(crate) fn lt<T: PartialOrd>(a: T, b: T) -> bool {
    a.partial_cmp(&b)
        .map(|o| o == Ordering::Less)
        .unwrap_or(false)
}

pub(crate) fn union_mbr<T: PartialOrd + Copy>(a: Mbr<T>, b: Mbr<T>) -> Mbr<T> {
    Mbr {
        min_x: min_t(a.min_x, b.min_x),
        min_y: min_t(a.min_y, b.min_y),
        max_x: max_t(a.max_x, b.max_x),
        max_y: max_t(a.max_y, b.max_y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grows_from_first_point() {
        let mut m = Mbr::<f64>::empty();
        assert!(m.is_empty());
        m.add_point(3.0, 4.0);
        assert!(!m.is_empty());
        assert_eq!(m, Mbr::new(3.0, 4.0, 3.0, 4.0));
        m.add_point(-1.0, 10.0);
        assert_eq!(m, Mbr::new(-1.0, 4.0, 3.0, 10.0));
    }

    #[test]
    fn empty_never_intersects() {
        let e = Mbr::<i64>::empty();
        let full = Mbr::new(i64::MIN, i64::MIN, i64::MAX, i64::MAX);
        assert!(!e.intersects(&full));
        assert!(!full.intersects(&e));
        assert!(!full.contains_mbr(&e));
        assert!(!e.contains(0, 0));
    }

    #[test]
    fn union_ignores_empty_other() {
        let mut a = Mbr::new(0, 0, 10, 10);
        a.union(&Mbr::empty());
        assert_eq!(a, Mbr::new(0, 0, 10, 10));

        let mut e = Mbr::<i64>::empty();
        e.union(&a);
        assert_eq!(e, a);

        a.union(&Mbr::new(5, -5, 20, 5));
        assert_eq!(a, Mbr::new(0, -5, 20, 10));
    }

    #[test]
    fn touching_edges_intersect() {
        let a = Mbr::new(0.0, 0.0, 1.0, 1.0);
        let b = Mbr::new(1.0, 0.0, 2.0, 1.0);
        let c = Mbr::new(1.5, 0.0, 2.0, 1.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.intersection(&c).is_empty());
    }

    #[test]
    fn quadrants_tile_the_parent() {
        let m = Mbr::<f64>::from_xywh(0.0, 0.0, 100.0, 50.0);
        let mut acc = Mbr::empty();
        let mut total = 0.0;
        for q in 0..4 {
            let r = m.quadrant(q);
            assert!(m.contains_mbr(&r));
            total += r.area();
            acc.union(&r);
        }
        assert_eq!(acc, m);
        assert_eq!(total, m.area());
        assert_eq!(m.quadrant(0), Mbr::new(0.0, 0.0, 50.0, 25.0));
        assert_eq!(m.quadrant(3), Mbr::new(50.0, 25.0, 100.0, 50.0));
    }

    #[test]
    fn i64_midpoint_does_not_overflow() {
        let m = Mbr::new(i64::MAX - 2, 0, i64::MAX, 0);
        assert_eq!(m.center().0, i64::MAX - 1);
    }
}

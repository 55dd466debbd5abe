//! Board components and the geometry primitives used to place them.
//!
//! All coordinates are millimetres in board space (x grows right, y grows down,
//! as in KiCad).

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A point (or vector) in board coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Manhattan distance to another point.
    pub fn manhattan(&self, other: Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Width and height of an axis-aligned box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// A size is usable for packing when both sides are finite and positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Grow both sides by `margin` on each edge.
    pub fn inflate(&self, margin: f64) -> Size {
        Size::new(self.width + 2.0 * margin, self.height + 2.0 * margin)
    }
}

/// Overlap below this depth (mm) is rounding noise, not a collision.
const OVERLAP_EPSILON: f64 = 1e-9;

/// An axis-aligned rectangle given by its min (top-left) and max corners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(origin, Point::new(origin.x + size.width, origin.y + size.height))
    }

    /// A `size` box centered on the origin.
    pub fn centered(size: Size) -> Self {
        let half = Point::new(size.width / 2.0, size.height / 2.0);
        Self::new(Point::new(-half.x, -half.y), half)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn translate(&self, by: Point) -> Rect {
        Rect::new(self.min + by, self.max + by)
    }

    pub fn inflate(&self, margin: f64) -> Rect {
        let m = Point::new(margin, margin);
        Rect::new(self.min - m, self.max + m)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    /// True when the interiors overlap. Boxes that only share an edge don't,
    /// even if rounding pushes the edges a few ulps into each other.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x + OVERLAP_EPSILON < other.max.x
            && other.min.x + OVERLAP_EPSILON < self.max.x
            && self.min.y + OVERLAP_EPSILON < other.max.y
            && other.min.y + OVERLAP_EPSILON < self.max.y
    }

    /// Axis-aligned bounds of this box after rotating it about the origin.
    ///
    /// Angles are in degrees, counter-clockwise as displayed by KiCad (which
    /// means clockwise in y-down math coordinates).
    pub fn rotated(&self, degrees: f64) -> Rect {
        let normalized = degrees.rem_euclid(360.0);
        if normalized == 0.0 {
            return *self;
        }

        let (sin, cos) = (-normalized.to_radians()).sin_cos();
        let corners = [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ];

        let mut bounds: Option<Rect> = None;
        for c in corners {
            let p = Point::new(c.x * cos - c.y * sin, c.x * sin + c.y * cos);
            let r = Rect::new(p, p);
            bounds = Some(bounds.map_or(r, |b| b.union(&r)));
        }

        // Snap float noise so quarter turns stay exact.
        let snap = |v: f64| {
            let r = (v * 1e9).round() / 1e9;
            if r == 0.0 { 0.0 } else { r }
        };
        let b = bounds.unwrap_or(*self);
        Rect::new(
            Point::new(snap(b.min.x), snap(b.min.y)),
            Point::new(snap(b.max.x), snap(b.max.y)),
        )
    }
}

/// One component as seen by the placer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Stable identifier, normally the reference designator ("U3").
    pub reference: String,
    /// Anchor position on the board.
    pub position: Point,
    /// Footprint bounding box relative to `position`.
    pub extent: Rect,
    /// Hierarchical path string as provided by the host.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub selected: bool,
}

impl Component {
    pub fn new(reference: impl Into<String>, position: Point, extent: Rect) -> Self {
        Self {
            reference: reference.into(),
            position,
            extent,
            path: String::new(),
            locked: false,
            selected: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Footprint bounding box in board coordinates.
    pub fn footprint(&self) -> Rect {
        self.extent.translate(self.position)
    }

    pub fn size(&self) -> Size {
        self.extent.size()
    }

    /// Anchor position that puts the footprint's top-left corner at `corner`.
    pub fn position_for_corner(&self, corner: Point) -> Point {
        corner - self.extent.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_is_strict() {
        let a = Rect::from_origin(Point::new(0.0, 0.0), Size::new(2.0, 2.0));
        let touching = Rect::from_origin(Point::new(2.0, 0.0), Size::new(2.0, 2.0));
        let overlapping = Rect::from_origin(Point::new(1.5, 1.5), Size::new(2.0, 2.0));

        assert!(!a.intersects(&touching));
        assert!(a.intersects(&overlapping));
        assert!(overlapping.intersects(&a));
    }

    #[test]
    fn test_intersects_ignores_rounding_noise() {
        let a = Rect::new(Point::new(0.0, 0.0), Point::new(0.1 + 0.2, 1.0));
        let b = Rect::new(Point::new(0.3, 0.0), Point::new(1.0, 1.0));
        assert!(a.max.x > b.min.x);
        assert!(!a.intersects(&b));
        assert!(!b.intersects(&a));

        let c = Rect::new(Point::new(0.299, 0.0), Point::new(1.0, 1.0));
        assert!(a.intersects(&c));
    }

    #[test]
    fn test_rotated_quarter_turn_swaps_sides() {
        let r = Rect::centered(Size::new(4.0, 2.0)).rotated(90.0);
        assert_eq!(r.size(), Size::new(2.0, 4.0));

        let r = Rect::centered(Size::new(4.0, 2.0)).rotated(-270.0);
        assert_eq!(r.size(), Size::new(2.0, 4.0));

        let r = Rect::centered(Size::new(4.0, 2.0)).rotated(180.0);
        assert_eq!(r.size(), Size::new(4.0, 2.0));
    }

    #[test]
    fn test_rotated_diagonal_grows() {
        let r = Rect::centered(Size::new(2.0, 2.0)).rotated(45.0);
        let side = 2.0 * std::f64::consts::SQRT_2;
        assert!((r.width() - side).abs() < 1e-6);
        assert!((r.height() - side).abs() < 1e-6);
    }

    #[test]
    fn test_position_for_corner() {
        let c = Component::new(
            "R1",
            Point::new(10.0, 10.0),
            Rect::new(Point::new(-1.0, -0.5), Point::new(1.0, 0.5)),
        );
        assert_eq!(c.footprint().min, Point::new(9.0, 9.5));

        let pos = c.position_for_corner(Point::new(0.0, 0.0));
        assert_eq!(pos, Point::new(1.0, 0.5));
    }

    #[test]
    fn test_size_validity() {
        assert!(Size::new(1.0, 0.5).is_valid());
        assert!(!Size::new(0.0, 0.5).is_valid());
        assert!(!Size::new(1.0, -1.0).is_valid());
        assert!(!Size::new(f64::NAN, 1.0).is_valid());
    }
}

//! Geometric primitives for box annotation.
//!
//! All coordinates are integer image pixels. Rectangles are stored as corner
//! pairs with inclusive extents: a rectangle whose corners coincide covers a
//! single pixel.

use serde::{Deserialize, Serialize};

/// A 2D point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One of the four corners of a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Get all corners, in hit-test order.
    pub fn all() -> &'static [Corner] {
        &[
            Corner::TopLeft,
            Corner::TopRight,
            Corner::BottomLeft,
            Corner::BottomRight,
        ]
    }

    /// The diagonally opposite corner.
    pub fn opposite(&self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

/// An axis-aligned rectangle with `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    /// Create a normalized rectangle from two corner points, regardless of
    /// drag direction.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            x1: p1.x.min(p2.x),
            y1: p1.y.min(p2.y),
            x2: p1.x.max(p2.x),
            y2: p1.y.max(p2.y),
        }
    }

    /// Width in pixels, counting both edge columns.
    pub fn width(&self) -> i32 {
        self.x2 - self.x1 + 1
    }

    /// Height in pixels, counting both edge rows.
    pub fn height(&self) -> i32 {
        self.y2 - self.y1 + 1
    }

    /// The midpoint, used as the anchor for relation lines.
    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// Inclusive bounds test for interior hits.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }

    /// The position of the given corner.
    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::TopLeft => Point::new(self.x1, self.y1),
            Corner::TopRight => Point::new(self.x2, self.y1),
            Corner::BottomLeft => Point::new(self.x1, self.y2),
            Corner::BottomRight => Point::new(self.x2, self.y2),
        }
    }

    /// The rectangle translated by the given delta.
    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Find the corner within `threshold` pixels of `p`, if any.
    ///
    /// Uses the Chebyshev metric (`|dx| <= threshold && |dy| <= threshold`),
    /// so the grab zone is a square around each corner. Corners are checked
    /// in [`Corner::all`] order and the first match wins.
    pub fn nearest_corner(&self, p: Point, threshold: i32) -> Option<Corner> {
        Corner::all().iter().copied().find(|&c| {
            let cp = self.corner(c);
            (cp.x - p.x).abs() <= threshold && (cp.y - p.y).abs() <= threshold
        })
    }
}

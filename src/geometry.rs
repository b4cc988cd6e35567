//! Double precision primitives used to place nodes and anchor edges on node borders.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

const EPSILON: f64 = 1e-9;
const EDGE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (other - self).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Width and height. Never negative: constructors clamp, and non-finite input collapses to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: non_negative(width),
            height: non_negative(height),
        }
    }

    pub fn square(side: f64) -> Self {
        Self::new(side, side)
    }

    pub fn max(self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }

    /// Grows the size by `amount` on every side.
    pub fn pad(self, amount: f64) -> Size {
        let amount = non_negative(amount);
        Size::new(self.width + 2.0 * amount, self.height + 2.0 * amount)
    }

    /// Finite and non-negative in both dimensions.
    pub fn is_valid(self) -> bool {
        is_valid_length(self.width) && is_valid_length(self.height)
    }
}

pub(crate) fn is_valid_length(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

pub(crate) fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub a: Vec2,
    pub b: Vec2,
}

impl Line {
    pub fn from_endpoints(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    pub fn direction(&self) -> Vec2 {
        self.b - self.a
    }

    pub fn length(&self) -> f64 {
        self.direction().length()
    }
}

/// Axis aligned box anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub origin: Vec2,
    pub size: Size,
}

impl BoundingBox {
    pub fn new(origin: Vec2, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn min(&self) -> Vec2 {
        self.origin
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(
            self.origin.x + self.size.width,
            self.origin.y + self.size.height,
        )
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let min = self.min();
        let max = self.max();
        point.x >= min.x - EDGE_TOLERANCE
            && point.x <= max.x + EDGE_TOLERANCE
            && point.y >= min.y - EDGE_TOLERANCE
            && point.y <= max.y + EDGE_TOLERANCE
    }

    /// Finds where the segment `line.a -> line.b` crosses this box's perimeter.
    ///
    /// When several sides are crossed the hit closest to `line.b` wins. Zero length
    /// segments and segments that never touch the perimeter yield the box center
    /// together with `false`; callers draw an approximate anchor in that case.
    pub fn intersect(&self, line: &Line) -> (Vec2, bool) {
        let d = line.direction();
        if d.length() <= EPSILON {
            return (self.center(), false);
        }

        let min = self.min();
        let max = self.max();
        let mut hits: Vec<Vec2> = Vec::with_capacity(4);

        if d.x.abs() > EPSILON {
            for side_x in [min.x, max.x] {
                let t = (side_x - line.a.x) / d.x;
                if (0.0..=1.0).contains(&t) {
                    let y = line.a.y + t * d.y;
                    if y >= min.y - EDGE_TOLERANCE && y <= max.y + EDGE_TOLERANCE {
                        hits.push(Vec2::new(side_x, y));
                    }
                }
            }
        }

        if d.y.abs() > EPSILON {
            for side_y in [min.y, max.y] {
                let t = (side_y - line.a.y) / d.y;
                if (0.0..=1.0).contains(&t) {
                    let x = line.a.x + t * d.x;
                    if x >= min.x - EDGE_TOLERANCE && x <= max.x + EDGE_TOLERANCE {
                        hits.push(Vec2::new(x, side_y));
                    }
                }
            }
        }

        hits.into_iter()
            .min_by(|p, q| p.distance(line.b).total_cmp(&q.distance(line.b)))
            .map(|point| (point, true))
            .unwrap_or((self.center(), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(Vec2::new(0.0, 0.0), Size::new(70.0, 70.0))
    }

    #[test]
    fn horizontal_line_exits_right_side() {
        let line = Line::from_endpoints(Vec2::new(35.0, 35.0), Vec2::new(235.0, 35.0));
        let (point, hit) = unit_box().intersect(&line);
        assert!(hit);
        assert_eq!(point, Vec2::new(70.0, 35.0));
    }

    #[test]
    fn incoming_line_hits_near_side() {
        let target = BoundingBox::new(Vec2::new(200.0, 0.0), Size::new(70.0, 70.0));
        let line = Line::from_endpoints(Vec2::new(35.0, 35.0), Vec2::new(235.0, 35.0));
        let (point, hit) = target.intersect(&line);
        assert!(hit);
        assert_eq!(point, Vec2::new(200.0, 35.0));
    }

    #[test]
    fn diagonal_line_exits_through_corner_region() {
        let line = Line::from_endpoints(Vec2::new(35.0, 35.0), Vec2::new(135.0, 135.0));
        let (point, hit) = unit_box().intersect(&line);
        assert!(hit);
        assert!((point.x - 70.0).abs() < 1e-9);
        assert!((point.y - 70.0).abs() < 1e-9);
    }

    #[test]
    fn vertical_line_exits_bottom() {
        let line = Line::from_endpoints(Vec2::new(35.0, 35.0), Vec2::new(35.0, 300.0));
        let (point, hit) = unit_box().intersect(&line);
        assert!(hit);
        assert_eq!(point, Vec2::new(35.0, 70.0));
    }

    #[test]
    fn zero_length_line_falls_back_to_center() {
        let p = Vec2::new(10.0, 10.0);
        let (point, hit) = unit_box().intersect(&Line::from_endpoints(p, p));
        assert!(!hit);
        assert_eq!(point, unit_box().center());
    }

    #[test]
    fn segment_inside_box_falls_back_to_center() {
        let line = Line::from_endpoints(Vec2::new(10.0, 10.0), Vec2::new(20.0, 30.0));
        let (point, hit) = unit_box().intersect(&line);
        assert!(!hit);
        assert_eq!(point, Vec2::new(35.0, 35.0));
    }

    #[test]
    fn segment_missing_box_falls_back_to_center() {
        let line = Line::from_endpoints(Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0));
        let (_, hit) = unit_box().intersect(&line);
        assert!(!hit);
    }

    #[test]
    fn sizes_never_go_negative() {
        assert_eq!(Size::new(-5.0, f64::NAN), Size::ZERO);
        assert_eq!(Size::new(50.0, 40.0).pad(10.0), Size::new(70.0, 60.0));
        assert_eq!(Size::new(50.0, 40.0).pad(-3.0), Size::new(50.0, 40.0));
    }
}

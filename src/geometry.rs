//! Points, rectangles and 3×3 transforms used by the gradient compiler.
//!
//! `Matrix` stores its nine entries row-major:
//!
//! ```text
//! | sx kx tx |
//! | ky sy ty |
//! | p0 p1 p2 |
//! ```
//!
//! Equality on every type here is bitwise on the float representation so the
//! types can participate in hashed cache keys.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

const NEARLY_ZERO: f32 = 1.0 / 4096.0;

pub fn nearly_zero(v: f32) -> bool {
    v.abs() <= NEARLY_ZERO
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Point) -> f32 {
        (other - self).length()
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits() && self.y.to_bits() == other.y.to_bits()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
    }
}

/// Integer device-space bounds, `[left, top, right, bottom)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct IRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IRect {
    pub const fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn to_rect(self) -> Rect {
        Rect::from_ltrb(
            self.left as f32,
            self.top as f32,
            self.right as f32,
            self.bottom as f32,
        )
    }
}

impl From<[i32; 4]> for IRect {
    fn from([l, t, r, b]: [i32; 4]) -> Self {
        IRect::from_ltrb(l, t, r, b)
    }
}

impl From<IRect> for [i32; 4] {
    fn from(r: IRect) -> Self {
        [r.left, r.top, r.right, r.bottom]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Empty or non-finite.
    pub fn is_empty(&self) -> bool {
        !(self.left < self.right && self.top < self.bottom)
    }

    fn bounds_of(points: &[Point]) -> Rect {
        let mut r = Rect::from_ltrb(
            f32::INFINITY,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NEG_INFINITY,
        );
        for p in points {
            r.left = r.left.min(p.x);
            r.top = r.top.min(p.y);
            r.right = r.right.max(p.x);
            r.bottom = r.bottom.max(p.y);
        }
        r
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Matrix {
    m: [f32; 9],
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.m
            .iter()
            .zip(other.m.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Matrix {}

impl Hash for Matrix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in &self.m {
            v.to_bits().hash(state);
        }
    }
}

impl Matrix {
    pub const SCALE_X: usize = 0;
    pub const SKEW_X: usize = 1;
    pub const TRANS_X: usize = 2;
    pub const SKEW_Y: usize = 3;
    pub const SCALE_Y: usize = 4;
    pub const TRANS_Y: usize = 5;
    pub const PERSP_0: usize = 6;
    pub const PERSP_1: usize = 7;
    pub const PERSP_2: usize = 8;

    pub const IDENTITY: Matrix = Matrix {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// Row-major `[sx kx tx ky sy ty p0 p1 p2]`.
    pub const fn from_row_major(m: [f32; 9]) -> Self {
        Self { m }
    }

    /// PDF/PostScript affine order `[a b c d e f]` = `[sx ky kx sy tx ty]`.
    pub const fn from_affine([a, b, c, d, e, f]: [f32; 6]) -> Self {
        Self {
            m: [a, c, e, b, d, f, 0.0, 0.0, 1.0],
        }
    }

    pub fn translate(dx: f32, dy: f32) -> Self {
        Self::from_row_major([1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0])
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self::from_row_major([sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0])
    }

    /// Rotation given its sine and cosine.
    pub fn sin_cos(sin: f32, cos: f32) -> Self {
        Self::from_row_major([cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0])
    }

    pub fn get(&self, index: usize) -> f32 {
        self.m[index]
    }

    pub fn row_major(&self) -> [f32; 9] {
        self.m
    }

    pub fn has_perspective(&self) -> bool {
        self.m[Self::PERSP_0] != 0.0 || self.m[Self::PERSP_1] != 0.0 || self.m[Self::PERSP_2] != 1.0
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// `self * other`: `other` is applied to points first.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        let a = &self.m;
        let b = &other.m;
        let mut out = [0.0f32; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[row * 3 + col] = a[row * 3] * b[col]
                    + a[row * 3 + 1] * b[3 + col]
                    + a[row * 3 + 2] * b[6 + col];
            }
        }
        Matrix { m: out }
    }

    pub fn pre_concat(&mut self, other: &Matrix) {
        *self = self.concat(other);
    }

    pub fn post_concat(&mut self, other: &Matrix) {
        *self = other.concat(self);
    }

    pub fn pre_scale(&mut self, sx: f32, sy: f32) {
        self.pre_concat(&Matrix::scale(sx, sy));
    }

    pub fn post_translate(&mut self, dx: f32, dy: f32) {
        self.post_concat(&Matrix::translate(dx, dy));
    }

    pub fn invert(&self) -> Option<Matrix> {
        let m = &self.m;
        let c00 = m[4] * m[8] - m[5] * m[7];
        let c01 = m[5] * m[6] - m[3] * m[8];
        let c02 = m[3] * m[7] - m[4] * m[6];
        let det = m[0] * c00 + m[1] * c01 + m[2] * c02;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        let out = [
            c00 * inv_det,
            (m[2] * m[7] - m[1] * m[8]) * inv_det,
            (m[1] * m[5] - m[2] * m[4]) * inv_det,
            c01 * inv_det,
            (m[0] * m[8] - m[2] * m[6]) * inv_det,
            (m[2] * m[3] - m[0] * m[5]) * inv_det,
            c02 * inv_det,
            (m[1] * m[6] - m[0] * m[7]) * inv_det,
            (m[0] * m[4] - m[1] * m[3]) * inv_det,
        ];
        if out.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Matrix { m: out })
    }

    pub fn map_point(&self, p: Point) -> Point {
        let m = &self.m;
        let x = m[0] * p.x + m[1] * p.y + m[2];
        let y = m[3] * p.x + m[4] * p.y + m[5];
        if !self.has_perspective() {
            return Point::new(x, y);
        }
        let w = m[6] * p.x + m[7] * p.y + m[8];
        let w = if w != 0.0 { 1.0 / w } else { w };
        Point::new(x * w, y * w)
    }

    fn map_vector(&self, v: Point) -> Point {
        let m = &self.m;
        Point::new(m[0] * v.x + m[1] * v.y, m[3] * v.x + m[4] * v.y)
    }

    /// Bounds of the four mapped corners.
    pub fn map_rect(&self, r: &Rect) -> Rect {
        let corners = [
            self.map_point(Point::new(r.left, r.top)),
            self.map_point(Point::new(r.right, r.top)),
            self.map_point(Point::new(r.right, r.bottom)),
            self.map_point(Point::new(r.left, r.bottom)),
        ];
        Rect::bounds_of(&corners)
    }

    /// Geometric mean of the lengths of the two mapped axis vectors.
    pub fn map_radius(&self, radius: f32) -> f32 {
        let d0 = self.map_vector(Point::new(radius, 0.0)).length();
        let d1 = self.map_vector(Point::new(0.0, radius)).length();
        (d0 * d1).sqrt()
    }

    /// `[a b c d e f]` for a PDF `/Matrix` entry. The projective row is dropped.
    pub fn to_affine(&self) -> [f32; 6] {
        let m = &self.m;
        [m[0], m[3], m[1], m[4], m[2], m[5]]
    }

    pub fn approximately_equal(&self, other: &Matrix, epsilon: f32) -> bool {
        let epsilon = if epsilon.is_finite() && epsilon >= 0.0 {
            epsilon
        } else {
            0.0
        };
        self.m
            .iter()
            .zip(other.m.iter())
            .all(|(l, r)| (*l - *r).abs() <= epsilon)
    }
}

/// Maps the unit segment `(0,0)-(1,0)` onto `pts[0]-pts[1]`.
///
/// A zero-length segment yields a zero scale rather than a division by zero.
pub fn unit_to_points(pts: [Point; 2]) -> Matrix {
    let vec = pts[1] - pts[0];
    let mag = vec.length();
    let inv = if mag != 0.0 { 1.0 / mag } else { 0.0 };

    let mut matrix = Matrix::sin_cos(vec.y * inv, vec.x * inv);
    matrix.pre_scale(mag, mag);
    matrix.post_translate(pts[0].x, pts[0].y);
    matrix
}

/// Maps `bbox` into the pre-image of `matrix`.
///
/// Returns `None` when `matrix` cannot be inverted or the mapped box has no area.
pub fn inverse_transform_bbox(matrix: &Matrix, bbox: &Rect) -> Option<Rect> {
    let inverse = matrix.invert()?;
    let mapped = inverse.map_rect(bbox);
    if mapped.is_empty() {
        return None;
    }
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-4
    }

    #[test]
    fn affine_array_round_trips_through_row_major() {
        let m = Matrix::from_affine([2.0, 0.5, -1.0, 3.0, 10.0, 20.0]);
        assert_eq!(m.get(Matrix::SCALE_X), 2.0);
        assert_eq!(m.get(Matrix::SKEW_Y), 0.5);
        assert_eq!(m.get(Matrix::SKEW_X), -1.0);
        assert_eq!(m.get(Matrix::TRANS_Y), 20.0);
        assert_eq!(m.to_affine(), [2.0, 0.5, -1.0, 3.0, 10.0, 20.0]);
        assert!(!m.has_perspective());
    }

    #[test]
    fn concat_applies_right_hand_side_first() {
        let t = Matrix::translate(10.0, 0.0);
        let s = Matrix::scale(2.0, 2.0);
        let p = t.concat(&s).map_point(Point::new(1.0, 1.0));
        assert!(close(p.x, 12.0) && close(p.y, 2.0), "got {p:?}");
    }

    #[test]
    fn invert_undoes_projective_matrix() {
        let m = Matrix::from_row_major([1.0, 0.2, 3.0, 0.1, 2.0, -4.0, 0.001, 0.002, 1.0]);
        let inv = m.invert().unwrap();
        assert!(m.concat(&inv).approximately_equal(&Matrix::IDENTITY, 1e-5));
    }

    #[test]
    fn singular_matrix_does_not_invert() {
        assert!(Matrix::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn unit_to_points_maps_segment_endpoints() {
        let m = unit_to_points([Point::new(10.0, 5.0), Point::new(10.0, 25.0)]);
        let a = m.map_point(Point::new(0.0, 0.0));
        let b = m.map_point(Point::new(1.0, 0.0));
        assert!(close(a.x, 10.0) && close(a.y, 5.0), "got {a:?}");
        assert!(close(b.x, 10.0) && close(b.y, 25.0), "got {b:?}");
    }

    #[test]
    fn unit_to_points_zero_length_is_singular() {
        let m = unit_to_points([Point::new(3.0, 3.0), Point::new(3.0, 3.0)]);
        assert!(m.invert().is_none());
    }

    #[test]
    fn inverse_bbox_of_scaled_matrix() {
        let m = Matrix::scale(100.0, 100.0);
        let r = inverse_transform_bbox(&m, &Rect::from_ltrb(0.0, 0.0, 50.0, 200.0)).unwrap();
        assert!(close(r.left, 0.0) && close(r.right, 0.5));
        assert!(close(r.top, 0.0) && close(r.bottom, 2.0));
    }

    #[test]
    fn inverse_bbox_rejects_empty_result() {
        let m = Matrix::IDENTITY;
        assert!(
            inverse_transform_bbox(&m, &Rect::from_ltrb(5.0, 0.0, 5.0, 10.0)).is_none()
        );
    }

    #[test]
    fn map_radius_of_uniform_scale() {
        assert!(close(Matrix::scale(3.0, 3.0).map_radius(2.0), 6.0));
    }
}

//! 2D affine matrix.
//!
//! Layout follows the usual display-list convention:
//! ```text
//! | a c tx |
//! | b d ty |
//! | 0 0 1  |
//! ```

use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rectangle::Rectangle;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    #[inline]
    pub fn identity(&mut self) {
        *self = Self::IDENTITY;
    }

    #[inline]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Post-multiply: the result applies `self` first, then `other`.
    pub fn concat(&mut self, other: &Matrix) {
        let (a, b, c, d, tx, ty) = (self.a, self.b, self.c, self.d, self.tx, self.ty);
        if other.b == 0.0 && other.c == 0.0 {
            self.a = a * other.a;
            self.b = b * other.d;
            self.c = c * other.a;
            self.d = d * other.d;
        } else {
            self.a = a * other.a + b * other.c;
            self.b = a * other.b + b * other.d;
            self.c = c * other.a + d * other.c;
            self.d = c * other.b + d * other.d;
        }
        self.tx = other.a * tx + other.c * ty + other.tx;
        self.ty = other.d * ty + other.b * tx + other.ty;
    }

    /// In-place inverse. A singular matrix collapses to zero scale instead of producing NaN.
    pub fn invert(&mut self) {
        let (a, b, c, d, tx, ty) = (self.a, self.b, self.c, self.d, self.tx, self.ty);
        if b == 0.0 && c == 0.0 {
            self.b = 0.0;
            self.c = 0.0;
            self.a = if a == 0.0 { 0.0 } else { 1.0 / a };
            self.d = if d == 0.0 { 0.0 } else { 1.0 / d };
            self.tx = -self.a * tx;
            self.ty = -self.d * ty;
            return;
        }

        let det = a * d - b * c;
        if det == 0.0 {
            self.a = 1.0;
            self.b = 0.0;
            self.c = 0.0;
            self.d = 1.0;
            self.tx = -tx;
            self.ty = -ty;
            return;
        }
        let inv = 1.0 / det;
        self.a = d * inv;
        self.b = -b * inv;
        self.c = -c * inv;
        self.d = a * inv;
        self.tx = -(self.a * tx + self.c * ty);
        self.ty = -(self.b * tx + self.d * ty);
    }

    #[inline]
    pub fn inverted(&self) -> Matrix {
        let mut m = *self;
        m.invert();
        m
    }

    #[inline]
    pub fn transform_point(&self, x: f32, y: f32) -> Point {
        Point::new(
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Applies only the linear part (no translation); used for direction vectors.
    #[inline]
    pub fn transform_vector(&self, x: f32, y: f32) -> Point {
        Point::new(self.a * x + self.c * y, self.b * x + self.d * y)
    }

    /// Axis-aligned bounds of the transformed rectangle corners.
    pub fn transform_rectangle(&self, rect: &Rectangle) -> Rectangle {
        let corners = [
            self.transform_point(rect.x, rect.y),
            self.transform_point(rect.x + rect.width, rect.y),
            self.transform_point(rect.x + rect.width, rect.y + rect.height),
            self.transform_point(rect.x, rect.y + rect.height),
        ];
        let mut min = corners[0];
        let mut max = corners[0];
        for p in &corners[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Rectangle::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

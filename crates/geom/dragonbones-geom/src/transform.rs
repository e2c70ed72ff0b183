//! Decomposed 2D transform (translation, rotation, skew, scale).

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::matrix::Matrix;

pub const PI_D: f32 = PI * 2.0;
pub const PI_H: f32 = PI / 2.0;
pub const PI_Q: f32 = PI / 4.0;
pub const RAD_DEG: f32 = 180.0 / PI;
pub const DEG_RAD: f32 = PI / 180.0;

/// Wraps an angle into (-PI, PI].
#[inline]
pub fn normalize_radian(value: f32) -> f32 {
    let mut v = (value + PI) % PI_D;
    if v <= 0.0 {
        v += PI_D;
    }
    v - PI
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    /// Skew of the y axis relative to the x axis, radians.
    pub skew: f32,
    /// Rotation of the x axis, radians.
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        skew: 0.0,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    #[inline]
    pub fn identity(&mut self) {
        *self = Self::IDENTITY;
    }

    /// Zero translation/rotation/skew and zero scale: the neutral element for `add`.
    #[inline]
    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            skew: 0.0,
            rotation: 0.0,
            scale_x: 0.0,
            scale_y: 0.0,
        }
    }

    /// Offsets add, scales multiply.
    pub fn add(&mut self, value: &Transform) -> &mut Self {
        self.x += value.x;
        self.y += value.y;
        self.skew += value.skew;
        self.rotation += value.rotation;
        self.scale_x *= value.scale_x;
        self.scale_y *= value.scale_y;
        self
    }

    pub fn minus(&mut self, value: &Transform) -> &mut Self {
        self.x -= value.x;
        self.y -= value.y;
        self.skew -= value.skew;
        self.rotation -= value.rotation;
        self.scale_x /= value.scale_x;
        self.scale_y /= value.scale_y;
        self
    }

    pub fn to_matrix(&self, matrix: &mut Matrix) {
        if self.rotation == 0.0 {
            matrix.a = 1.0;
            matrix.b = 0.0;
        } else {
            matrix.a = self.rotation.cos();
            matrix.b = self.rotation.sin();
        }

        if self.skew == 0.0 {
            matrix.c = -matrix.b;
            matrix.d = matrix.a;
        } else {
            matrix.c = -(self.skew + self.rotation).sin();
            matrix.d = (self.skew + self.rotation).cos();
        }

        if self.scale_x != 1.0 {
            matrix.a *= self.scale_x;
            matrix.b *= self.scale_x;
        }
        if self.scale_y != 1.0 {
            matrix.c *= self.scale_y;
            matrix.d *= self.scale_y;
        }

        matrix.tx = self.x;
        matrix.ty = self.y;
    }

    pub fn matrix(&self) -> Matrix {
        let mut m = Matrix::IDENTITY;
        self.to_matrix(&mut m);
        m
    }

    /// Decomposes `matrix`. The previous scale signs decide how reflections are attributed.
    pub fn from_matrix(&mut self, matrix: &Matrix) -> &mut Self {
        let backup_scale_x = self.scale_x;
        let backup_scale_y = self.scale_y;

        self.x = matrix.tx;
        self.y = matrix.ty;

        let mut rotation = (matrix.b / matrix.a).atan();
        let mut skew_x = (-matrix.c / matrix.d).atan();
        if !rotation.is_finite() {
            rotation = if matrix.b >= 0.0 { PI_H } else { -PI_H };
        }
        if !skew_x.is_finite() {
            skew_x = if -matrix.c >= 0.0 { PI_H } else { -PI_H };
        }

        self.scale_x = if rotation > -PI_Q && rotation < PI_Q {
            matrix.a / rotation.cos()
        } else {
            matrix.b / rotation.sin()
        };
        self.scale_y = if skew_x > -PI_Q && skew_x < PI_Q {
            matrix.d / skew_x.cos()
        } else {
            -matrix.c / skew_x.sin()
        };

        if backup_scale_x >= 0.0 && self.scale_x < 0.0 {
            self.scale_x = -self.scale_x;
            rotation -= PI;
        }
        if backup_scale_y >= 0.0 && self.scale_y < 0.0 {
            self.scale_y = -self.scale_y;
            skew_x -= PI;
        }

        self.rotation = normalize_radian(rotation);
        self.skew = normalize_radian(skew_x - rotation);
        self
    }
}

use serde::{Deserialize, Serialize};

/// Per-channel multiply-then-offset color adjustment. Offsets are in 0..255 units.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorTransform {
    pub alpha_multiplier: f32,
    pub red_multiplier: f32,
    pub green_multiplier: f32,
    pub blue_multiplier: f32,
    pub alpha_offset: i32,
    pub red_offset: i32,
    pub green_offset: i32,
    pub blue_offset: i32,
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorTransform {
    pub const IDENTITY: ColorTransform = ColorTransform {
        alpha_multiplier: 1.0,
        red_multiplier: 1.0,
        green_multiplier: 1.0,
        blue_multiplier: 1.0,
        alpha_offset: 0,
        red_offset: 0,
        green_offset: 0,
        blue_offset: 0,
    };

    #[inline]
    pub fn identity(&mut self) {
        *self = Self::IDENTITY;
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Componentwise linear blend from `self` toward `to`.
    pub fn lerp(&self, to: &ColorTransform, t: f32) -> ColorTransform {
        let mix_i = |a: i32, b: i32| a + ((b - a) as f32 * t).round() as i32;
        ColorTransform {
            alpha_multiplier: self.alpha_multiplier + (to.alpha_multiplier - self.alpha_multiplier) * t,
            red_multiplier: self.red_multiplier + (to.red_multiplier - self.red_multiplier) * t,
            green_multiplier: self.green_multiplier + (to.green_multiplier - self.green_multiplier) * t,
            blue_multiplier: self.blue_multiplier + (to.blue_multiplier - self.blue_multiplier) * t,
            alpha_offset: mix_i(self.alpha_offset, to.alpha_offset),
            red_offset: mix_i(self.red_offset, to.red_offset),
            green_offset: mix_i(self.green_offset, to.green_offset),
            blue_offset: mix_i(self.blue_offset, to.blue_offset),
        }
    }
}

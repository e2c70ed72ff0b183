//! 2D geometry primitives shared by the skeletal runtime.
//!
//! All types are plain values: cheap to copy, no allocation, no interior state.

pub mod color;
pub mod matrix;
pub mod point;
pub mod rectangle;
pub mod transform;

pub use color::ColorTransform;
pub use matrix::Matrix;
pub use point::Point;
pub use rectangle::Rectangle;
pub use transform::{normalize_radian, Transform, DEG_RAD, PI_D, PI_H, PI_Q, RAD_DEG};

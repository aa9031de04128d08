//! # doodad_math - Spatial Math
//!
//! Position/rotation primitives for world objects and their parent/child
//! transform hierarchy, plus the compact angle encoding used on the wire.

pub mod quaternion;
pub mod transform;
pub mod vector;

pub use quaternion::*;
pub use transform::*;
pub use vector::*;

/// Common math constants
pub mod consts {
    pub const PI: f32 = core::f32::consts::PI;
    pub const TAU: f32 = PI * 2.0;
    pub const DEG_TO_RAD: f32 = PI / 180.0;
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
    pub const EPSILON: f32 = 1e-5;
}

/// Convert degrees to radians
#[inline]
pub fn radians(degrees: f32) -> f32 {
    degrees * consts::DEG_TO_RAD
}

/// Convert radians to degrees
#[inline]
pub fn degrees(radians: f32) -> f32 {
    radians * consts::RAD_TO_DEG
}

/// Wrap an angle into `(-PI, PI]`
#[inline]
pub fn wrap_angle(radians: f32) -> f32 {
    let mut a = radians % consts::TAU;
    if a > consts::PI {
        a -= consts::TAU;
    } else if a <= -consts::PI {
        a += consts::TAU;
    }
    a
}

/// Compact angular encoding: `(-PI, PI]` mapped linearly onto `i16`
#[inline]
pub fn angle_to_short(radians: f32) -> i16 {
    let scaled = wrap_angle(radians) / consts::PI * i16::MAX as f32;
    scaled.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Inverse of [`angle_to_short`]
#[inline]
pub fn short_to_angle(value: i16) -> f32 {
    value as f32 / i16::MAX as f32 * consts::PI
}

pub mod prelude {
    pub use crate::quaternion::Quat;
    pub use crate::transform::Transform;
    pub use crate::vector::Vec3;
    pub use crate::{angle_to_short, degrees, radians, short_to_angle, wrap_angle};
}

//! Rigid transform for world objects

use crate::angle_to_short;
use crate::quaternion::Quat;
use crate::vector::Vec3;

/// Position and rotation of a world object.
///
/// Doodads carry their own uniform scale separately, so transforms here are
/// rigid.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a new transform
    #[inline]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Create from position only
    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Set rotation (builder pattern)
    #[inline]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Compute the inverse transform
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            position: inv_rotation * -self.position,
            rotation: inv_rotation,
        }
    }

    /// Place `child` (expressed relative to `self`) into `self`'s space.
    ///
    /// With `self` a parent's world transform and `child` a local transform,
    /// this yields the child's world transform.
    pub fn combine(&self, child: &Transform) -> Self {
        Self {
            position: self.position + self.rotation * child.position,
            rotation: (self.rotation * child.rotation).normalize(),
        }
    }

    /// Express `world` relative to `self`. Inverse of [`Transform::combine`].
    pub fn relative(&self, world: &Transform) -> Self {
        self.inverse().combine(world)
    }

    /// Rotation as (roll, pitch, yaw) radians
    pub fn roll_pitch_yaw(&self) -> (f32, f32, f32) {
        self.rotation.to_roll_pitch_yaw()
    }

    /// Rotation as compact (roll, pitch, yaw) shorts
    pub fn roll_pitch_yaw_shorts(&self) -> (i16, i16, i16) {
        let (roll, pitch, yaw) = self.roll_pitch_yaw();
        (angle_to_short(roll), angle_to_short(pitch), angle_to_short(yaw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::FRAC_PI_2;

    #[test]
    fn test_combine_with_rotated_parent() {
        let parent = Transform::new(Vec3::new(10.0, 0.0, 0.0), Quat::from_yaw(FRAC_PI_2));
        let local = Transform::from_position(Vec3::new(1.0, 0.0, 2.0));

        let world = parent.combine(&local);
        assert!((world.position - Vec3::new(10.0, 1.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_relative_inverts_combine() {
        let parent = Transform::new(Vec3::new(3.0, 4.0, 5.0), Quat::from_yaw(0.7));
        let local = Transform::new(Vec3::new(-1.0, 2.0, 0.5), Quat::from_yaw(0.2));

        let world = parent.combine(&local);
        let back = parent.relative(&world);

        assert!((back.position - local.position).length() < 1e-4);
        assert!(back.rotation.dot(local.rotation).abs() > 0.9999);
    }

    #[test]
    fn test_shorts() {
        let t = Transform::IDENTITY.with_rotation(Quat::from_yaw(1.0));
        let (roll, pitch, yaw) = t.roll_pitch_yaw_shorts();
        assert_eq!(roll, 0);
        assert_eq!(pitch, 0);
        // 1 rad / PI * 32767
        assert_eq!(yaw, 10430);
    }
}

//! Rigid transforms for camera poses.

use glam::{Mat4, Quat, Vec3};
use std::ops::Mul;

/// A rigid transform: rotation followed by translation.
///
/// Camera poses map camera-space points into world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub fn new(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation: rotation.normalize(),
            translation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            translation,
        }
    }

    /// Build from a position and an `(x, y, z, w)` quaternion.
    pub fn from_arrays(position: [f32; 3], rotation: [f32; 4]) -> Self {
        Self::new(Quat::from_array(rotation), Vec3::from_array(position))
    }

    /// Camera at `eye` looking at `target` with +Y up (camera looks down -Z).
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        Self::new(rotation, eye)
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Euclidean distance between the two origins.
    pub fn distance_to(&self, other: &Transform) -> f32 {
        self.translation.distance(other.translation)
    }

    /// Rotation angle between the two orientations, in radians.
    pub fn angle_to(&self, other: &Transform) -> f32 {
        self.rotation.angle_between(other.rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            rotation: (self.rotation * rhs.rotation).normalize(),
            translation: self.rotation * rhs.translation + self.translation,
        }
    }
}

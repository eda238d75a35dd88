//! Pinhole camera intrinsics.
//!
//! Coordinates are right-handed with +Y up and the camera looking down -Z,
//! expressed in meters. Pixel rows grow downwards.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Calibration of the left (reference) camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParameters {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub width: u32,
    pub height: u32,
}

impl CameraParameters {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            width,
            height,
        }
    }

    /// Ideal pinhole with the principal point at the image center.
    pub fn from_horizontal_fov(width: u32, height: u32, fov_degrees: f32) -> Self {
        let half = (fov_degrees.to_radians() * 0.5).tan();
        let f = width as f32 * 0.5 / half;
        Self::new(f, f, width as f32 * 0.5, height as f32 * 0.5, width, height)
    }

    /// Lift pixel `(u, v)` observed at `depth` meters into camera space.
    pub fn unproject(&self, u: f32, v: f32, depth: f32) -> Vec3 {
        Vec3::new(
            (u - self.cx) * depth / self.fx,
            -(v - self.cy) * depth / self.fy,
            -depth,
        )
    }

    /// Project a camera-space point to a pixel, returning it with its depth.
    ///
    /// Points behind the camera yield `None`.
    pub fn project(&self, point: Vec3) -> Option<(Vec2, f32)> {
        let depth = -point.z;
        if depth <= f32::EPSILON {
            return None;
        }
        let u = point.x * self.fx / depth + self.cx;
        let v = -point.y * self.fy / depth + self.cy;
        Some((Vec2::new(u, v), depth))
    }

    /// Whether a pixel lies inside the image.
    pub fn contains(&self, pixel: Vec2) -> bool {
        pixel.x >= 0.0
            && pixel.y >= 0.0
            && pixel.x < self.width as f32
            && pixel.y < self.height as f32
    }

    /// Rescale the intrinsics to another image size.
    pub fn scaled(&self, width: u32, height: u32) -> Self {
        let sx = width as f32 / self.width as f32;
        let sy = height as f32 / self.height as f32;
        Self::new(
            self.fx * sx,
            self.fy * sy,
            self.cx * sx,
            self.cy * sy,
            width,
            height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_pixel_is_on_optical_axis() {
        let cam = CameraParameters::from_horizontal_fov(640, 480, 90.0);
        let p = cam.unproject(320.0, 240.0, 2.0);
        assert!((p - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_project_recovers_pixel() {
        let cam = CameraParameters::new(500.0, 500.0, 320.0, 240.0, 640, 480);
        let p = cam.unproject(100.0, 50.0, 1.5);
        let (pixel, depth) = cam.project(p).unwrap();
        assert!((pixel - Vec2::new(100.0, 50.0)).length() < 1e-3);
        assert!((depth - 1.5).abs() < 1e-5);
        assert!(cam.contains(pixel));
    }

    #[test]
    fn test_project_behind_camera() {
        let cam = CameraParameters::from_horizontal_fov(640, 480, 90.0);
        assert!(cam.project(Vec3::new(0.0, 0.0, 1.0)).is_none());
    }

    #[test]
    fn test_scaled_halves_focal_length() {
        let cam = CameraParameters::new(1000.0, 1000.0, 960.0, 540.0, 1920, 1080);
        let half = cam.scaled(960, 540);
        assert_eq!(half.fx, 500.0);
        assert_eq!(half.cy, 270.0);
        assert_eq!(half.width, 960);
    }
}

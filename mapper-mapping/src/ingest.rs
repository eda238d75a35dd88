//! Depth back-projection into world-space colored points.

use glam::Vec3;
use mapper_data::{CameraParameters, Frame};

/// A colored point in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub position: Vec3,
    pub color: [u8; 3],
}

impl Point {
    pub fn new(position: Vec3, color: [u8; 3]) -> Self {
        Self { position, color }
    }
}

/// Lift every `stride`-th depth pixel of `frame` into world space.
///
/// Pixels without depth or farther than `range` meters are skipped. The
/// calibration is rescaled when the depth map has a different size, and
/// colors are sampled from the image at the matching location.
pub fn backproject(
    frame: &Frame,
    calibration: &CameraParameters,
    range: f32,
    stride: u32,
) -> Vec<Point> {
    let Some(depth) = frame.depth.as_ref() else {
        return Vec::new();
    };
    let (dw, dh) = depth.dimensions();
    let (iw, ih) = frame.dimensions();
    if dw == 0 || dh == 0 || iw == 0 || ih == 0 {
        return Vec::new();
    }

    let calib = if (calibration.width, calibration.height) == (dw, dh) {
        *calibration
    } else {
        calibration.scaled(dw, dh)
    };
    let stride = stride.max(1);
    let mut points = Vec::with_capacity(((dw / stride) * (dh / stride)) as usize);

    for v in (0..dh).step_by(stride as usize) {
        for u in (0..dw).step_by(stride as usize) {
            let Some(d) = depth.get(u, v) else {
                continue;
            };
            if d > range {
                continue;
            }
            let camera = calib.unproject(u as f32 + 0.5, v as f32 + 0.5, d);
            let ix = (u as u64 * iw as u64 / dw as u64) as u32;
            let iy = (v as u64 * ih as u64 / dh as u64) as u32;
            let color = frame.image.get_pixel(ix.min(iw - 1), iy.min(ih - 1)).0;
            points.push(Point::new(frame.pose.transform_point(camera), color));
        }
    }
    points
}

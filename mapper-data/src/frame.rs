//! Camera frames: image, optional depth and the pose they were taken from.

use crate::transform::Transform;
use crate::types::TrackingState;
use image::{ImageBuffer, Luma, RgbImage};

/// Per-pixel depth in meters. `0.0` marks a missing measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthMap {
    /// Wrap raw row-major samples. Returns `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, depth: f32) -> Self {
        Self {
            width,
            height,
            data: vec![depth; (width as usize) * (height as usize)],
        }
    }

    /// Convert a 16-bit depth image where each unit is `scale` meters.
    pub fn from_luma16(image: &ImageBuffer<Luma<u16>, Vec<u16>>, scale: f32) -> Self {
        let (width, height) = image.dimensions();
        let data = image.pixels().map(|p| p.0[0] as f32 * scale).collect();
        Self {
            width,
            height,
            data,
        }
    }

    /// Valid depth at `(x, y)`, or `None` if out of bounds or not measured.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let d = self.data[(y as usize) * (self.width as usize) + x as usize];
        (d.is_finite() && d > 0.0).then_some(d)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|d| d.is_finite() && **d > 0.0).count()
    }
}

/// One grabbed sample: left image, optional depth and the tracked pose.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub depth: Option<DepthMap>,
    /// Camera-to-world pose.
    pub pose: Transform,
    pub tracking_state: TrackingState,
    /// Seconds since the source was opened.
    pub timestamp: f64,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        image: RgbImage,
        pose: Transform,
        tracking_state: TrackingState,
        timestamp: f64,
        frame_number: u64,
    ) -> Self {
        Self {
            image,
            depth: None,
            pose,
            tracking_state,
            timestamp,
            frame_number,
        }
    }

    pub fn with_depth(mut self, depth: DepthMap) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Image dimensions (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

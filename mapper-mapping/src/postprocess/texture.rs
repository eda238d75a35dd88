//! Texture projection from keyframes recorded during mapping.

use crate::engine::{MappingError, TextureReport};
use image::RgbImage;
use mapper_data::{CameraParameters, Frame, IncrementalMap, TextureFormat, Transform};
use tracing::{debug, info};

/// Minimum camera motion between two stored keyframes.
const MIN_KEYFRAME_TRANSLATION: f32 = 0.1;
const MIN_KEYFRAME_ROTATION_DEGREES: f32 = 10.0;
const MAX_KEYFRAMES: usize = 64;

/// An image kept for texturing, with the pose it was taken from.
#[derive(Debug, Clone)]
pub struct Keyframe {
    pub image: RgbImage,
    pub pose: Transform,
    camera_from_world: Transform,
}

impl Keyframe {
    pub fn new(image: RgbImage, pose: Transform) -> Self {
        Self {
            image,
            pose,
            camera_from_world: pose.inverse(),
        }
    }
}

/// Keyframes collected during one mapping session.
#[derive(Debug, Clone)]
pub struct KeyframeStore {
    calibration: CameraParameters,
    keyframes: Vec<Keyframe>,
    capacity: usize,
}

impl KeyframeStore {
    pub fn new(calibration: CameraParameters) -> Self {
        Self {
            calibration,
            keyframes: Vec::new(),
            capacity: MAX_KEYFRAMES,
        }
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn clear(&mut self) {
        self.keyframes.clear();
    }

    /// Store `frame` if the camera moved enough since the last keyframe.
    pub fn consider(&mut self, frame: &Frame) -> bool {
        if self.keyframes.len() >= self.capacity {
            return false;
        }
        let far_enough = match self.keyframes.last() {
            None => true,
            Some(last) => {
                last.pose.distance_to(&frame.pose) >= MIN_KEYFRAME_TRANSLATION
                    || last.pose.angle_to(&frame.pose).to_degrees() >= MIN_KEYFRAME_ROTATION_DEGREES
            }
        };
        if !far_enough {
            return false;
        }

        self.keyframes
            .push(Keyframe::new(frame.image.clone(), frame.pose));
        debug!(
            "Stored texture keyframe {} (frame {})",
            self.keyframes.len(),
            frame.frame_number
        );
        if self.keyframes.len() == self.capacity {
            info!("Texture keyframe limit ({}) reached", self.capacity);
        }
        true
    }

    /// Color every vertex of `map` from the nearest keyframe that sees it.
    ///
    /// Occlusion is not tested; the closest viewing camera wins.
    pub fn apply(
        &self,
        map: &mut IncrementalMap,
        format: TextureFormat,
    ) -> Result<TextureReport, MappingError> {
        if self.keyframes.is_empty() {
            return Err(MappingError::NoTextureData);
        }

        let mut report = TextureReport {
            keyframes: self.keyframes.len(),
            ..TextureReport::default()
        };

        for (_, chunk) in map.chunks_mut() {
            for (vertex, color) in chunk.vertices.iter().zip(chunk.colors.iter_mut()) {
                match self.sample(*vertex) {
                    Some(rgb) => {
                        *color = [rgb[0], rgb[1], rgb[2], 255];
                        report.textured_vertices += 1;
                    }
                    None => {
                        color[3] = match format {
                            TextureFormat::Rgba => 0,
                            TextureFormat::Rgb => 255,
                        };
                        report.unseen_vertices += 1;
                    }
                }
            }
            chunk.updated = true;
        }

        map.set_textured(true);
        info!(
            "Applied texture from {} keyframes: {} vertices textured, {} unseen",
            report.keyframes, report.textured_vertices, report.unseen_vertices
        );
        Ok(report)
    }

    fn sample(&self, world: glam::Vec3) -> Option<[u8; 3]> {
        let mut best: Option<(f32, [u8; 3])> = None;
        for keyframe in &self.keyframes {
            let (w, h) = keyframe.image.dimensions();
            let calib = if (self.calibration.width, self.calibration.height) == (w, h) {
                self.calibration
            } else {
                self.calibration.scaled(w, h)
            };
            let Some((pixel, depth)) =
                calib.project(keyframe.camera_from_world.transform_point(world))
            else {
                continue;
            };
            if !calib.contains(pixel) || best.is_some_and(|(d, _)| d <= depth) {
                continue;
            }
            let rgb = keyframe.image.get_pixel(pixel.x as u32, pixel.y as u32).0;
            best = Some((depth, rgb));
        }
        best.map(|(_, rgb)| rgb)
    }
}

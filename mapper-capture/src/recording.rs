//! Playback of recorded sequences.
//!
//! A recording is a directory holding `sequence.json` plus the images it
//! references:
//!
//! ```json
//! {
//!   "calibration": { "fx": 525.0, "fy": 525.0, "cx": 319.5, "cy": 239.5,
//!                    "width": 640, "height": 480 },
//!   "depth_scale": 0.001,
//!   "fps": 30.0,
//!   "frames": [
//!     { "timestamp": 0.0, "image": "rgb/000000.png", "depth": "depth/000000.png",
//!       "position": [0, 0, 0], "rotation": [0, 0, 0, 1], "tracking": "ok" }
//!   ]
//! }
//! ```
//!
//! Depth images are single-channel 16-bit PNGs; each unit is `depth_scale`
//! meters.

use crate::source::{CaptureError, FrameSource};
use crate::tracking::PoseTracker;
use mapper_data::{CameraParameters, DepthMap, Frame, TrackingState, Transform};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MANIFEST_NAME: &str = "sequence.json";

fn default_depth_scale() -> f32 {
    0.001
}

fn default_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn default_tracking() -> TrackingState {
    TrackingState::Ok
}

/// One entry of a recording manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp: f64,
    /// RGB image, relative to the recording directory.
    pub image: PathBuf,
    #[serde(default)]
    pub depth: Option<PathBuf>,
    #[serde(default)]
    pub position: [f32; 3],
    /// Quaternion (x, y, z, w).
    #[serde(default = "default_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "default_tracking")]
    pub tracking: TrackingState,
}

/// Contents of `sequence.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingManifest {
    pub calibration: CameraParameters,
    #[serde(default = "default_depth_scale")]
    pub depth_scale: f32,
    #[serde(default)]
    pub fps: Option<f32>,
    pub frames: Vec<RecordedFrame>,
}

/// Frame source replaying a recorded sequence once.
pub struct RecordingSource {
    root: PathBuf,
    manifest: RecordingManifest,
    tracker: PoseTracker,
    cursor: usize,
    active: bool,
}

impl RecordingSource {
    /// Open a recording directory, or a manifest file directly.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let (root, manifest_path) = if path.is_dir() {
            (path.to_path_buf(), path.join(MANIFEST_NAME))
        } else {
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (root, path.to_path_buf())
        };

        let file = File::open(&manifest_path).map_err(|e| {
            CaptureError::OpenFailed(format!("{}: {}", manifest_path.display(), e))
        })?;
        let manifest: RecordingManifest = serde_json::from_reader(BufReader::new(file))?;

        if manifest.frames.is_empty() {
            return Err(CaptureError::InvalidRecording(
                "recording contains no frames".to_string(),
            ));
        }
        if !(manifest.depth_scale > 0.0) {
            return Err(CaptureError::InvalidRecording(format!(
                "depth_scale must be positive, got {}",
                manifest.depth_scale
            )));
        }

        info!(
            "Recording opened: {} frames, {}x{}",
            manifest.frames.len(),
            manifest.calibration.width,
            manifest.calibration.height
        );

        Ok(Self {
            root,
            manifest,
            // Recorded poses were already tracked; no search phase.
            tracker: PoseTracker::new(0),
            cursor: 0,
            active: true,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.manifest.frames.len()
    }

    fn load(&self, entry: &RecordedFrame) -> Result<(image::RgbImage, Option<DepthMap>), CaptureError> {
        let image = image::open(self.root.join(&entry.image))?.to_rgb8();
        let depth = match &entry.depth {
            Some(rel) => {
                let raw = image::open(self.root.join(rel))?.to_luma16();
                Some(DepthMap::from_luma16(&raw, self.manifest.depth_scale))
            }
            None => None,
        };
        Ok((image, depth))
    }
}

impl FrameSource for RecordingSource {
    fn pull(&mut self) -> Result<Option<Frame>, CaptureError> {
        if !self.active {
            return Ok(None);
        }
        let Some(entry) = self.manifest.frames.get(self.cursor).cloned() else {
            info!("End of recording after {} frames", self.cursor);
            self.active = false;
            return Ok(None);
        };
        let frame_number = self.cursor as u64;
        self.cursor += 1;

        let (image, depth) = self.load(&entry)?;
        let raw = Transform::from_arrays(entry.position, entry.rotation);
        let (pose, tracking_state) = self.tracker.track(raw, entry.tracking);

        debug!("Replayed frame {} at {:.3}s", frame_number, entry.timestamp);

        let frame = Frame::new(image, pose, tracking_state, entry.timestamp, frame_number);
        Ok(Some(match depth {
            Some(depth) => frame.with_depth(depth),
            None => frame,
        }))
    }

    fn calibration(&self) -> CameraParameters {
        self.manifest.calibration
    }

    fn enable_pose_tracking(&mut self) -> Result<(), CaptureError> {
        self.tracker.enable();
        Ok(())
    }

    fn disable_pose_tracking(&mut self) {
        self.tracker.disable();
    }

    fn reset_pose(&mut self, transform: Transform) {
        self.tracker.reset(transform);
    }

    fn frame_rate(&self) -> Option<f32> {
        self.manifest.fps
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn close(&mut self) {
        if self.active {
            info!("Recording closed at frame {}", self.cursor);
        }
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, RgbImage};

    fn write_recording(dir: &Path, frames: usize) {
        let mut entries = Vec::new();
        for i in 0..frames {
            let rgb = format!("rgb_{i}.png");
            let depth = format!("depth_{i}.png");
            RgbImage::from_pixel(4, 3, image::Rgb([200, 10, 10]))
                .save(dir.join(&rgb))
                .unwrap();
            ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(4, 3, Luma([1200]))
                .save(dir.join(&depth))
                .unwrap();
            entries.push(RecordedFrame {
                timestamp: i as f64 / 30.0,
                image: rgb.into(),
                depth: Some(depth.into()),
                position: [i as f32 * 0.1, 0.0, 0.0],
                rotation: [0.0, 0.0, 0.0, 1.0],
                tracking: TrackingState::Ok,
            });
        }
        let manifest = RecordingManifest {
            calibration: CameraParameters::from_horizontal_fov(4, 3, 60.0),
            depth_scale: 0.001,
            fps: Some(30.0),
            frames: entries,
        };
        let file = File::create(dir.join(MANIFEST_NAME)).unwrap();
        serde_json::to_writer_pretty(file, &manifest).unwrap();
    }

    #[test]
    fn test_replays_frames_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        write_recording(dir.path(), 2);

        let mut source = RecordingSource::open(dir.path()).unwrap();
        source.enable_pose_tracking().unwrap();
        assert_eq!(source.frame_count(), 2);

        let first = source.pull().unwrap().unwrap();
        assert_eq!(first.tracking_state, TrackingState::Ok);
        assert_eq!(first.dimensions(), (4, 3));
        let depth = first.depth.as_ref().unwrap();
        assert!((depth.get(0, 0).unwrap() - 1.2).abs() < 1e-6);

        let second = source.pull().unwrap().unwrap();
        assert!((second.pose.translation.x - 0.1).abs() < 1e-6);

        assert!(source.pull().unwrap().is_none());
        assert!(!source.is_active());
    }

    #[test]
    fn test_tracking_off_until_enabled() {
        let dir = tempfile::tempdir().unwrap();
        write_recording(dir.path(), 1);
        let mut source = RecordingSource::open(&dir.path().join(MANIFEST_NAME)).unwrap();
        let frame = source.pull().unwrap().unwrap();
        assert_eq!(frame.tracking_state, TrackingState::Off);
    }

    #[test]
    fn test_empty_recording_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = r#"{"calibration":{"fx":1,"fy":1,"cx":0,"cy":0,"width":1,"height":1},"frames":[]}"#;
        std::fs::write(dir.path().join(MANIFEST_NAME), manifest).unwrap();
        assert!(matches!(
            RecordingSource::open(dir.path()),
            Err(CaptureError::InvalidRecording(_))
        ));
    }

    #[test]
    fn test_missing_image_is_a_frame_error() {
        let dir = tempfile::tempdir().unwrap();
        write_recording(dir.path(), 1);
        std::fs::remove_file(dir.path().join("rgb_0.png")).unwrap();
        let mut source = RecordingSource::open(dir.path()).unwrap();
        assert!(source.pull().is_err());
        // The broken frame is skipped; the recording then ends normally.
        assert!(source.pull().unwrap().is_none());
    }
}

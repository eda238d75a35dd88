//! Webcam capture using nokhwa.
//!
//! Webcams deliver color only. Frames carry no depth and the tracker never
//! gets past `Searching`, so the mapper can preview but not reconstruct.

use crate::source::{CaptureError, FrameSource};
use crate::tracking::PoseTracker;
use image::RgbImage;
use mapper_data::{CameraParameters, Frame, TrackingState, Transform};
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use std::time::Instant;
use tracing::{debug, info};

/// Assumed horizontal field of view for uncalibrated webcams.
const DEFAULT_FOV_DEGREES: f32 = 70.0;

/// Webcam frame source.
pub struct WebcamCapture {
    camera: Camera,
    calibration: CameraParameters,
    tracker: PoseTracker,
    start_time: Instant,
    frame_count: u64,
    active: bool,
}

impl WebcamCapture {
    /// Open webcam `index` as close as possible to `width`x`height`.
    pub fn with_resolution(index: u32, width: u32, height: u32) -> Result<Self, CaptureError> {
        info!("Opening webcam {} at {}x{}", index, width, height);

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
            Resolution::new(width, height),
        ));
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| CaptureError::OpenFailed(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::OpenFailed(e.to_string()))?;

        let resolution = camera.resolution();
        info!(
            "Webcam opened: {}x{} @ {} fps",
            resolution.width(),
            resolution.height(),
            camera.frame_rate()
        );

        Ok(Self {
            calibration: CameraParameters::from_horizontal_fov(
                resolution.width(),
                resolution.height(),
                DEFAULT_FOV_DEGREES,
            ),
            camera,
            tracker: PoseTracker::default(),
            start_time: Instant::now(),
            frame_count: 0,
            active: true,
        })
    }

    /// List available webcam devices.
    pub fn list_devices() -> Result<Vec<String>, CaptureError> {
        let devices = nokhwa::query(nokhwa::utils::ApiBackend::Auto)
            .map_err(|e| CaptureError::DeviceNotFound(e.to_string()))?;

        Ok(devices
            .into_iter()
            .map(|info| format!("{}: {}", info.index(), info.human_name()))
            .collect())
    }
}

impl FrameSource for WebcamCapture {
    fn pull(&mut self) -> Result<Option<Frame>, CaptureError> {
        if !self.active {
            return Ok(None);
        }

        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

        let timestamp = self.start_time.elapsed().as_secs_f64();
        let frame_number = self.frame_count;
        self.frame_count += 1;
        debug!("Captured frame {} at {:.3}s", frame_number, timestamp);

        let (width, height) = (decoded.width(), decoded.height());
        let image = RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| CaptureError::CaptureFailed("Failed to create RGB image".to_string()))?;

        let (pose, tracking_state) = self
            .tracker
            .track(Transform::IDENTITY, TrackingState::Searching);
        Ok(Some(Frame::new(
            image,
            pose,
            tracking_state,
            timestamp,
            frame_number,
        )))
    }

    fn calibration(&self) -> CameraParameters {
        self.calibration
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
        Some(self.camera.frame_rate() as f32)
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn close(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(e) = self.camera.stop_stream() {
            debug!("Stopping webcam stream failed: {}", e);
        }
        info!("Webcam capture stopped after {} frames", self.frame_count);
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.close();
    }
}

//! Common frame source types and the source factory.

use mapper_data::{CameraParameters, Frame, Transform};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::recording::RecordingSource;
use crate::synthetic::{SyntheticConfig, SyntheticSource};

/// Errors that can occur during capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open source: {0}")]
    OpenFailed(String),

    #[error("Failed to capture frame: {0}")]
    CaptureFailed(String),

    #[error("Positional tracking unavailable: {0}")]
    TrackingUnavailable(String),

    #[error("Invalid recording: {0}")]
    InvalidRecording(String),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A camera or recording producing posed frames.
///
/// Sources are opened by their constructors (or [`open_source`]); a
/// successfully constructed source is ready to [`pull`](Self::pull).
pub trait FrameSource {
    /// Grab the next frame.
    ///
    /// `Ok(None)` means no frame is ready, e.g. the recording ended.
    fn pull(&mut self) -> Result<Option<Frame>, CaptureError>;

    /// Intrinsics of the camera the frames are taken with.
    fn calibration(&self) -> CameraParameters;

    fn enable_pose_tracking(&mut self) -> Result<(), CaptureError>;

    fn disable_pose_tracking(&mut self);

    /// Re-anchor tracking so the current camera pose becomes `transform`.
    fn reset_pose(&mut self, transform: Transform);

    /// Frame rate, if known. Paces the loop once the source has run dry.
    fn frame_rate(&self) -> Option<f32>;

    /// Whether the source can still produce frames.
    fn is_active(&self) -> bool;

    /// Release the device or file. Further pulls return `Ok(None)`.
    fn close(&mut self);
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn pull(&mut self) -> Result<Option<Frame>, CaptureError> {
        (**self).pull()
    }

    fn calibration(&self) -> CameraParameters {
        (**self).calibration()
    }

    fn enable_pose_tracking(&mut self) -> Result<(), CaptureError> {
        (**self).enable_pose_tracking()
    }

    fn disable_pose_tracking(&mut self) {
        (**self).disable_pose_tracking()
    }

    fn reset_pose(&mut self, transform: Transform) {
        (**self).reset_pose(transform)
    }

    fn frame_rate(&self) -> Option<f32> {
        (**self).frame_rate()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Capture resolution presets for live cameras.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraResolution {
    Hd2k,
    #[default]
    Hd1080,
    Hd720,
    Vga,
}

impl CameraResolution {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            CameraResolution::Hd2k => (2208, 1242),
            CameraResolution::Hd1080 => (1920, 1080),
            CameraResolution::Hd720 => (1280, 720),
            CameraResolution::Vga => (672, 376),
        }
    }
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// Live camera by device index.
    Live { device: u32 },
    /// Pre-recorded sequence directory or manifest file.
    Recording(PathBuf),
    /// Procedurally rendered room.
    Synthetic,
}

/// Parameters used to open a frame source.
#[derive(Debug, Clone, PartialEq)]
pub struct InitConfig {
    pub input: InputSource,
    pub resolution: CameraResolution,
    /// Synthetic frames are rendered at the preset size divided by this.
    pub synthetic_downscale: u32,
    /// Pace synthetic frames to their nominal frame rate.
    pub realtime: bool,
}

impl InitConfig {
    pub fn live(device: u32) -> Self {
        Self {
            input: InputSource::Live { device },
            ..Self::default()
        }
    }

    pub fn recording(path: impl Into<PathBuf>) -> Self {
        Self {
            input: InputSource::Recording(path.into()),
            ..Self::default()
        }
    }

    pub fn synthetic() -> Self {
        Self {
            input: InputSource::Synthetic,
            ..Self::default()
        }
    }

    pub fn with_resolution(mut self, resolution: CameraResolution) -> Self {
        self.resolution = resolution;
        self
    }
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            input: InputSource::Live { device: 0 },
            resolution: CameraResolution::Hd1080,
            synthetic_downscale: 8,
            realtime: true,
        }
    }
}

/// Open the source described by `config`.
pub fn open_source(config: &InitConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    match &config.input {
        InputSource::Recording(path) => {
            info!("Using recording: {}", path.display());
            Ok(Box::new(RecordingSource::open(path)?))
        }
        InputSource::Synthetic => {
            let (w, h) = config.resolution.dimensions();
            let scale = config.synthetic_downscale.max(1);
            let synthetic = SyntheticConfig {
                width: w / scale,
                height: h / scale,
                realtime: config.realtime,
                ..SyntheticConfig::default()
            };
            info!(
                "Using synthetic room at {}x{}",
                synthetic.width, synthetic.height
            );
            Ok(Box::new(SyntheticSource::new(synthetic)))
        }
        InputSource::Live { device } => open_live(*device, config.resolution),
    }
}

#[cfg(feature = "webcam")]
fn open_live(
    device: u32,
    resolution: CameraResolution,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    let (w, h) = resolution.dimensions();
    Ok(Box::new(crate::webcam::WebcamCapture::with_resolution(
        device, w, h,
    )?))
}

#[cfg(not(feature = "webcam"))]
fn open_live(
    device: u32,
    _resolution: CameraResolution,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::DeviceNotFound(format!(
        "camera {} (built without the `webcam` feature)",
        device
    )))
}

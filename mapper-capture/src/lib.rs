//! Mapper Capture - frame sources for the spatial mapper
//!
//! Every source implements [`FrameSource`]: it yields timestamped frames
//! carrying an image, optional depth and a tracked camera pose.
//!
//! - Recorded sequences (directory with a JSON manifest, RGB and depth PNGs)
//! - A procedural room rendered on the CPU, for running without hardware
//! - Webcams (via nokhwa, requires `webcam` feature, RGB only)
//!
//! ## Example
//!
//! ```ignore
//! use mapper_capture::{InitConfig, open_source};
//!
//! let mut source = open_source(&InitConfig::synthetic())?;
//! source.enable_pose_tracking()?;
//! while let Some(frame) = source.pull()? {
//!     // Process frame...
//! }
//! ```

mod recording;
mod source;
mod synthetic;
mod tracking;

#[cfg(feature = "webcam")]
mod webcam;

pub use recording::{RecordedFrame, RecordingManifest, RecordingSource};
pub use source::{CameraResolution, CaptureError, FrameSource, InitConfig, InputSource, open_source};
pub use synthetic::{SyntheticConfig, SyntheticSource};
pub use tracking::PoseTracker;

#[cfg(feature = "webcam")]
pub use webcam::WebcamCapture;

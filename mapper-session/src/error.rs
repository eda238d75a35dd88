//! Startup errors of a mapping session.

use crate::config::ConfigError;
use mapper_capture::CaptureError;
use thiserror::Error;

/// Failures that prevent a session from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to open frame source: {0}")]
    OpenSource(#[source] CaptureError),

    #[error("Failed to enable positional tracking: {0}")]
    EnableTracking(#[source] CaptureError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

//! Mapper Session - the control loop of the spatial mapper
//!
//! A [`SessionController`] owns one [`Session`] and one map. Each tick it
//! pulls a frame from a [`FrameSource`](mapper_capture::FrameSource), feeds
//! a [`MappingEngine`](mapper_mapping::MappingEngine) while mapping is
//! active, requests and retrieves asynchronous map updates at a bounded
//! rate, and hands the frame to a [`DisplaySink`]. Toggling mapping off
//! extracts the whole map, post-processes it and exports it through
//! [`Persistence`].
//!
//! ## Example
//!
//! ```ignore
//! use mapper_session::{FileExporter, SessionConfig, SessionController, SystemClock};
//!
//! let mut controller = SessionController::start(
//!     source, engine, display, FileExporter, SystemClock::new(), SessionConfig::default(),
//! )?;
//! let stats = controller.run();
//! ```

pub mod clock;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod gate;
pub mod persistence;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DEFAULT_OUTPUT_PATH, SessionConfig};
pub use controller::{SessionController, TickOutcome};
pub use display::{DisplaySink, RenderState};
pub use error::StartupError;
pub use gate::PeriodicGate;
pub use persistence::{FileExporter, Persistence};
pub use session::{Phase, Session, SessionStats};

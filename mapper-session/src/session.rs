//! State carried through a mapping run.

use crate::config::SessionConfig;
use mapper_data::{MapType, MappingParameters, MappingState, TrackingState};
use std::fmt;

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Created but not started.
    #[default]
    Idle,
    /// Tracking the camera without mapping.
    Capturing,
    Mapping,
    /// Extracting, post-processing and exporting the map.
    Finalizing,
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "IDLE",
            Phase::Capturing => "CAPTURING",
            Phase::Mapping => "MAPPING",
            Phase::Finalizing => "FINALIZING",
            Phase::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// Counters collected over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u64,
    /// Ticks without a frame.
    pub skipped_ticks: u64,
    pub requests: u64,
    pub retrievals: u64,
    pub finalizes: u64,
    pub export_failures: u64,
}

/// The controller's mutable state.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub phase: Phase,
    /// Set between a successful enable and the matching finalize.
    pub mapping_active: bool,
    pub mapping_state: MappingState,
    pub tracking_state: TrackingState,
    /// Clock time of the last update request. Only moves forward.
    pub last_request_time: f64,
    pub update_period_seconds: f64,
    pub request_interval_seconds: f64,
    pub resolution_meters: f32,
    pub range_meters: f32,
    pub save_texture: bool,
    pub map_type: MapType,
    pub stats: SessionStats,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            phase: Phase::Idle,
            mapping_active: false,
            mapping_state: MappingState::NotEnabled,
            tracking_state: TrackingState::Off,
            last_request_time: 0.0,
            update_period_seconds: config.update_period_seconds,
            request_interval_seconds: config.request_interval_seconds,
            resolution_meters: config.mapping.resolution_meters,
            range_meters: config.mapping.range_meters,
            save_texture: config.mapping.save_texture,
            map_type: config.mapping.map_type,
            stats: SessionStats::default(),
        }
    }

    /// Fresh parameters for the next enable, based on `template`.
    pub fn mapping_parameters(&self, template: &MappingParameters) -> MappingParameters {
        MappingParameters {
            resolution_meters: self.resolution_meters,
            range_meters: self.range_meters,
            save_texture: self.save_texture,
            map_type: self.map_type,
            ..*template
        }
    }
}

//! Tracking, mapping and parameter types shared across the mapper crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Positional tracking quality reported with every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    /// Pose tracking is disabled.
    #[default]
    Off,
    /// Tracking is enabled but has not locked onto the scene yet.
    Searching,
    /// Tracking is locked; poses are reliable.
    Ok,
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackingState::Off => "OFF",
            TrackingState::Searching => "SEARCHING",
            TrackingState::Ok => "OK",
        };
        f.write_str(s)
    }
}

/// State of the mapping engine as seen from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingState {
    #[default]
    NotEnabled,
    /// Enabled, no data integrated yet.
    Initializing,
    Running,
    /// Memory budget exhausted; new data is dropped.
    NotEnoughMemory,
}

impl fmt::Display for MappingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingState::NotEnabled => "NOT_ENABLED",
            MappingState::Initializing => "INITIALIZING",
            MappingState::Running => "RUNNING",
            MappingState::NotEnoughMemory => "NOT_ENOUGH_MEMORY",
        };
        f.write_str(s)
    }
}

/// Kind of map the engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapType {
    /// Triangulated surface.
    #[default]
    Mesh,
    /// Fused, colored points without connectivity.
    FusedPointCloud,
}

/// Strength of the mesh cleanup pass applied on finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshFilter {
    Low,
    #[default]
    Medium,
    High,
}

impl MeshFilter {
    /// Connected components with fewer triangles than this are dropped.
    pub fn min_component_triangles(self) -> usize {
        match self {
            MeshFilter::Low => 2,
            MeshFilter::Medium => 8,
            MeshFilter::High => 24,
        }
    }

    /// Number of Laplacian smoothing passes.
    pub fn smoothing_passes(self) -> usize {
        match self {
            MeshFilter::High => 1,
            _ => 0,
        }
    }
}

/// Color layout written by the texture pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    Rgb,
    #[default]
    Rgba,
}

/// Rejected mapping parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("Resolution must be in (0, {max}] meters, got {value}")]
    Resolution { value: f32, max: f32 },

    #[error("Range must be positive, got {0}")]
    Range(f32),

    #[error("Memory budget must be at least 1 MB")]
    MemoryBudget,
}

/// Parameters for one mapping session.
///
/// Built fresh every time mapping is enabled and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingParameters {
    /// Voxel edge length in meters.
    pub resolution_meters: f32,
    /// Only changed chunks are delivered by incremental retrievals.
    pub use_chunk_only: bool,
    /// Keep keyframe images so the final mesh can be textured.
    pub save_texture: bool,
    /// Depth beyond this distance is ignored.
    pub range_meters: f32,
    pub map_type: MapType,
    /// Upper bound on the memory the engine may use for its volume.
    pub max_memory_mb: u32,
}

impl MappingParameters {
    pub const MAX_RESOLUTION_METERS: f32 = 1.0;

    pub fn with_resolution(mut self, resolution_meters: f32) -> Self {
        self.resolution_meters = resolution_meters;
        self
    }

    pub fn with_range(mut self, range_meters: f32) -> Self {
        self.range_meters = range_meters;
        self
    }

    pub fn with_save_texture(mut self, save_texture: bool) -> Self {
        self.save_texture = save_texture;
        self
    }

    pub fn with_map_type(mut self, map_type: MapType) -> Self {
        self.map_type = map_type;
        self
    }

    pub fn with_chunk_only(mut self, use_chunk_only: bool) -> Self {
        self.use_chunk_only = use_chunk_only;
        self
    }

    pub fn with_max_memory_mb(mut self, max_memory_mb: u32) -> Self {
        self.max_memory_mb = max_memory_mb;
        self
    }

    /// Check that the parameters describe a usable volume.
    pub fn validate(&self) -> Result<(), ParameterError> {
        let res = self.resolution_meters;
        if !(res > 0.0 && res <= Self::MAX_RESOLUTION_METERS) {
            return Err(ParameterError::Resolution {
                value: res,
                max: Self::MAX_RESOLUTION_METERS,
            });
        }
        if !(self.range_meters > 0.0) {
            return Err(ParameterError::Range(self.range_meters));
        }
        if self.max_memory_mb == 0 {
            return Err(ParameterError::MemoryBudget);
        }
        Ok(())
    }
}

impl Default for MappingParameters {
    fn default() -> Self {
        Self {
            resolution_meters: 0.025,
            use_chunk_only: true,
            save_texture: false,
            range_meters: 2.0,
            map_type: MapType::Mesh,
            max_memory_mb: 2048,
        }
    }
}

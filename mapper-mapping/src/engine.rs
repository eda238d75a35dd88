//! The mapping engine contract.

use mapper_data::{
    Frame, IncrementalMap, MappingParameters, MappingState, MeshFilter, ParameterError,
    TextureFormat,
};
use thiserror::Error;

/// Errors reported by a mapping engine.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Invalid mapping parameters: {0}")]
    InvalidParameters(#[from] ParameterError),

    #[error("Spatial mapping is already enabled")]
    AlreadyEnabled,

    #[error("Spatial mapping is not enabled")]
    NotEnabled,

    #[error("No map update is ready to retrieve")]
    NoUpdateAvailable,

    #[error("Map update failed: {0}")]
    UpdateFailed(String),

    #[error("No texture data was recorded during mapping")]
    NoTextureData,

    #[error("Operation requires a mesh map")]
    NotAMesh,

    #[error("Failed to start meshing worker: {0}")]
    Worker(#[from] std::io::Error),
}

/// Progress of the latest asynchronous update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// No request outstanding and nothing waiting to be retrieved.
    Idle,
    Pending,
    /// An update is ready for [`MappingEngine::retrieve_update_async`].
    Success,
    Failure,
}

/// Outcome of a filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub removed_triangles: usize,
    pub removed_vertices: usize,
    pub removed_chunks: usize,
}

/// Outcome of a texture pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureReport {
    pub textured_vertices: usize,
    pub unseen_vertices: usize,
    pub keyframes: usize,
}

/// Incremental reconstruction capability.
///
/// Update requests follow a request/poll/retrieve protocol:
/// [`request_update_async`](Self::request_update_async) returns at once,
/// completion is observed by polling
/// [`poll_update_status`](Self::poll_update_status), and a completed update
/// is merged into a map with
/// [`retrieve_update_async`](Self::retrieve_update_async). None of these
/// calls block.
pub trait MappingEngine {
    /// Start a mapping session.
    fn enable(&mut self, params: MappingParameters) -> Result<(), MappingError>;

    /// End the session and drop everything it accumulated.
    fn disable(&mut self);

    /// Integrate one frame. Ignored while disabled.
    fn ingest(&mut self, frame: &Frame);

    fn request_update_async(&mut self);

    fn poll_update_status(&mut self) -> UpdateStatus;

    /// Merge the completed update into `map`, returning how many chunks changed.
    fn retrieve_update_async(&mut self, map: &mut IncrementalMap) -> Result<usize, MappingError>;

    /// Rebuild the complete map into `map`, blocking until done.
    fn extract_whole(&mut self, map: &mut IncrementalMap) -> Result<(), MappingError>;

    fn state(&self) -> MappingState;

    /// Empty `map` in preparation for a new session.
    fn clear(&mut self, map: &mut IncrementalMap);

    fn filter(
        &mut self,
        map: &mut IncrementalMap,
        filter: MeshFilter,
    ) -> Result<FilterReport, MappingError>;

    /// Color the map from images recorded during the session.
    fn apply_texture(
        &mut self,
        map: &mut IncrementalMap,
        format: TextureFormat,
    ) -> Result<TextureReport, MappingError>;
}

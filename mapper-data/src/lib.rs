//! Mapper Data Crate
//!
//! Data types shared by every stage of the spatial mapper: camera frames and
//! poses, tracking and mapping states, mapping parameters, the chunked
//! incremental map and its OBJ/PLY writers.
//! This crate has no knowledge of cameras or engines; it only describes data.

pub mod camera;
pub mod export;
pub mod frame;
pub mod map;
pub mod transform;
pub mod triangulation;
pub mod types;

pub use camera::CameraParameters;
pub use export::{ExportError, ExportFormat, save_map};
pub use frame::{DepthMap, Frame};
pub use map::{Chunk, ChunkKey, IncrementalMap};
pub use transform::Transform;
pub use triangulation::{ProjectionPlane, best_projection_plane, triangulate_points};
pub use types::{
    MapType, MappingParameters, MappingState, MeshFilter, ParameterError, TextureFormat,
    TrackingState,
};

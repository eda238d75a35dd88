//! Mapper Mapping Crate
//!
//! The mapping engine contract and a CPU implementation of it. The engine
//! fuses posed depth frames into a chunked voxel volume, meshes changed
//! chunks on a background worker, and post-processes the final map.
//!
//! ## Modules
//!
//! - [`engine`]: The [`MappingEngine`] trait, update status and errors
//! - [`ingest`]: Depth back-projection into world-space points
//! - [`reconstruction`]: Voxel volume, chunk meshing and the update worker
//! - [`postprocess`]: Mesh filtering and texture projection
//! - [`voxel_engine`]: [`VoxelMappingEngine`], tying the above together

pub mod engine;
pub mod ingest;
pub mod postprocess;
pub mod reconstruction;
pub mod voxel_engine;

pub use engine::{FilterReport, MappingEngine, MappingError, TextureReport, UpdateStatus};
pub use voxel_engine::VoxelMappingEngine;

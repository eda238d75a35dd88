//! Incremental reconstruction: voxel fusion and chunk meshing.
//!
//! Points are fused into a chunked voxel volume on the caller's thread.
//! Changed chunks are snapshotted and meshed by a background worker.

pub mod meshing;
pub mod updater;
pub mod volume;

pub use meshing::{mesh_chunk, mesh_snapshots};
pub use updater::{ChunkUpdater, UpdateJob, UpdateResult};
pub use volume::{ChunkSnapshot, IntegrationStats, VoxelSample, VoxelVolume};

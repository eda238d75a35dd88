//! Turning voxel snapshots into map chunks.

use super::volume::ChunkSnapshot;
use mapper_data::{Chunk, ChunkKey, MapType, triangulate_points};

/// Triangles with an edge longer than this many voxels are not built.
pub const MAX_EDGE_VOXELS: f32 = 3.0;

/// Build the map chunk for one voxel snapshot.
///
/// Point clouds keep the fused voxel centers; meshes additionally connect
/// them with a triangulation limited to neighboring voxels.
pub fn mesh_chunk(snapshot: &ChunkSnapshot, map_type: MapType, resolution: f32) -> Chunk {
    let vertices: Vec<_> = snapshot.samples.iter().map(|s| s.position).collect();
    let colors = snapshot
        .samples
        .iter()
        .map(|s| [s.color[0], s.color[1], s.color[2], 255])
        .collect();
    let triangles = match map_type {
        MapType::Mesh => triangulate_points(&vertices, Some(MAX_EDGE_VOXELS * resolution)),
        MapType::FusedPointCloud => Vec::new(),
    };
    Chunk::new(vertices, colors, triangles)
}

/// Mesh a batch of snapshots.
pub fn mesh_snapshots(
    snapshots: &[ChunkSnapshot],
    map_type: MapType,
    resolution: f32,
) -> Vec<(ChunkKey, Chunk)> {
    snapshots
        .iter()
        .map(|s| (s.key, mesh_chunk(s, map_type, resolution)))
        .collect()
}

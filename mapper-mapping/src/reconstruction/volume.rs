//! Chunked voxel volume fusing colored points.

use crate::ingest::Point;
use glam::Vec3;
use mapper_data::ChunkKey;
use std::collections::{BTreeSet, HashMap};

/// Voxels along one edge of a chunk.
pub const CHUNK_VOXELS: i32 = 16;

/// Rough per-voxel footprint used to turn a memory budget into a voxel count.
pub const BYTES_PER_VOXEL: usize = 48;

type VoxelKey = [i32; 3];

#[derive(Debug, Clone, Copy, Default)]
struct Voxel {
    position_sum: Vec3,
    color_sum: Vec3,
    weight: u32,
}

/// Fused content of one voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSample {
    /// Mean of the points that fell into the voxel.
    pub position: Vec3,
    pub color: [u8; 3],
    pub weight: u32,
}

/// Owned copy of a chunk's voxels, ready to be meshed off-thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSnapshot {
    pub key: ChunkKey,
    pub samples: Vec<VoxelSample>,
}

/// Counters from one integration call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrationStats {
    pub inserted: usize,
    pub updated: usize,
    /// Points discarded because the voxel budget was exhausted.
    pub dropped: usize,
}

impl IntegrationStats {
    pub fn integrated(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Sparse voxel grid grouped into cubic chunks.
#[derive(Debug, Clone)]
pub struct VoxelVolume {
    resolution: f32,
    max_voxels: usize,
    voxel_count: usize,
    chunks: HashMap<ChunkKey, HashMap<VoxelKey, Voxel>>,
    dirty: BTreeSet<ChunkKey>,
}

impl VoxelVolume {
    pub fn new(resolution: f32, max_voxels: usize) -> Self {
        Self {
            resolution,
            max_voxels,
            voxel_count: 0,
            chunks: HashMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Volume sized for a memory budget in megabytes.
    pub fn with_memory_budget(resolution: f32, max_memory_mb: u32) -> Self {
        let max_voxels = max_memory_mb as usize * 1024 * 1024 / BYTES_PER_VOXEL;
        Self::new(resolution, max_voxels)
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn voxel_count(&self) -> usize {
        self.voxel_count
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count == 0
    }

    pub fn is_full(&self) -> bool {
        self.voxel_count >= self.max_voxels
    }

    pub fn voxel_key(&self, position: Vec3) -> VoxelKey {
        let k = (position / self.resolution).floor();
        [k.x as i32, k.y as i32, k.z as i32]
    }

    pub fn chunk_key(voxel: VoxelKey) -> ChunkKey {
        voxel.map(|v| v.div_euclid(CHUNK_VOXELS))
    }

    /// Fuse points into their voxels and mark touched chunks dirty.
    pub fn integrate(&mut self, points: &[Point]) -> IntegrationStats {
        let mut stats = IntegrationStats::default();
        for point in points {
            let voxel_key = self.voxel_key(point.position);
            let chunk_key = Self::chunk_key(voxel_key);
            let color = Vec3::new(
                point.color[0] as f32,
                point.color[1] as f32,
                point.color[2] as f32,
            );

            let full = self.voxel_count >= self.max_voxels;
            let chunk = self.chunks.entry(chunk_key).or_default();
            match chunk.get_mut(&voxel_key) {
                Some(voxel) => {
                    voxel.position_sum += point.position;
                    voxel.color_sum += color;
                    voxel.weight += 1;
                    stats.updated += 1;
                }
                None if full => {
                    stats.dropped += 1;
                    if chunk.is_empty() {
                        self.chunks.remove(&chunk_key);
                    }
                    continue;
                }
                None => {
                    chunk.insert(
                        voxel_key,
                        Voxel {
                            position_sum: point.position,
                            color_sum: color,
                            weight: 1,
                        },
                    );
                    self.voxel_count += 1;
                    stats.inserted += 1;
                }
            }
            self.dirty.insert(chunk_key);
        }
        stats
    }

    /// Keys of chunks changed since the last call, in ascending order.
    pub fn take_dirty(&mut self) -> Vec<ChunkKey> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Every chunk key, in ascending order.
    pub fn all_keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.chunks.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Copy out the fused voxels of `keys`. Unknown keys are skipped.
    pub fn snapshot(&self, keys: &[ChunkKey]) -> Vec<ChunkSnapshot> {
        keys.iter()
            .filter_map(|key| {
                let voxels = self.chunks.get(key)?;
                let mut entries: Vec<(&VoxelKey, &Voxel)> = voxels.iter().collect();
                entries.sort_unstable_by_key(|(k, _)| **k);
                let samples = entries
                    .into_iter()
                    .map(|(_, v)| {
                        let w = v.weight as f32;
                        let c = v.color_sum / w;
                        VoxelSample {
                            position: v.position_sum / w,
                            color: [c.x as u8, c.y as u8, c.z as u8],
                            weight: v.weight,
                        }
                    })
                    .collect();
                Some(ChunkSnapshot { key: *key, samples })
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.dirty.clear();
        self.voxel_count = 0;
    }
}

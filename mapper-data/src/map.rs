//! The incremental map: a set of chunks updated piecewise by a mapping engine.
//!
//! The map is plain storage. Engines fill it through retrieval and
//! extraction; viewers and exporters only read it.

use crate::types::MapType;
use glam::Vec3;
use std::collections::BTreeMap;

/// Integer coordinates of a chunk in the engine's chunk grid.
pub type ChunkKey = [i32; 3];

/// A spatially bounded piece of the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub vertices: Vec<Vec3>,
    /// RGBA per vertex. Alpha is 0 for vertices no texture source has seen.
    pub colors: Vec<[u8; 4]>,
    /// Vertex index triplets. Empty for point clouds.
    pub triangles: Vec<[u32; 3]>,
    /// Set when the chunk changed in the latest retrieval.
    pub updated: bool,
}

impl Chunk {
    pub fn new(vertices: Vec<Vec3>, colors: Vec<[u8; 4]>, triangles: Vec<[u32; 3]>) -> Self {
        debug_assert_eq!(vertices.len(), colors.len());
        Self {
            vertices,
            colors,
            triangles,
            updated: true,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Map accumulated during one mapping session.
#[derive(Debug, Clone, Default)]
pub struct IncrementalMap {
    map_type: MapType,
    chunks: BTreeMap<ChunkKey, Chunk>,
    textured: bool,
}

impl IncrementalMap {
    pub fn new(map_type: MapType) -> Self {
        Self {
            map_type,
            chunks: BTreeMap::new(),
            textured: false,
        }
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn set_map_type(&mut self, map_type: MapType) {
        self.map_type = map_type;
    }

    /// Drop every chunk.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.textured = false;
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.values().all(Chunk::is_empty)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.chunks.values().map(Chunk::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.chunks.values().map(Chunk::triangle_count).sum()
    }

    pub fn chunk(&self, key: &ChunkKey) -> Option<&Chunk> {
        self.chunks.get(key)
    }

    pub fn chunks(&self) -> impl Iterator<Item = (&ChunkKey, &Chunk)> {
        self.chunks.iter()
    }

    pub fn chunks_mut(&mut self) -> impl Iterator<Item = (&ChunkKey, &mut Chunk)> {
        self.chunks.iter_mut()
    }

    /// Chunks flagged as changed by the latest retrieval.
    pub fn updated_chunks(&self) -> impl Iterator<Item = (&ChunkKey, &Chunk)> {
        self.chunks.iter().filter(|(_, c)| c.updated)
    }

    /// Insert or replace a chunk and flag it as updated.
    pub fn upsert_chunk(&mut self, key: ChunkKey, mut chunk: Chunk) {
        chunk.updated = true;
        self.chunks.insert(key, chunk);
    }

    /// Clear the `updated` flag on every chunk.
    pub fn reset_updated(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.updated = false;
        }
    }

    /// Replace the whole content with `chunks`, all flagged as updated.
    pub fn replace_all(&mut self, chunks: impl IntoIterator<Item = (ChunkKey, Chunk)>) {
        self.clear();
        for (key, chunk) in chunks {
            self.upsert_chunk(key, chunk);
        }
    }

    /// Remove chunks left without vertices, e.g. after filtering.
    pub fn prune_empty(&mut self) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|_, c| !c.is_empty());
        before - self.chunks.len()
    }

    pub fn is_textured(&self) -> bool {
        self.textured
    }

    pub fn set_textured(&mut self, textured: bool) {
        self.textured = textured;
    }

    /// Axis-aligned bounds of all vertices.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut vertices = self.chunks.values().flat_map(|c| c.vertices.iter());
        let first = *vertices.next()?;
        Some(vertices.fold((first, first), |(min, max), v| (min.min(*v), max.max(*v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with(n: usize) -> Chunk {
        let vertices = (0..n).map(|i| Vec3::splat(i as f32)).collect();
        Chunk::new(vertices, vec![[255; 4]; n], Vec::new())
    }

    #[test]
    fn test_upsert_marks_updated_and_replaces() {
        let mut map = IncrementalMap::new(MapType::Mesh);
        map.upsert_chunk([0, 0, 0], chunk_with(3));
        map.reset_updated();
        assert_eq!(map.updated_chunks().count(), 0);

        map.upsert_chunk([0, 0, 0], chunk_with(5));
        assert_eq!(map.chunk_count(), 1);
        assert_eq!(map.vertex_count(), 5);
        assert_eq!(map.updated_chunks().count(), 1);
    }

    #[test]
    fn test_clear_resets_texture_flag() {
        let mut map = IncrementalMap::new(MapType::Mesh);
        map.upsert_chunk([1, 0, 0], chunk_with(2));
        map.set_textured(true);
        map.clear();
        assert!(map.is_empty());
        assert!(!map.is_textured());
    }

    #[test]
    fn test_bounds_and_prune() {
        let mut map = IncrementalMap::new(MapType::FusedPointCloud);
        assert!(map.bounds().is_none());
        map.upsert_chunk([0, 0, 0], chunk_with(4));
        map.upsert_chunk([0, 1, 0], Chunk::default());
        let (min, max) = map.bounds().unwrap();
        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::splat(3.0));
        assert_eq!(map.prune_empty(), 1);
        assert_eq!(map.chunk_count(), 1);
    }
}

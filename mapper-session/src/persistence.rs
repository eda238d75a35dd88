//! Saving finalized maps.

use mapper_data::{ExportError, IncrementalMap, save_map};
use std::path::Path;

/// Destination for finalized maps.
pub trait Persistence {
    fn export(&mut self, map: &IncrementalMap, path: &Path) -> Result<(), ExportError>;
}

/// Writes maps to the filesystem as OBJ or PLY, chosen by extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileExporter;

impl Persistence for FileExporter {
    fn export(&mut self, map: &IncrementalMap, path: &Path) -> Result<(), ExportError> {
        save_map(map, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use mapper_data::{Chunk, MapType};

    #[test]
    fn test_file_exporter_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping_data").join("mesh_gen.obj");

        let mut map = IncrementalMap::new(MapType::Mesh);
        map.upsert_chunk(
            [0, 0, 0],
            Chunk::new(
                vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                vec![[255, 255, 255, 255]; 3],
                vec![[0, 1, 2]],
            ),
        );

        FileExporter.export(&map, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("f 1 2 3"));
    }

    #[test]
    fn test_empty_map_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.obj");
        let map = IncrementalMap::new(MapType::Mesh);
        assert!(matches!(
            FileExporter.export(&map, &path),
            Err(ExportError::EmptyMap)
        ));
        assert!(!path.exists());
    }
}

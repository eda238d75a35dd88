//! Writing finalized maps to disk.
//!
//! Meshes and point clouds are written as Wavefront OBJ (with per-vertex
//! colors) or ASCII PLY, chosen from the file extension.

mod obj;
mod ply;

pub use obj::write_obj;
pub use ply::write_ply;

use crate::map::IncrementalMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while exporting a map.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing to export: the map is empty")]
    EmptyMap,

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk format of an exported map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Obj,
    Ply,
}

impl ExportFormat {
    /// Infer the format from the extension of `path`.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "obj" => Ok(ExportFormat::Obj),
            "ply" => Ok(ExportFormat::Ply),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Write `map` to `path`, creating missing parent directories.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn save_map(map: &IncrementalMap, path: &Path) -> Result<(), ExportError> {
    let format = ExportFormat::from_path(path)?;
    if map.is_empty() {
        return Err(ExportError::EmptyMap);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    debug!("Writing {:?} file", format);
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ExportFormat::Obj => write_obj(map, &mut writer)?,
        ExportFormat::Ply => write_ply(map, &mut writer)?,
    }
    writer.flush()?;

    info!(
        "Saved map: {} vertices, {} triangles, {} chunks",
        map.vertex_count(),
        map.triangle_count(),
        map.chunk_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Chunk;
    use crate::types::MapType;
    use glam::Vec3;

    fn triangle_map() -> IncrementalMap {
        let mut map = IncrementalMap::new(MapType::Mesh);
        map.upsert_chunk(
            [0, 0, 0],
            Chunk::new(
                vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                vec![[255, 0, 0, 255]; 3],
                vec![[0, 1, 2]],
            ),
        );
        map
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/mesh.OBJ")).unwrap(),
            ExportFormat::Obj
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("cloud.ply")).unwrap(),
            ExportFormat::Ply
        );
        assert!(matches!(
            ExportFormat::from_path(Path::new("mesh.stl")),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/mesh_gen.obj");
        save_map(&triangle_map(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("f 1 2 3"));
    }

    #[test]
    fn test_save_rejects_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.obj");
        let empty = IncrementalMap::new(MapType::Mesh);
        assert!(matches!(save_map(&empty, &path), Err(ExportError::EmptyMap)));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_reports_write_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.obj");
        std::os::unix::fs::symlink("/dev/full", &path).unwrap();
        assert!(matches!(
            save_map(&triangle_map(), &path),
            Err(ExportError::Io(_))
        ));
    }
}

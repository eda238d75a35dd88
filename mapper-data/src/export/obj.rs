//! Wavefront OBJ writer.

use crate::map::IncrementalMap;
use std::io::{self, Write};

/// Write all chunks as one OBJ object.
///
/// Vertex colors use the common `v x y z r g b` extension. Face indices are
/// 1-based and offset per chunk.
pub fn write_obj<W: Write>(map: &IncrementalMap, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "# spatial mapper export")?;
    writeln!(
        writer,
        "# vertices: {} faces: {}",
        map.vertex_count(),
        map.triangle_count()
    )?;
    writeln!(writer, "o mesh")?;

    for (_, chunk) in map.chunks() {
        for (v, c) in chunk.vertices.iter().zip(&chunk.colors) {
            writeln!(
                writer,
                "v {:.6} {:.6} {:.6} {:.4} {:.4} {:.4}",
                v.x,
                v.y,
                v.z,
                c[0] as f32 / 255.0,
                c[1] as f32 / 255.0,
                c[2] as f32 / 255.0
            )?;
        }
    }

    let mut offset = 1u32;
    for (_, chunk) in map.chunks() {
        for t in &chunk.triangles {
            writeln!(
                writer,
                "f {} {} {}",
                t[0] + offset,
                t[1] + offset,
                t[2] + offset
            )?;
        }
        offset += chunk.vertices.len() as u32;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Chunk;
    use crate::types::MapType;
    use glam::Vec3;

    #[test]
    fn test_face_indices_are_offset_per_chunk() {
        let mut map = IncrementalMap::new(MapType::Mesh);
        for key in [[0, 0, 0], [1, 0, 0]] {
            map.upsert_chunk(
                key,
                Chunk::new(
                    vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                    vec![[255; 4]; 3],
                    vec![[0, 1, 2]],
                ),
            );
        }

        let mut out = Vec::new();
        write_obj(&map, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 6);
        assert!(text.contains("f 1 2 3"));
        assert!(text.contains("f 4 5 6"));
    }
}

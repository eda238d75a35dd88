//! ASCII PLY writer.

use crate::map::IncrementalMap;
use std::io::{self, Write};

/// Write all chunks as a single PLY element list with RGBA vertex colors.
pub fn write_ply<W: Write>(map: &IncrementalMap, writer: &mut W) -> io::Result<()> {
    let faces = map.triangle_count();

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment spatial mapper export")?;
    writeln!(writer, "element vertex {}", map.vertex_count())?;
    for prop in ["x", "y", "z"] {
        writeln!(writer, "property float {}", prop)?;
    }
    for prop in ["red", "green", "blue", "alpha"] {
        writeln!(writer, "property uchar {}", prop)?;
    }
    if faces > 0 {
        writeln!(writer, "element face {}", faces)?;
        writeln!(writer, "property list uchar uint vertex_indices")?;
    }
    writeln!(writer, "end_header")?;

    for (_, chunk) in map.chunks() {
        for (v, c) in chunk.vertices.iter().zip(&chunk.colors) {
            writeln!(
                writer,
                "{:.6} {:.6} {:.6} {} {} {} {}",
                v.x, v.y, v.z, c[0], c[1], c[2], c[3]
            )?;
        }
    }

    let mut offset = 0u32;
    for (_, chunk) in map.chunks() {
        for t in &chunk.triangles {
            writeln!(
                writer,
                "3 {} {} {}",
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
    fn test_point_cloud_header_has_no_faces() {
        let mut map = IncrementalMap::new(MapType::FusedPointCloud);
        map.upsert_chunk(
            [0, 0, 0],
            Chunk::new(vec![Vec3::ZERO, Vec3::ONE], vec![[10, 20, 30, 255]; 2], Vec::new()),
        );

        let mut out = Vec::new();
        write_ply(&map, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("element vertex 2"));
        assert!(!text.contains("element face"));
        assert!(text.ends_with("1.000000 1.000000 1.000000 10 20 30 255\n"));
    }
}

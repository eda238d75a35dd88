//! Mesh cleanup: degenerate faces, small islands, optional smoothing.

use crate::engine::FilterReport;
use glam::Vec3;
use mapper_data::{Chunk, IncrementalMap, MapType, MeshFilter};
use tracing::debug;

/// Filter every chunk of `map` and drop chunks left empty.
///
/// Point clouds have no faces to filter and are returned untouched.
pub fn filter_map(map: &mut IncrementalMap, filter: MeshFilter) -> FilterReport {
    let mut report = FilterReport::default();
    if map.map_type() != MapType::Mesh {
        return report;
    }
    for (_, chunk) in map.chunks_mut() {
        let r = filter_chunk(chunk, filter);
        report.removed_triangles += r.removed_triangles;
        report.removed_vertices += r.removed_vertices;
    }
    report.removed_chunks = map.prune_empty();
    debug!(
        "Filtered map ({:?}): -{} triangles, -{} vertices, -{} chunks",
        filter, report.removed_triangles, report.removed_vertices, report.removed_chunks
    );
    report
}

/// Filter one chunk in place.
pub fn filter_chunk(chunk: &mut Chunk, filter: MeshFilter) -> FilterReport {
    let triangles_before = chunk.triangles.len();
    let vertices_before = chunk.vertices.len();

    remove_degenerate(chunk);
    remove_small_components(chunk, filter.min_component_triangles());
    for _ in 0..filter.smoothing_passes() {
        smooth(chunk);
    }
    compact(chunk);

    FilterReport {
        removed_triangles: triangles_before - chunk.triangles.len(),
        removed_vertices: vertices_before - chunk.vertices.len(),
        removed_chunks: 0,
    }
}

fn remove_degenerate(chunk: &mut Chunk) {
    let vertices = &chunk.vertices;
    chunk.triangles.retain(|t| {
        if t[0] == t[1] || t[1] == t[2] || t[0] == t[2] {
            return false;
        }
        let (a, b, c) = (
            vertices[t[0] as usize],
            vertices[t[1] as usize],
            vertices[t[2] as usize],
        );
        (b - a).cross(c - a).length_squared() > f32::EPSILON * f32::EPSILON
    });
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

fn remove_small_components(chunk: &mut Chunk, min_triangles: usize) {
    if chunk.triangles.is_empty() {
        return;
    }
    let mut parent: Vec<usize> = (0..chunk.vertices.len()).collect();
    for t in &chunk.triangles {
        let a = find(&mut parent, t[0] as usize);
        for &v in &t[1..] {
            let b = find(&mut parent, v as usize);
            if a != b {
                parent[b] = a;
            }
        }
    }

    let mut sizes = vec![0usize; chunk.vertices.len()];
    let roots: Vec<usize> = chunk
        .triangles
        .iter()
        .map(|t| find(&mut parent, t[0] as usize))
        .collect();
    for &root in &roots {
        sizes[root] += 1;
    }

    let mut keep = roots.iter().map(|&root| sizes[root] >= min_triangles);
    chunk.triangles.retain(|_| keep.next().unwrap_or(false));
}

fn smooth(chunk: &mut Chunk) {
    let n = chunk.vertices.len();
    let mut sums = vec![Vec3::ZERO; n];
    let mut counts = vec![0u32; n];
    for t in &chunk.triangles {
        for i in 0..3 {
            let v = t[i] as usize;
            for j in 1..3 {
                let w = t[(i + j) % 3] as usize;
                sums[v] += chunk.vertices[w];
                counts[v] += 1;
            }
        }
    }
    for (i, vertex) in chunk.vertices.iter_mut().enumerate() {
        if counts[i] > 0 {
            let mean = sums[i] / counts[i] as f32;
            *vertex = vertex.lerp(mean, 0.5);
        }
    }
}

/// Drop vertices no triangle references.
fn compact(chunk: &mut Chunk) {
    if chunk.triangles.is_empty() {
        chunk.vertices.clear();
        chunk.colors.clear();
        return;
    }

    let mut remap = vec![u32::MAX; chunk.vertices.len()];
    let mut vertices = Vec::new();
    let mut colors = Vec::new();
    for t in &mut chunk.triangles {
        for idx in t.iter_mut() {
            let old = *idx as usize;
            if remap[old] == u32::MAX {
                remap[old] = vertices.len() as u32;
                vertices.push(chunk.vertices[old]);
                colors.push(chunk.colors[old]);
            }
            *idx = remap[old];
        }
    }
    chunk.vertices = vertices;
    chunk.colors = colors;
}

//! Delaunay triangulation of chunk vertices.
//!
//! Chunk vertices are projected onto the plane where they spread the most,
//! triangulated in 2D, and the triangles are mapped back onto the original
//! 3D positions. Triangles spanning long edges are rejected so that gaps in
//! the surface stay open instead of being bridged.

use delaunator::{Point, triangulate};
use glam::Vec3;
use tracing::{debug, warn};

/// Plane used to flatten points before 2D triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionPlane {
    XY,
    XZ,
    YZ,
}

impl ProjectionPlane {
    fn project(self, p: Vec3) -> Point {
        let (x, y) = match self {
            ProjectionPlane::XY => (p.x, p.y),
            ProjectionPlane::XZ => (p.x, p.z),
            ProjectionPlane::YZ => (p.y, p.z),
        };
        Point {
            x: x as f64,
            y: y as f64,
        }
    }
}

/// Pick the plane orthogonal to the axis with the smallest extent.
pub fn best_projection_plane(positions: &[Vec3]) -> ProjectionPlane {
    if positions.is_empty() {
        return ProjectionPlane::XY;
    }

    let (min, max) = positions.iter().fold(
        (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
        |(min, max), p| (min.min(*p), max.max(*p)),
    );
    let extent = max - min;

    if extent.z <= extent.x && extent.z <= extent.y {
        ProjectionPlane::XY
    } else if extent.y <= extent.x && extent.y <= extent.z {
        ProjectionPlane::XZ
    } else {
        ProjectionPlane::YZ
    }
}

/// Triangulate `positions`, returning vertex index triplets.
///
/// When `max_edge` is set, triangles with any 3D edge longer than it are
/// dropped, as are triangles collapsed to zero area.
pub fn triangulate_points(positions: &[Vec3], max_edge: Option<f32>) -> Vec<[u32; 3]> {
    if positions.len() < 3 {
        if !positions.is_empty() {
            warn!(
                "Not enough points for triangulation ({} < 3)",
                positions.len()
            );
        }
        return Vec::new();
    }

    let plane = best_projection_plane(positions);
    let points: Vec<Point> = positions.iter().map(|p| plane.project(*p)).collect();
    let result = triangulate(&points);

    let max_sq = max_edge.map(|e| e * e);
    let mut triangles = Vec::with_capacity(result.triangles.len() / 3);
    let mut rejected = 0usize;

    for tri in result.triangles.chunks_exact(3) {
        let (a, b, c) = (positions[tri[0]], positions[tri[1]], positions[tri[2]]);
        if (b - a).cross(c - a).length_squared() <= f32::EPSILON * f32::EPSILON {
            rejected += 1;
            continue;
        }
        if let Some(max_sq) = max_sq {
            let longest = a
                .distance_squared(b)
                .max(b.distance_squared(c))
                .max(c.distance_squared(a));
            if longest > max_sq {
                rejected += 1;
                continue;
            }
        }
        triangles.push([tri[0] as u32, tri[1] as u32, tri[2] as u32]);
    }

    debug!(
        "Triangulated {} points into {} triangles (plane: {:?}, rejected: {})",
        positions.len(),
        triangles.len(),
        plane,
        rejected
    );

    triangles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize, spacing: f32) -> Vec<Vec3> {
        let mut positions = Vec::new();
        for y in 0..n {
            for x in 0..n {
                positions.push(Vec3::new(x as f32 * spacing, y as f32 * spacing, 0.0));
            }
        }
        positions
    }

    #[test]
    fn test_triangulate_insufficient_points() {
        let positions = vec![Vec3::ZERO, Vec3::X];
        assert!(triangulate_points(&positions, None).is_empty());
        assert!(triangulate_points(&[], None).is_empty());
    }

    #[test]
    fn test_triangulate_grid_pattern() {
        let positions = grid(5, 1.0);
        let triangles = triangulate_points(&positions, None);
        // A 5x5 grid has 16 cells, two triangles each.
        assert!(triangles.len() >= 28 && triangles.len() <= 32);
        for tri in &triangles {
            for &idx in tri {
                assert!((idx as usize) < positions.len());
            }
        }
    }

    #[test]
    fn test_max_edge_opens_gaps() {
        let mut positions = grid(3, 0.1);
        // A far-away cluster that would otherwise be bridged to the grid.
        positions.extend(grid(3, 0.1).into_iter().map(|p| p + Vec3::new(5.0, 0.0, 0.0)));

        let all = triangulate_points(&positions, None);
        let local = triangulate_points(&positions, Some(0.3));
        assert!(local.len() < all.len());
        assert!(local.len() >= 12 && local.len() <= 16);
    }

    #[test]
    fn test_collinear_points_yield_nothing() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ];
        assert!(triangulate_points(&positions, None).is_empty());
    }

    #[test]
    fn test_best_projection_plane() {
        let flat_y = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(5.0, 1.0, 5.0),
        ];
        assert_eq!(best_projection_plane(&flat_y), ProjectionPlane::XZ);

        let flat_x = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.5, 10.0, 0.0),
            Vec3::new(0.0, 0.0, 10.0),
        ];
        assert_eq!(best_projection_plane(&flat_x), ProjectionPlane::YZ);
        assert_eq!(best_projection_plane(&[]), ProjectionPlane::XY);
    }

    #[test]
    fn test_vertical_wall_uses_original_positions() {
        let positions: Vec<Vec3> = grid(4, 0.05)
            .into_iter()
            .map(|p| Vec3::new(p.x, p.y, -2.0))
            .collect();
        let triangles = triangulate_points(&positions, Some(0.1));
        assert!(triangles.len() >= 14 && triangles.len() <= 18);
    }
}

//! Basic procedural mesh generation routines.
use crate::mesh::AdaptiveMesh;
use nalgebra::{Point2, Vector2};

/// Boundary markers for the four sides of an axis-aligned rectangle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RectangleBoundaryMarkers {
    /// The side `y = y_min`.
    pub bottom: u32,
    /// The side `x = x_max`.
    pub right: u32,
    /// The side `y = y_max`.
    pub top: u32,
    /// The side `x = x_min`.
    pub left: u32,
}

impl RectangleBoundaryMarkers {
    pub fn uniform(marker: u32) -> Self {
        Self {
            bottom: marker,
            right: marker,
            top: marker,
            left: marker,
        }
    }
}

/// Generates a uniform triangulation of an axis-aligned rectangle.
///
/// The rectangle `[origin, origin + extents]` is divided into `cells_x × cells_y` rectangles,
/// each of which is split into two counter-clockwise triangles along its diagonal from the
/// lower left to the upper right corner.
///
/// # Panics
///
/// Panics if either cell count is zero or the extents are not positive.
pub fn create_rectangular_tri_mesh_2d(
    origin: &Point2<f64>,
    extents: &Vector2<f64>,
    cells_x: usize,
    cells_y: usize,
    markers: RectangleBoundaryMarkers,
) -> AdaptiveMesh {
    assert!(cells_x > 0 && cells_y > 0, "Need at least one cell in each direction");
    assert!(extents.x > 0.0 && extents.y > 0.0, "Extents must be positive");

    let hx = extents.x / cells_x as f64;
    let hy = extents.y / cells_y as f64;
    let to_global_vertex_index = |i: usize, j: usize| (cells_x + 1) * j + i;

    let mut vertices = Vec::with_capacity((cells_x + 1) * (cells_y + 1));
    for j in 0..=cells_y {
        for i in 0..=cells_x {
            vertices.push(origin + Vector2::new(i as f64 * hx, j as f64 * hy));
        }
    }

    let mut triangles = Vec::with_capacity(2 * cells_x * cells_y);
    let mut face_markers = Vec::with_capacity(2 * cells_x * cells_y);
    for j in 0..cells_y {
        for i in 0..cells_x {
            let v00 = to_global_vertex_index(i, j);
            let v10 = to_global_vertex_index(i + 1, j);
            let v11 = to_global_vertex_index(i + 1, j + 1);
            let v01 = to_global_vertex_index(i, j + 1);

            let bottom = (j == 0).then_some(markers.bottom);
            let right = (i + 1 == cells_x).then_some(markers.right);
            let top = (j + 1 == cells_y).then_some(markers.top);
            let left = (i == 0).then_some(markers.left);

            triangles.push([v00, v10, v11]);
            face_markers.push([bottom, right, None]);
            triangles.push([v00, v11, v01]);
            face_markers.push([None, top, left]);
        }
    }

    AdaptiveMesh::from_vertices_and_triangles(vertices, triangles, face_markers)
        .expect("Procedurally generated rectangle mesh is always valid")
}

pub fn create_unit_square_tri_mesh_2d(cells_per_dim: usize, markers: RectangleBoundaryMarkers) -> AdaptiveMesh {
    create_rectangular_tri_mesh_2d(
        &Point2::origin(),
        &Vector2::new(1.0, 1.0),
        cells_per_dim,
        cells_per_dim,
        markers,
    )
}

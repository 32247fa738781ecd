use icestream::mesh::procedural::{create_unit_square_tri_mesh_2d, RectangleBoundaryMarkers};
use icestream::mesh::{AdaptiveMesh, RefinementFlag};

mod assembly;
mod config;
mod constants;
mod element;
mod physics;
mod velocity;

/// Unit square of two triangles, with the first triangle (below the diagonal) refined once.
///
/// The midpoint of the diagonal is a hanging vertex.
fn locally_refined_square() -> AdaptiveMesh {
    let mut mesh = create_unit_square_tri_mesh_2d(1, RectangleBoundaryMarkers::uniform(0));
    mesh.execute_refinement(&[RefinementFlag::Refine, RefinementFlag::Keep]);
    mesh
}

/// Unit square of `2 n²` triangles, refined globally and then locally in a corner.
fn graded_square(n: usize) -> AdaptiveMesh {
    let mut mesh = create_unit_square_tri_mesh_2d(n, RectangleBoundaryMarkers::uniform(0));
    mesh.refine_globally();
    let flags: Vec<_> = (0..mesh.num_active_cells())
        .map(|position| {
            let centroid = mesh
                .element(mesh.active_cells()[position])
                .vertices()
                .iter()
                .fold(nalgebra::Vector2::zeros(), |sum, v| sum + v.coords)
                / 3.0;
            if centroid.x < 0.3 && centroid.y < 0.3 {
                RefinementFlag::Refine
            } else {
                RefinementFlag::Keep
            }
        })
        .collect();
    mesh.execute_refinement(&flags);
    mesh
}

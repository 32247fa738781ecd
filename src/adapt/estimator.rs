//! Kelly-type a posteriori error indicators.
use crate::dofs::DofMap;
use crate::element::TriangleElement;
use crate::mesh::{AdaptiveMesh, EdgeTopology, FaceNeighbor};
use crate::velocity::gradient_in_cell;
use icestream_quadrature::Rule1d;
use itertools::izip;
use nalgebra::DVector;

/// Computes per-cell error indicators from the jumps of the normal derivative of the velocity.
///
/// For every interior face `F`,
/// $$
/// \eta_K^2 \mathrel{+}= \frac{h_F}{24} \int_F \left| \left[ \frac{\partial \vec u}{\partial \vec n} \right] \right|^2 \,\mathrm{d}s
/// $$
/// is added to both adjacent cells `K`, where `h_F` is the face length. Faces with a hanging
/// vertex are integrated over the two fine sub-faces. Boundary faces do not contribute.
///
/// Returns `η_K` for every active cell, indexed by active position.
pub fn kelly_indicators(mesh: &AdaptiveMesh, topology: &EdgeTopology, dofs: &DofMap, u: &DVector<f64>) -> Vec<f64> {
    assert_eq!(topology.generation(), dofs.generation());
    assert_eq!(u.len(), dofs.num_dofs());

    let positions = mesh.active_positions();
    let face_rule = dofs.basis().face_quadrature();
    let mut indicators_squared = vec![0.0; dofs.num_cells()];

    for position in 0..dofs.num_cells() {
        let cell = dofs.cell(position);
        let element = mesh.element(cell);
        for (face, neighbor) in topology.cell_faces(position).iter().enumerate() {
            match *neighbor {
                // Hanging faces are visited from the coarse side
                FaceNeighbor::Boundary { .. } | FaceNeighbor::Coarser { .. } => {}
                FaceNeighbor::Conforming { cell: other, .. } => {
                    // Visit each conforming face once
                    if cell < other {
                        let other_position = positions[other].expect("Neighbors are active");
                        let contribution = face_jump_contribution(
                            mesh,
                            dofs,
                            u,
                            &face_rule,
                            (position, &element, face),
                            other_position,
                        );
                        indicators_squared[position] += contribution;
                        indicators_squared[other_position] += contribution;
                    }
                }
                FaceNeighbor::Finer { halves, .. } => {
                    for (fine_cell, fine_face) in halves {
                        let fine_position = positions[fine_cell].expect("Neighbors are active");
                        let fine_element = mesh.element(fine_cell);
                        let contribution = face_jump_contribution(
                            mesh,
                            dofs,
                            u,
                            &face_rule,
                            (fine_position, &fine_element, fine_face),
                            position,
                        );
                        indicators_squared[position] += contribution;
                        indicators_squared[fine_position] += contribution;
                    }
                }
            }
        }
    }

    indicators_squared.into_iter().map(f64::sqrt).collect()
}

/// `h_F / 24 ∫_F |[∂u/∂n]|²` for a face of the first cell shared with the second cell.
///
/// Degenerate cells contribute zero.
fn face_jump_contribution(
    mesh: &AdaptiveMesh,
    dofs: &DofMap,
    u: &DVector<f64>,
    face_rule: &Rule1d,
    (position, element, face): (usize, &TriangleElement, usize),
    other_position: usize,
) -> f64 {
    let other_element = mesh.element(dofs.cell(other_position));
    let normal = element.face_normal(face);
    let length = element.face_length(face);

    let (weights, points) = face_rule;
    let mut integral = 0.0;
    for (w, &[t]) in izip!(weights, points) {
        let xi = TriangleElement::face_reference_point(face, t);
        let x = element.map_reference_coords(&xi);
        let jump = other_element.map_physical_coords(&x).and_then(|other_xi| {
            let grad = gradient_in_cell(dofs, element, u, position, &xi)?;
            let other_grad = gradient_in_cell(dofs, &other_element, u, other_position, &other_xi)?;
            Some((grad - other_grad) * normal)
        });
        match jump {
            Some(jump) => integral += w * length * jump.norm_squared(),
            None => return 0.0,
        }
    }
    length / 24.0 * integral
}

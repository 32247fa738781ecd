//! Transfer of the velocity between mesh generations.
use crate::dofs::{DofMap, SOLUTION_DIM};
use crate::mesh::{AdaptiveMesh, CellOrigin, GenerationTransfer};
use crate::velocity::{cell_contains, evaluate_in_cell};
use nalgebra::DVector;

/// Interpolates the velocity of the previous generation onto the nodes of the new one.
///
/// Every new node is evaluated from the old interpolant on the old cell containing it: the
/// cell itself if it was kept, its parent if it was refined, or the child containing the node
/// if its children were coarsened. The result is neither constrained nor does it satisfy the
/// boundary conditions of the new generation.
///
/// # Panics
///
/// Panics if the DoF maps do not belong to the two generations of the transfer.
pub fn transfer_velocity(
    mesh: &AdaptiveMesh,
    transfer: &GenerationTransfer,
    old_dofs: &DofMap,
    old_velocity: &DVector<f64>,
    new_dofs: &DofMap,
) -> DVector<f64> {
    assert_eq!(old_dofs.generation(), transfer.old_generation());
    assert_eq!(new_dofs.generation(), transfer.new_generation());
    assert_eq!(old_velocity.len(), old_dofs.num_dofs());

    let mut old_positions = vec![None; mesh.cells().len()];
    for position in 0..old_dofs.num_cells() {
        old_positions[old_dofs.cell(position)] = Some(position);
    }

    let mut values = DVector::zeros(new_dofs.num_dofs());
    let mut visited = vec![false; new_dofs.num_nodes()];
    for (position, origin) in transfer.origins().iter().enumerate() {
        for &node in new_dofs.cell_nodes(position) {
            if visited[node] {
                continue;
            }
            visited[node] = true;

            let x = new_dofs.node_positions()[node];
            let source = match *origin {
                CellOrigin::Kept { cell } => cell,
                CellOrigin::Refined { parent } => parent,
                CellOrigin::Coarsened { children } => children
                    .iter()
                    .copied()
                    .find(|&child| cell_contains(&mesh.element(child), &x))
                    .unwrap_or(children[3]),
            };
            let old_position = old_positions[source].expect("Source cells belong to the previous generation");
            let xi = mesh
                .element(source)
                .map_physical_coords(&x)
                .expect("Mesh cells are never degenerate");
            let value = evaluate_in_cell(old_dofs, old_velocity, old_position, &xi);
            for c in 0..SOLUTION_DIM {
                values[SOLUTION_DIM * node + c] = value[c];
            }
        }
    }
    values
}

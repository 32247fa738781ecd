//! The velocity solution and evaluation of its finite element interpolant.
use crate::dofs::{DofMap, SOLUTION_DIM};
use crate::element::{reference_triangle_contains, transform_gradients, TriangleElement};
use nalgebra::{DVector, Matrix2, Point2, Vector2};

/// Names of the two velocity components, in DoF order.
pub const COMPONENT_NAMES: [&str; SOLUTION_DIM] = ["x_velocity", "y_velocity"];

/// Nodal velocity values tagged with the mesh generation they belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityField {
    generation: usize,
    values: DVector<f64>,
}

impl VelocityField {
    pub fn new(generation: usize, values: DVector<f64>) -> Self {
        Self { generation, values }
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Interleaved DoF values, see [`DofMap`].
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn into_values(self) -> DVector<f64> {
        self.values
    }

    pub fn component_names(&self) -> [&'static str; SOLUTION_DIM] {
        COMPONENT_NAMES
    }

    pub fn num_nodes(&self) -> usize {
        self.values.len() / SOLUTION_DIM
    }

    pub fn node_velocity(&self, node: usize) -> Vector2<f64> {
        node_value(&self.values, node)
    }

    /// Nodal values of a single component.
    pub fn component(&self, component: usize) -> DVector<f64> {
        assert!(component < SOLUTION_DIM);
        DVector::from_fn(self.num_nodes(), |node, _| self.values[SOLUTION_DIM * node + component])
    }
}

pub(crate) fn node_value(u: &DVector<f64>, node: usize) -> Vector2<f64> {
    Vector2::new(u[SOLUTION_DIM * node], u[SOLUTION_DIM * node + 1])
}

/// Evaluates the interpolant of `u` on the cell at the given active position.
///
/// The point is given in reference coordinates of the cell.
pub fn evaluate_in_cell(dofs: &DofMap, u: &DVector<f64>, position: usize, xi: &Point2<f64>) -> Vector2<f64> {
    let basis = dofs.basis();
    let mut phi = vec![0.0; basis.num_nodes()];
    basis.populate_basis(&mut phi, xi);
    dofs.cell_nodes(position)
        .iter()
        .zip(&phi)
        .map(|(&node, phi_i)| node_value(u, node) * *phi_i)
        .sum()
}

/// Evaluates the gradient `∂u_r / ∂x_c` of the interpolant of `u` on the given cell.
///
/// Returns `None` for a degenerate cell.
pub fn gradient_in_cell(
    dofs: &DofMap,
    element: &TriangleElement,
    u: &DVector<f64>,
    position: usize,
    xi: &Point2<f64>,
) -> Option<Matrix2<f64>> {
    let basis = dofs.basis();
    let n = basis.num_nodes();
    let j_inv_t = element.reference_jacobian().try_inverse()?.transpose();
    let mut ref_gradients = vec![Vector2::zeros(); n];
    let mut gradients = vec![Vector2::zeros(); n];
    basis.populate_reference_gradients(&mut ref_gradients, xi);
    transform_gradients(&j_inv_t, &ref_gradients, &mut gradients);
    Some(
        dofs.cell_nodes(position)
            .iter()
            .zip(&gradients)
            .map(|(&node, grad_phi)| node_value(u, node) * grad_phi.transpose())
            .sum(),
    )
}

/// Whether the cell contains the point, up to a small tolerance in reference coordinates.
pub fn cell_contains(element: &TriangleElement, x: &Point2<f64>) -> bool {
    element
        .map_physical_coords(x)
        .map_or(false, |xi| reference_triangle_contains(&xi, 1e-10))
}

//! Functionality for error estimation against known solutions.
use crate::dofs::DofMap;
use crate::element::TriangleElement;
use crate::fields::VectorField;
use crate::mesh::AdaptiveMesh;
use crate::velocity::evaluate_in_cell;
use icestream_quadrature::{triangle, Rule2d};
use itertools::izip;
use nalgebra::{DVector, Point2};

/// Estimate the squared $L^2$ error $\norm{u_h - u}^2_{L^2}$ on a single cell with the given
/// quadrature rule.
#[allow(non_snake_case)]
pub fn estimate_element_L2_error_squared(
    element: &TriangleElement,
    u: &dyn VectorField,
    dofs: &DofMap,
    u_h: &DVector<f64>,
    position: usize,
    rule: &Rule2d,
) -> f64 {
    let det_j = element.reference_jacobian().determinant().abs();
    let (weights, points) = rule;
    let mut result = 0.0;
    for (w, xi) in izip!(weights, points) {
        let xi = Point2::from(*xi);
        let x = element.map_reference_coords(&xi);
        let error = evaluate_in_cell(dofs, u_h, position, &xi) - u.value(&x);
        result += w * error.norm_squared() * det_j;
    }
    result
}

/// Estimate the squared $L^2$ error $\norm{u_h - u}^2_{L^2}$ over all active cells.
///
/// # Panics
///
/// Panics if the DoF map does not belong to the current mesh generation.
#[allow(non_snake_case)]
pub fn estimate_L2_error_squared(mesh: &AdaptiveMesh, dofs: &DofMap, u_h: &DVector<f64>, u: &dyn VectorField) -> f64 {
    assert_eq!(mesh.generation(), dofs.generation());
    assert_eq!(u_h.len(), dofs.num_dofs());
    // Sufficient for exact integration of the quadratic interpolant error
    let rule = triangle::strength_4();
    (0..dofs.num_cells())
        .map(|position| {
            let element = mesh.element(dofs.cell(position));
            estimate_element_L2_error_squared(&element, u, dofs, u_h, position, &rule)
        })
        .sum()
}

/// Estimate the $L^2$ error $\norm{u_h - u}_{L^2}$ over all active cells.
#[allow(non_snake_case)]
pub fn estimate_L2_error(mesh: &AdaptiveMesh, dofs: &DofMap, u_h: &DVector<f64>, u: &dyn VectorField) -> f64 {
    estimate_L2_error_squared(mesh, dofs, u_h, u).sqrt()
}

/// Approximate $\norm{u}_{L^2}$ of a field over the active cells of the mesh.
#[allow(non_snake_case)]
pub fn estimate_L2_norm(mesh: &AdaptiveMesh, u: &dyn VectorField) -> f64 {
    let rule = triangle::strength_4();
    let (weights, points) = &rule;
    mesh.active_cells()
        .iter()
        .map(|&cell| {
            let element = mesh.element(cell);
            let det_j = element.reference_jacobian().determinant().abs();
            izip!(weights, points)
                .map(|(w, xi)| {
                    let x = element.map_reference_coords(&Point2::from(*xi));
                    w * u.value(&x).norm_squared() * det_j
                })
                .sum::<f64>()
        })
        .sum::<f64>()
        .sqrt()
}

use super::locally_refined_square;
use icestream::dofs::DofMap;
use icestream::element::{LagrangeBasis, TriangleElement};
use icestream::fields::FnVectorField;
use icestream::velocity::{cell_contains, evaluate_in_cell, gradient_in_cell, VelocityField, COMPONENT_NAMES};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{dvector, Matrix2, Point2, Vector2};

fn affine(x: &Point2<f64>) -> Vector2<f64> {
    Vector2::new(2.0 - x.x + 3.0 * x.y, 0.5 * x.x - x.y)
}

#[test]
fn interpolant_reproduces_affine_fields_inside_cells() {
    let mesh = locally_refined_square();
    for basis in [LagrangeBasis::Linear, LagrangeBasis::Quadratic] {
        let dofs = DofMap::new(&mesh, &mesh.topology(), basis);
        let u = dofs.interpolate(&FnVectorField(affine));
        let expected_gradient = Matrix2::new(-1.0, 3.0, 0.5, -1.0);

        for position in 0..dofs.num_cells() {
            let element = mesh.element(dofs.cell(position));
            for xi in [Point2::new(1.0 / 3.0, 1.0 / 3.0), Point2::new(0.1, 0.7), Point2::new(0.0, 0.0)] {
                let x = element.map_reference_coords(&xi);
                let value = evaluate_in_cell(&dofs, &u, position, &xi);
                assert_matrix_eq!(value, affine(&x), comp = abs, tol = 1e-12);

                let gradient = gradient_in_cell(&dofs, &element, &u, position, &xi).unwrap();
                assert_matrix_eq!(gradient, expected_gradient, comp = abs, tol = 1e-11);
            }
        }
    }
}

#[test]
fn gradient_of_degenerate_cell_is_none() {
    let mesh = locally_refined_square();
    let dofs = DofMap::new(&mesh, &mesh.topology(), LagrangeBasis::Linear);
    let u = dofs.interpolate(&FnVectorField(affine));
    let degenerate = TriangleElement::from_vertices([Point2::origin(), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)]);
    assert!(gradient_in_cell(&dofs, &degenerate, &u, 0, &Point2::new(0.2, 0.2)).is_none());
}

#[test]
fn velocity_field_accessors() {
    let field = VelocityField::new(3, dvector![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(field.generation(), 3);
    assert_eq!(field.num_nodes(), 3);
    assert_eq!(field.component_names(), COMPONENT_NAMES);
    assert_eq!(field.component_names(), ["x_velocity", "y_velocity"]);
    assert_eq!(field.node_velocity(1), Vector2::new(3.0, 4.0));
    assert_eq!(field.component(0), dvector![1.0, 3.0, 5.0]);
    assert_eq!(field.component(1), dvector![2.0, 4.0, 6.0]);
    assert_eq!(field.clone().into_values(), *field.values());
}

#[test]
#[should_panic]
fn velocity_field_rejects_invalid_component() {
    let field = VelocityField::new(0, dvector![1.0, 2.0]);
    field.component(2);
}

#[test]
fn cell_containment_includes_boundary() {
    let element = TriangleElement::from_vertices([Point2::origin(), Point2::new(2.0, 0.0), Point2::new(0.0, 1.0)]);
    assert!(cell_contains(&element, &Point2::new(0.5, 0.25)));
    assert!(cell_contains(&element, &Point2::new(1.0, 0.0)));
    assert!(cell_contains(&element, &Point2::new(1.0, 0.5)));
    assert!(cell_contains(&element, &Point2::new(0.0, 0.0)));
    assert!(!cell_contains(&element, &Point2::new(1.5, 0.5)));
    assert!(!cell_contains(&element, &Point2::new(-0.01, 0.5)));

    let degenerate = TriangleElement::from_vertices([Point2::origin(), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)]);
    assert!(!cell_contains(&degenerate, &Point2::new(0.5, 0.0)));
    assert_scalar_eq!(element.signed_area(), 1.0, comp = abs, tol = 1e-14);
}

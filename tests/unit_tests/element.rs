use icestream::element::{reference_triangle_contains, transform_gradients, LagrangeBasis, TriangleElement};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{Matrix2, Point2, Vector2};
use proptest::prelude::*;

fn reference_point() -> impl Strategy<Value = Point2<f64>> {
    (0.0 .. 1.0, 0.0 .. 1.0).prop_map(|(x, y): (f64, f64)| {
        // Fold the unit square onto the reference triangle
        if x + y <= 1.0 {
            Point2::new(x, y)
        } else {
            Point2::new(1.0 - x, 1.0 - y)
        }
    })
}

fn bases() -> [LagrangeBasis; 2] {
    [LagrangeBasis::Linear, LagrangeBasis::Quadratic]
}

#[test]
fn basis_functions_are_nodal() {
    for basis in bases() {
        let n = basis.num_nodes();
        let mut phi = vec![0.0; n];
        for j in 0..n {
            basis.populate_basis(&mut phi, &basis.reference_node(j));
            for (i, phi_i) in phi.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_scalar_eq!(*phi_i, expected, comp = abs, tol = 1e-14);
            }
        }
    }
}

#[test]
fn face_nodes_lie_on_faces() {
    for basis in bases() {
        for k in 0..3 {
            let nodes = basis.face_nodes(k);
            assert_eq!(nodes.len(), basis.degree() + 1);
            assert_eq!(nodes[0], k);
            assert_eq!(nodes[1], (k + 1) % 3);
            for &node in nodes {
                let xi = basis.reference_node(node);
                let on_face = match k {
                    0 => xi.y == 0.0,
                    1 => xi.x + xi.y == 1.0,
                    _ => xi.x == 0.0,
                };
                assert!(on_face, "node {node} is not on face {k}");
            }
        }
    }
}

#[test]
fn degree_round_trips() {
    for basis in bases() {
        assert_eq!(LagrangeBasis::from_degree(basis.degree()), Some(basis));
    }
    assert_eq!(LagrangeBasis::from_degree(3), None);
}

#[test]
fn triangle_geometry() {
    let element = TriangleElement::from_vertices([Point2::new(1.0, 1.0), Point2::new(3.0, 1.0), Point2::new(1.0, 2.0)]);
    assert_scalar_eq!(element.signed_area(), 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(element.diameter(), 5.0f64.sqrt(), comp = abs, tol = 1e-14);
    assert_scalar_eq!(element.face_length(0), 2.0, comp = abs, tol = 1e-14);

    assert_matrix_eq!(element.face_normal(0), Vector2::new(0.0, -1.0), comp = abs, tol = 1e-14);
    assert_matrix_eq!(element.face_normal(2), Vector2::new(-1.0, 0.0), comp = abs, tol = 1e-14);
    let n1 = element.face_normal(1);
    assert_matrix_eq!(n1, Vector2::new(1.0, 2.0) / 5.0f64.sqrt(), comp = abs, tol = 1e-14);

    // Face parametrization runs from vertex k to vertex k + 1
    for k in 0..3 {
        let [a, b] = element.face(k);
        let start = element.map_reference_coords(&TriangleElement::face_reference_point(k, 0.0));
        let end = element.map_reference_coords(&TriangleElement::face_reference_point(k, 1.0));
        assert_matrix_eq!(start.coords, a.coords, comp = abs, tol = 1e-14);
        assert_matrix_eq!(end.coords, b.coords, comp = abs, tol = 1e-14);
    }
}

#[test]
fn degenerate_triangle_has_no_inverse_map() {
    let element = TriangleElement::from_vertices([Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)]);
    assert_eq!(element.signed_area(), 0.0);
    assert!(element.map_physical_coords(&Point2::new(0.5, 0.5)).is_none());
}

#[test]
fn reference_containment() {
    assert!(reference_triangle_contains(&Point2::new(0.2, 0.2), 0.0));
    assert!(reference_triangle_contains(&Point2::new(0.5, 0.5), 1e-12));
    assert!(!reference_triangle_contains(&Point2::new(0.6, 0.5), 1e-12));
    assert!(!reference_triangle_contains(&Point2::new(-0.1, 0.5), 1e-12));
}

proptest! {
    #[test]
    fn basis_is_partition_of_unity(xi in reference_point()) {
        for basis in bases() {
            let n = basis.num_nodes();
            let mut phi = vec![0.0; n];
            let mut gradients = vec![Vector2::zeros(); n];
            basis.populate_basis(&mut phi, &xi);
            basis.populate_reference_gradients(&mut gradients, &xi);

            assert_scalar_eq!(phi.iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-12);
            let gradient_sum: Vector2<f64> = gradients.iter().sum();
            assert_matrix_eq!(gradient_sum, Vector2::zeros(), comp = abs, tol = 1e-12);
        }
    }

    #[test]
    fn basis_reproduces_linear_functions(xi in reference_point()) {
        // Σ φ_i(ξ) ξ_i = ξ for any Lagrange basis of degree >= 1
        for basis in bases() {
            let n = basis.num_nodes();
            let mut phi = vec![0.0; n];
            basis.populate_basis(&mut phi, &xi);
            let reproduced = (0..n).fold(Vector2::zeros(), |sum, i| sum + basis.reference_node(i).coords * phi[i]);
            assert_matrix_eq!(reproduced, xi.coords, comp = abs, tol = 1e-12);
        }
    }

    #[test]
    fn reference_map_round_trips(xi in reference_point(), x0 in -5.0 .. 5.0, y0 in -5.0 .. 5.0) {
        let element = TriangleElement::from_vertices([
            Point2::new(x0, y0),
            Point2::new(x0 + 2.0, y0 + 0.5),
            Point2::new(x0 - 0.3, y0 + 1.5),
        ]);
        let x = element.map_reference_coords(&xi);
        let xi_back = element.map_physical_coords(&x).unwrap();
        assert_matrix_eq!(xi_back.coords, xi.coords, comp = abs, tol = 1e-12);
    }

    #[test]
    fn physical_gradients_differentiate_affine_maps(xi in reference_point()) {
        // The gradients of the basis applied to the nodal coordinates give the identity
        let element = TriangleElement::from_vertices([Point2::new(0.0, 0.0), Point2::new(2.0, 0.5), Point2::new(-0.3, 1.5)]);
        let basis = LagrangeBasis::Quadratic;
        let n = basis.num_nodes();
        let mut ref_gradients = vec![Vector2::zeros(); n];
        let mut gradients = vec![Vector2::zeros(); n];
        basis.populate_reference_gradients(&mut ref_gradients, &xi);
        let j_inv_t = element.reference_jacobian().try_inverse().unwrap().transpose();
        transform_gradients(&j_inv_t, &ref_gradients, &mut gradients);

        let identity = (0..n).fold(Matrix2::zeros(), |sum, i| {
            let x_i = element.map_reference_coords(&basis.reference_node(i));
            sum + x_i.coords * gradients[i].transpose()
        });
        assert_matrix_eq!(identity, Matrix2::identity(), comp = abs, tol = 1e-12);
    }
}

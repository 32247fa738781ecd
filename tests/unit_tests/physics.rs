use icestream::physics::{effective_strain_rate_squared, strain_rate, MembraneStiffness, Viscosity};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{Matrix2, Vector2};
use proptest::prelude::*;

fn vector2() -> impl Strategy<Value = Vector2<f64>> {
    [-10.0 .. 10.0, -10.0 .. 10.0].prop_map(|[x, y]| Vector2::new(x, y))
}

#[test]
fn effective_strain_rate_matches_component_form() {
    let grad_u = Matrix2::new(0.3, -0.2, 0.5, -0.1);
    let eps = strain_rate(&grad_u);
    let (exx, eyy, exy) = (eps[(0, 0)], eps[(1, 1)], eps[(0, 1)]);
    let expected = exx * exx + eyy * eyy + exx * eyy + exy * exy;
    assert_scalar_eq!(effective_strain_rate_squared(&eps), expected, comp = abs, tol = 1e-14);
}

#[test]
fn linear_viscosity_ignores_velocity_gradient() {
    let viscosity = Viscosity::linear_from_guess(2.0, 0.01);
    let expected = 2.0 * 0.01f64.powf(-2.0 / 3.0);
    assert!(!viscosity.is_nonlinear());
    assert_scalar_eq!(viscosity.evaluate(&Matrix2::zeros()), expected, comp = abs, tol = 1e-10);
    assert_scalar_eq!(
        viscosity.evaluate(&Matrix2::new(1.0, 2.0, 3.0, 4.0)),
        expected,
        comp = abs,
        tol = 1e-10
    );
}

#[test]
fn nonlinear_viscosity_follows_glen_law() {
    let viscosity = Viscosity::Nonlinear { rheology: 3.0 };
    assert!(viscosity.is_nonlinear());

    // Pure shear diag(e, -e) has ε₂ = e²
    let e = 0.02;
    let grad_u = Matrix2::new(e, 0.0, 0.0, -e);
    assert_scalar_eq!(viscosity.evaluate(&grad_u), 3.0 * e.powf(-2.0 / 3.0), comp = abs, tol = 1e-10);

    // Uniaxial extension diag(e, 0) has ε₂ = e²
    let grad_u = Matrix2::new(e, 0.0, 0.0, 0.0);
    assert_scalar_eq!(viscosity.evaluate(&grad_u), 3.0 * e.powf(-2.0 / 3.0), comp = abs, tol = 1e-10);

    // Rotations do not contribute to the strain rate
    let grad_u = Matrix2::new(e, 0.5, -0.5, 0.0);
    assert_scalar_eq!(viscosity.evaluate(&grad_u), 3.0 * e.powf(-2.0 / 3.0), comp = abs, tol = 1e-8);
}

#[test]
fn membrane_stiffness_is_depth_integrated() {
    let viscosity = Viscosity::Linear { viscosity: 5.0 };
    let stiffness = viscosity.membrane_stiffness(200.0, &Matrix2::zeros());
    assert_eq!(
        stiffness,
        MembraneStiffness {
            lambda: 2000.0,
            mu: 1000.0
        }
    );
}

proptest! {
    #[test]
    fn contraction_is_consistent_with_stress(a in vector2(), b in vector2(), v in vector2(),
                                             lambda in 0.0 .. 10.0, mu in 0.0 .. 10.0) {
        // For u = v φ with ∇φ = b, the stress applied to a test gradient a is C(a, b) v
        let stiffness = MembraneStiffness { lambda, mu };
        let grad_u = v * b.transpose();
        let expected = stiffness.stress(&strain_rate(&grad_u)) * a;
        let contracted = stiffness.contract(&a, &b) * v;
        assert_matrix_eq!(contracted, expected, comp = abs, tol = 1e-9);
    }

    #[test]
    fn contraction_is_symmetric(a in vector2(), b in vector2(), lambda in 0.0 .. 10.0, mu in 0.0 .. 10.0) {
        let stiffness = MembraneStiffness { lambda, mu };
        assert_matrix_eq!(stiffness.contract(&a, &b), stiffness.contract(&b, &a).transpose(), comp = abs, tol = 1e-9);
    }
}

use icestream::constants::{rate_factor, rheology, PhysicalConstants, RATE_FACTOR_TRANSITION_TEMPERATURE};
use matrixcompare::assert_scalar_eq;

#[test]
fn constants_are_converted_to_megapascal_years() {
    let constants = PhysicalConstants::default();
    assert_scalar_eq!(constants.density_ratio(), 917.0 / 1024.0, comp = abs, tol = 1e-14);

    // ρ g has the units MPa / m regardless of the time unit
    let rho_g = constants.rho_ice * constants.gravity;
    assert_scalar_eq!(rho_g, 917.0 * 9.81 * 1e-6, comp = abs, tol = 1e-14);
}

#[test]
fn rate_factor_is_nearly_continuous_at_transition() {
    let t = RATE_FACTOR_TRANSITION_TEMPERATURE;
    let cold = rate_factor(t - 1e-9);
    let warm = rate_factor(t);
    assert!((cold - warm).abs() / warm < 0.05);
}

#[test]
fn rate_factor_increases_with_temperature() {
    let temperatures: Vec<f64> = (0..20).map(|i| 233.15 + 2.5 * i as f64).collect();
    for pair in temperatures.windows(2) {
        assert!(rate_factor(pair[0]) < rate_factor(pair[1]));
    }
}

#[test]
fn rheology_is_consistent_with_rate_factor() {
    for t in [243.15, 254.15, 268.15] {
        let a = rate_factor(t);
        let a_from_b = rheology(t).powi(-3) / 8.0;
        assert!((a_from_b - a).abs() <= 1e-12 * a);
    }
}

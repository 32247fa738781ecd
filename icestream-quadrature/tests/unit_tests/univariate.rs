use icestream_quadrature::integrate;
use icestream_quadrature::univariate::{gauss, gauss_unit_interval};
use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

#[test]
fn gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=20 {
        let expected_polynomial_degree = 2 * n - 1;
        let rule = gauss(n);
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            let monomial_integral = (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0);
            let estimated_integral = integrate(&rule, |x| x[0].powi(alpha));
            assert_scalar_eq!(estimated_integral, monomial_integral, comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn unit_interval_rules_live_in_unit_interval() {
    for n in 1..=6 {
        let (weights, points) = gauss_unit_interval(n);
        assert_scalar_eq!(weights.iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-14);
        assert!(points.iter().all(|&[t]| 0.0 < t && t < 1.0));
    }
}

proptest! {
    #[test]
    fn unit_interval_rule_integrates_cubics(a in -5.0..5.0f64, b in -5.0..5.0f64, c in -5.0..5.0f64, d in -5.0..5.0f64) {
        let rule = gauss_unit_interval(2);
        let expected = a + b / 2.0 + c / 3.0 + d / 4.0;
        let estimated = integrate(&rule, |&[t]| a + b * t + c * t * t + d * t * t * t);
        prop_assert!((expected - estimated).abs() <= 1e-12);
    }
}

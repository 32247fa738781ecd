//! Gauss-Legendre rules on `[-1, 1]` and on the unit interval `[0, 1]`.

use crate::Rule1d;
use std::f64::consts::PI;

/// Value and derivative of the Legendre polynomial `p_n` at a point in `(-1, 1)`.
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // p_n(x)
    p1: f64,
    // p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    fn evaluate(n: usize, x: f64) -> Self {
        // m P_m(x) = (2m - 1) x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        for m in 1..=n {
            let m = m as f64;
            let p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }
        Self { n, x, p1, p2 }
    }

    fn value(&self) -> f64 {
        self.p1
    }

    /// Only valid for |x| < 1.
    fn derivative(&self) -> f64 {
        let n = self.n as f64;
        n * (self.x * self.p1 - self.p2) / (self.x * self.x - 1.0)
    }
}

/// Maximum number of Newton steps per root. Convergence is quadratic from the Chebyshev-like
/// initial guess, so this is never reached in practice.
const MAX_NEWTON_ITERATIONS: usize = 100;

/// Gauss quadrature for the reference interval `[-1, 1]`.
///
/// Given `n` points, the rule integrates polynomials of degree up to `2n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule1d {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let m = (n + 1) / 2;
    let mut points = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    for i in 0..m {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut recurrence = LegendreRecurrence::evaluate(n, x);
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let dx = -recurrence.value() / recurrence.derivative();
            x += dx;
            recurrence = LegendreRecurrence::evaluate(n, x);
            if dx.abs() <= 1e-15 {
                break;
            }
        }
        let dp = recurrence.derivative();
        points.push([x]);
        weights.push(2.0 / ((1.0 - x * x) * dp * dp));
    }

    for i in m..n {
        let mirror = n - i - 1;
        points.push([-points[mirror][0]]);
        weights.push(weights[mirror]);
    }

    (weights, points)
}

/// Gauss quadrature for the unit interval `[0, 1]`.
///
/// This is the rule used for face integrals: a face from vertex `a` to vertex `b` is
/// parametrized as `a + t (b - a)` with `t` in `[0, 1]`.
pub fn gauss_unit_interval(num_points: usize) -> Rule1d {
    let (weights, points) = gauss(num_points);
    let weights = weights.into_iter().map(|w| 0.5 * w).collect();
    let points = points.into_iter().map(|[x]| [0.5 * (x + 1.0)]).collect();
    (weights, points)
}

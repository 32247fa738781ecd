//! Quadrature rules for the reference domains used by `icestream`.
//!
//! Two reference domains are supported:
//!
//! - the unit interval `[0, 1]`, used for integration over cell faces,
//! - the reference triangle with vertices `(0, 0)`, `(1, 0)` and `(0, 1)`.
//!
//! Rules are returned as `(weights, points)` pairs. Weights always sum to the measure of the
//! reference domain, i.e. `1` for the interval and `1/2` for the triangle.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod triangle;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable { strength: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable { strength } => {
                write!(f, "There is no quadrature rule of strength {strength} available")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional quadrature rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}

//! Symmetric quadrature rules for the reference triangle `(0, 0)`, `(1, 0)`, `(0, 1)`.
//!
//! The rules are taken from D. A. Dunavant, *High degree efficient symmetrical Gaussian
//! quadrature rules for the triangle* (1985). Weights are scaled to sum to the reference area
//! `1/2`.
use crate::{Error, Rule2d};

/// Expands a barycentric orbit `(a, a, 1 - 2a)` into its three reference points.
fn push_orbit(rule: &mut Rule2d, a: f64, weight: f64) {
    let b = 1.0 - 2.0 * a;
    for point in [[a, a], [b, a], [a, b]] {
        rule.0.push(0.5 * weight);
        rule.1.push(point);
    }
}

/// Three-point rule, exact for polynomials of total degree 2.
pub fn strength_2() -> Rule2d {
    let mut rule = (Vec::with_capacity(3), Vec::with_capacity(3));
    push_orbit(&mut rule, 1.0 / 6.0, 1.0 / 3.0);
    rule
}

/// Six-point rule, exact for polynomials of total degree 4.
pub fn strength_4() -> Rule2d {
    let mut rule = (Vec::with_capacity(6), Vec::with_capacity(6));
    push_orbit(&mut rule, 0.445948490915965, 0.223381589678011);
    push_orbit(&mut rule, 0.091576213509771, 0.109951743655322);
    rule
}

/// Returns the cheapest available rule that integrates polynomials of total degree
/// `strength` exactly.
pub fn for_strength(strength: usize) -> Result<Rule2d, Error> {
    match strength {
        0..=2 => Ok(strength_2()),
        3..=4 => Ok(strength_4()),
        _ => Err(Error::NoRuleAvailable { strength }),
    }
}

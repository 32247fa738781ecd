mod univariate;

/// Integral of `x^alpha y^beta` over the reference triangle, `alpha! beta! / (alpha + beta + 2)!`.
fn triangle_monomial_integral(alpha: u32, beta: u32) -> f64 {
    let factorial = |n: u32| (1..=n).map(|k| k as f64).product::<f64>();
    factorial(alpha) * factorial(beta) / factorial(alpha + beta + 2)
}

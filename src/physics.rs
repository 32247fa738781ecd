//! Viscosity and membrane stress of floating ice.
//!
//! The depth-integrated SSA stress for viscosity `ν` and thickness `h` is
//! $$
//! \vec T = 2 \nu h (\vec \varepsilon + \tr{\vec \varepsilon} \vec I),
//! $$
//! i.e. an isotropic linear relation with Lamé-like parameters `λ = 2νh` and `μ = νh`. The
//! dilatational term is retained since incompressibility has been used to eliminate the vertical
//! strain rate.
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Isotropic stress-strain relation `σ = λ tr(ε) I + 2 μ ε`.
///
/// The associated contraction operator, used to assemble the stiffness block of a pair of
/// basis functions with gradients `a` (test) and `b` (trial), is
/// $$
/// \mathcal{C}(\vec a, \vec b) = \mu \left[ (\vec a \cdot \vec b) \vec I + \vec b \vec a^T \right]
///     + \lambda \vec a \vec b^T.
/// $$
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembraneStiffness {
    pub lambda: f64,
    pub mu: f64,
}

impl MembraneStiffness {
    /// The stiffness for a depth-integrated viscosity `νh`.
    pub fn from_depth_integrated_viscosity(viscosity: f64) -> Self {
        Self {
            lambda: 2.0 * viscosity,
            mu: viscosity,
        }
    }

    pub fn stress(&self, strain_rate: &Matrix2<f64>) -> Matrix2<f64> {
        strain_rate * (2.0 * self.mu) + Matrix2::identity() * (self.lambda * strain_rate.trace())
    }

    #[allow(non_snake_case)]
    pub fn contract(&self, a: &Vector2<f64>, b: &Vector2<f64>) -> Matrix2<f64> {
        let I = Matrix2::identity();
        (I * a.dot(b) + b * a.transpose()) * self.mu + a * b.transpose() * self.lambda
    }
}

pub fn strain_rate(velocity_gradient: &Matrix2<f64>) -> Matrix2<f64> {
    (velocity_gradient + velocity_gradient.transpose()) * 0.5
}

/// The squared effective strain rate `tr(ε)² - det(ε)` of a symmetric strain rate tensor.
///
/// This equals `ε_xx² + ε_yy² + ε_xx ε_yy + ε_xy²`, the second invariant of the full 3D strain
/// rate tensor with `ε_zz = -(ε_xx + ε_yy)`.
pub fn effective_strain_rate_squared(strain_rate: &Matrix2<f64>) -> f64 {
    strain_rate.trace().powi(2) - strain_rate.determinant()
}

/// Viscosity law used to assemble one Picard iteration.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Viscosity {
    /// `ν = viscosity`, independent of the velocity.
    ///
    /// Used for the bootstrap iteration, before a velocity estimate exists.
    Linear { viscosity: f64 },
    /// Glen's flow law with exponent 3, `ν = B ε₂^(-1/3)`.
    ///
    /// Must not be evaluated for a vanishing strain rate. The Picard iteration always starts
    /// with a linear bootstrap, whose solution has a non-degenerate strain rate.
    Nonlinear { rheology: f64 },
}

impl Viscosity {
    /// The linear viscosity Glen's law gives for the strain rate `guess_strain_rate`.
    pub fn linear_from_guess(rheology: f64, guess_strain_rate: f64) -> Self {
        Self::Linear {
            viscosity: rheology * guess_strain_rate.powi(2).powf(-1.0 / 3.0),
        }
    }

    pub fn is_nonlinear(&self) -> bool {
        matches!(self, Self::Nonlinear { .. })
    }

    /// The viscosity `ν` for the given velocity gradient. The gradient is ignored in the
    /// linear case.
    pub fn evaluate(&self, velocity_gradient: &Matrix2<f64>) -> f64 {
        match *self {
            Self::Linear { viscosity } => viscosity,
            Self::Nonlinear { rheology } => {
                let eps2 = effective_strain_rate_squared(&strain_rate(velocity_gradient));
                rheology * eps2.powf(-1.0 / 3.0)
            }
        }
    }

    /// The depth-integrated membrane stiffness for ice of the given thickness.
    pub fn membrane_stiffness(&self, thickness: f64, velocity_gradient: &Matrix2<f64>) -> MembraneStiffness {
        MembraneStiffness::from_depth_integrated_viscosity(self.evaluate(velocity_gradient) * thickness)
    }
}

use crate::assembly::GlobalSystemBuilder;
use crate::physics::Viscosity;
use crate::solver::{DiagnosticError, LinearSolver};
use log::debug;
use nalgebra::DVector;

/// State of the Picard iteration.
///
/// The iteration always starts with a linear `Bootstrap` solve, which provides the velocity
/// estimate the nonlinear viscosity of the following `Iterate` states is evaluated from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PicardState {
    Bootstrap,
    Iterate(usize),
    Done,
}

impl PicardState {
    /// The state following this one with a budget of `num_iterations` solves in total.
    pub fn next(self, num_iterations: usize) -> Self {
        let completed = match self {
            Self::Bootstrap => 1,
            Self::Iterate(k) => k + 1,
            Self::Done => return Self::Done,
        };
        if completed < num_iterations {
            Self::Iterate(completed)
        } else {
            Self::Done
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PicardOutput {
    /// Number of linear solves, the bootstrap included.
    pub iterations: usize,
    /// Conjugate gradient iterations of each linear solve.
    pub cg_iterations: Vec<usize>,
    /// `‖u_k - u_{k-1}‖ / ‖u_k‖` of each solve.
    pub relative_updates: Vec<f64>,
    /// Whether the iteration stopped before exhausting its budget.
    pub converged_early: bool,
}

/// Fixed-point iteration on the viscosity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PicardSolver {
    /// Number of linear solves, the bootstrap included.
    pub num_iterations: usize,
    /// Optional early exit on the relative update of a nonlinear iteration.
    pub tolerance: Option<f64>,
    /// Glen's law rheology coefficient `B`.
    pub rheology: f64,
    /// Strain rate used for the bootstrap viscosity.
    pub guess_strain_rate: f64,
    pub linear_solver: LinearSolver,
}

impl PicardSolver {
    /// Runs the iteration, replacing `velocity` by the final iterate.
    ///
    /// `velocity` is the initial guess for the first linear solve. On failure, `velocity` is
    /// left untouched.
    pub fn solve(&self, builder: &GlobalSystemBuilder, velocity: &mut DVector<f64>) -> Result<PicardOutput, DiagnosticError> {
        let discretization = builder.discretization();
        assert_eq!(velocity.len(), discretization.dofs().num_dofs());

        let mut output = PicardOutput::default();
        let mut current = velocity.clone();
        let mut state = PicardState::Bootstrap;

        while state != PicardState::Done {
            let (viscosity, estimate) = match state {
                PicardState::Bootstrap => (Viscosity::linear_from_guess(self.rheology, self.guess_strain_rate), None),
                _ => (Viscosity::Nonlinear { rheology: self.rheology }, Some(&current)),
            };
            let (matrix, rhs) = builder.build(viscosity, estimate)?;

            let mut next = current.clone();
            discretization.prepare_initial_guess(&mut next);
            let cg_output = self.linear_solver.solve(&matrix, &rhs, &mut next)?;
            discretization.constraints().distribute(&mut next);

            let next_norm = next.norm();
            let relative_update = if next_norm > 0.0 {
                (&next - &current).norm() / next_norm
            } else {
                0.0
            };
            debug!(
                "Picard {state:?}: {} CG iterations, relative update {relative_update:.3e}",
                cg_output.num_iterations
            );

            output.iterations += 1;
            output.cg_iterations.push(cg_output.num_iterations);
            output.relative_updates.push(relative_update);
            current = next;

            let converged = matches!(state, PicardState::Iterate(_))
                && self.tolerance.map_or(false, |tol| relative_update <= tol);
            state = state.next(self.num_iterations);
            if converged && state != PicardState::Done {
                output.converged_early = true;
                state = PicardState::Done;
            }
        }

        *velocity = current;
        Ok(output)
    }
}

use crate::solver::DiagnosticError;
use icestream_sparse::cg::{CgOutput, ConjugateGradient, RelativeResidualCriterion, SolveErrorKind};
use icestream_sparse::ilu::IncompleteLu;
use icestream_sparse::CsrMatrix;
use log::warn;
use nalgebra::DVector;

/// Conjugate gradient solver with an ILU(0) preconditioner.
///
/// The preconditioner is recomputed from the matrix in every call.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LinearSolver {
    tolerance: f64,
    max_iterations: usize,
}

impl LinearSolver {
    /// A solver that stops at the relative residual `‖r‖ <= tolerance ‖b‖`.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Solves the symmetric positive definite system `A x = b`, using `x` as initial guess.
    pub fn solve(&self, matrix: &CsrMatrix<f64>, rhs: &DVector<f64>, x: &mut DVector<f64>) -> Result<CgOutput, DiagnosticError> {
        let preconditioner = IncompleteLu::factor(matrix)
            .map_err(|err| DiagnosticError::LinearSolveBreakdown(format!("ILU(0) factorization failed: {err}")))?;
        if preconditioner.num_replaced_pivots() > 0 {
            warn!(
                "ILU(0) replaced {} non-positive pivots by diagonal entries",
                preconditioner.num_replaced_pivots()
            );
        }

        ConjugateGradient::new()
            .with_operator(matrix)
            .with_preconditioner(&preconditioner)
            .with_stopping_criterion(RelativeResidualCriterion::new(self.tolerance))
            .with_max_iter(self.max_iterations)
            .solve_with_guess(rhs, x)
            .map_err(|err| match &err.kind {
                SolveErrorKind::MaxIterationsReached { max_iter } => DiagnosticError::LinearSolveDivergence {
                    max_iterations: *max_iter,
                },
                _ => DiagnosticError::LinearSolveBreakdown(err.to_string()),
            })
    }
}

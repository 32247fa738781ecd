//! Preconditioned conjugate gradient for symmetric positive definite systems.
use crate::csr::spmv_par;
use core::fmt;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use std::error::Error;

pub type OperatorError = Box<dyn Error + Send + Sync>;

pub trait LinearOperator {
    /// Computes `y = A x`.
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), OperatorError>;
}

impl<'a, A> LinearOperator for &'a A
where
    A: ?Sized + LinearOperator,
{
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), OperatorError> {
        <A as LinearOperator>::apply(self, y, x)
    }
}

impl LinearOperator for DMatrix<f64> {
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), OperatorError> {
        y.gemv(1.0, self, x, 0.0);
        Ok(())
    }
}

impl LinearOperator for CsrMatrix<f64> {
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), OperatorError> {
        spmv_par(y, self, x);
        Ok(())
    }
}

pub struct IdentityOperator;

impl LinearOperator for IdentityOperator {
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), OperatorError> {
        y.copy_from(x);
        Ok(())
    }
}

pub trait CgStoppingCriterion {
    fn has_converged(&self, b_norm: f64, iteration: usize, approx_residual: &DVector<f64>) -> bool;
}

/// Relative residual tolerance `||r|| <= tol * ||b||`.
///
/// Note that we use the *approximate* residual given by the CG recurrence. For ill-conditioned
/// problems the recurrence residual may converge while the true residual does not, in which
/// case a better preconditioner is required anyway.
#[derive(Debug, Clone, Copy)]
pub struct RelativeResidualCriterion {
    tol: f64,
}

impl RelativeResidualCriterion {
    pub fn new(tol: f64) -> Self {
        Self { tol }
    }
}

impl Default for RelativeResidualCriterion {
    fn default() -> Self {
        Self::new(1e-8)
    }
}

impl CgStoppingCriterion for RelativeResidualCriterion {
    fn has_converged(&self, b_norm: f64, _iteration: usize, approx_residual: &DVector<f64>) -> bool {
        approx_residual.norm() <= self.tol * b_norm
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(OperatorError),
    PreconditionerError(OperatorError),
    IndefiniteOperator,
    IndefinitePreconditioner,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => write!(f, "Error applying operator: {err}"),
            Self::PreconditionerError(err) => write!(f, "Error applying preconditioner: {err}"),
            Self::IndefiniteOperator => write!(f, "Operator appears to be indefinite"),
            Self::IndefinitePreconditioner => write!(f, "Indefinite preconditioner"),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "Max iterations ({}) reached", max_iter)
            }
        }
    }
}

#[derive(Debug)]
pub struct SolveError {
    pub output: CgOutput,
    pub kind: SolveErrorKind,
}

impl SolveError {
    fn new(output: CgOutput, kind: SolveErrorKind) -> Self {
        Self { output, kind }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CG solve failed after {} iterations: {}",
            self.output.num_iterations, self.kind
        )
    }
}

impl Error for SolveError {}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct CgOutput {
    /// Number of updates made to the (initial) solution vector.
    pub num_iterations: usize,
    /// Norm of the recurrence residual at termination.
    pub residual_norm: f64,
}

#[derive(Debug)]
pub struct ConjugateGradient<A, P, Criterion> {
    operator: A,
    preconditioner: P,
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
}

impl ConjugateGradient<(), IdentityOperator, ()> {
    pub fn new() -> Self {
        Self {
            operator: (),
            preconditioner: IdentityOperator,
            stopping_criterion: (),
            max_iter: None,
        }
    }
}

impl Default for ConjugateGradient<(), IdentityOperator, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, Criterion> ConjugateGradient<(), P, Criterion> {
    pub fn with_operator<A>(self, operator: A) -> ConjugateGradient<A, P, Criterion> {
        ConjugateGradient {
            operator,
            preconditioner: self.preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

impl<A, P, Criterion> ConjugateGradient<A, P, Criterion> {
    pub fn with_preconditioner<P2>(self, preconditioner: P2) -> ConjugateGradient<A, P2, Criterion> {
        ConjugateGradient {
            operator: self.operator,
            preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }
}

impl<A, P> ConjugateGradient<A, P, ()> {
    pub fn with_stopping_criterion<Criterion>(self, stopping_criterion: Criterion) -> ConjugateGradient<A, P, Criterion> {
        ConjugateGradient {
            operator: self.operator,
            preconditioner: self.preconditioner,
            stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

impl<A, P, Criterion> ConjugateGradient<A, P, Criterion>
where
    A: LinearOperator,
    P: LinearOperator,
    Criterion: CgStoppingCriterion,
{
    /// Solves `A x = b`, starting from the current contents of `x`.
    #[allow(non_snake_case)]
    pub fn solve_with_guess(&self, b: &DVector<f64>, x: &mut DVector<f64>) -> Result<CgOutput, SolveError> {
        use SolveErrorKind::*;
        assert_eq!(b.len(), x.len());

        let n = x.len();
        let mut output = CgOutput {
            num_iterations: 0,
            residual_norm: 0.0,
        };

        let b_norm = b.norm();
        if b_norm == 0.0 {
            x.fill(0.0);
            return Ok(output);
        }

        let mut r = DVector::zeros(n);
        let mut z = DVector::zeros(n);
        let mut Ap = DVector::zeros(n);

        // r = b - Ax
        if let Err(err) = self.operator.apply(&mut r, x) {
            return Err(SolveError::new(output, OperatorError(err)));
        }
        r.neg_mut();
        r += b;

        // z = Pr
        if let Err(err) = self.preconditioner.apply(&mut z, &r) {
            return Err(SolveError::new(output, PreconditionerError(err)));
        }

        let mut p = z.clone();
        let mut zTr = z.dot(&r);

        loop {
            output.residual_norm = r.norm();
            if self
                .stopping_criterion
                .has_converged(b_norm, output.num_iterations, &r)
            {
                break;
            } else if let Some(max_iter) = self.max_iter {
                if output.num_iterations >= max_iter {
                    return Err(SolveError::new(output, MaxIterationsReached { max_iter }));
                }
            }

            // Ap = A * p
            if let Err(err) = self.operator.apply(&mut Ap, &p) {
                return Err(SolveError::new(output, OperatorError(err)));
            }
            let pAp = p.dot(&Ap);

            if pAp <= 0.0 {
                return Err(SolveError::new(output, IndefiniteOperator));
            }
            if zTr <= 0.0 {
                return Err(SolveError::new(output, IndefinitePreconditioner));
            }

            let alpha = zTr / pAp;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &Ap, 1.0);
            output.num_iterations += 1;

            // z <- P r
            if let Err(err) = self.preconditioner.apply(&mut z, &r) {
                return Err(SolveError::new(output, PreconditionerError(err)));
            }
            let zTr_next = z.dot(&r);
            let beta = zTr_next / zTr;

            // p <- z + beta * p
            p.axpy(1.0, &z, beta);
            zTr = zTr_next;
        }

        Ok(output)
    }
}

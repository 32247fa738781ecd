//! Linear and nonlinear solvers for the diagnostic velocity.
use crate::config::ConfigError;
use std::fmt;
use std::fmt::{Display, Formatter};

mod linear;
mod picard;

pub use linear::*;
pub use picard::*;

/// Failure of a diagnostic velocity solve.
///
/// All variants are fatal for the current solve: no partial velocity is returned.
#[derive(Debug)]
#[non_exhaustive]
pub enum DiagnosticError {
    /// The conjugate gradient solver did not reach its tolerance within the iteration budget.
    LinearSolveDivergence { max_iterations: usize },
    /// The conjugate gradient solver or its preconditioner broke down.
    LinearSolveBreakdown(String),
    /// A cell contribution could not be computed.
    Assembly(eyre::Report),
    Config(ConfigError),
    /// Reporting the results of a cycle failed.
    Report(eyre::Report),
}

impl Display for DiagnosticError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinearSolveDivergence { max_iterations } => write!(
                f,
                "linear solve did not converge within {max_iterations} iterations"
            ),
            Self::LinearSolveBreakdown(reason) => write!(f, "linear solve broke down: {reason}"),
            Self::Assembly(err) => write!(f, "assembly failed: {err}"),
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::Report(err) => write!(f, "reporting failed: {err}"),
        }
    }
}

impl std::error::Error for DiagnosticError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Assembly(err) | Self::Report(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ConfigError> for DiagnosticError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

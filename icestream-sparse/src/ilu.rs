//! Incomplete LU factorization with zero fill-in.
use crate::cg::{LinearOperator, OperatorError};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FactorizationError {
    NotSquare { nrows: usize, ncols: usize },
    MissingDiagonal { row: usize },
}

impl fmt::Display for FactorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSquare { nrows, ncols } => {
                write!(f, "cannot factor a non-square {nrows}x{ncols} matrix")
            }
            Self::MissingDiagonal { row } => {
                write!(f, "diagonal entry of row {row} is not part of the sparsity pattern")
            }
        }
    }
}

impl Error for FactorizationError {}

/// ILU(0) factors `L U ≈ A` stored in the sparsity pattern of `A`.
///
/// `L` is unit lower triangular and stored strictly below the diagonal, `U` on and above it.
/// For a symmetric matrix the factorization is equivalent to an incomplete `L D Lᵀ`
/// factorization, so the preconditioner stays symmetric and is suitable for CG.
#[derive(Debug, Clone)]
pub struct IncompleteLu {
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f64>,
    diagonal_positions: Vec<usize>,
    num_replaced_pivots: usize,
}

impl IncompleteLu {
    /// Computes the factorization.
    ///
    /// Pivots that are not positive are replaced by the magnitude of the original diagonal
    /// entry (or one, if that is zero). The number of such replacements is reported by
    /// [`num_replaced_pivots`](Self::num_replaced_pivots).
    pub fn factor(matrix: &CsrMatrix<f64>) -> Result<Self, FactorizationError> {
        let n = matrix.nrows();
        if matrix.ncols() != n {
            return Err(FactorizationError::NotSquare {
                nrows: n,
                ncols: matrix.ncols(),
            });
        }

        let row_offsets = matrix.row_offsets().to_vec();
        let col_indices = matrix.col_indices().to_vec();
        let mut values = matrix.values().to_vec();

        let mut diagonal_positions = Vec::with_capacity(n);
        for i in 0..n {
            let (start, end) = (row_offsets[i], row_offsets[i + 1]);
            let local = col_indices[start..end]
                .binary_search(&i)
                .map_err(|_| FactorizationError::MissingDiagonal { row: i })?;
            diagonal_positions.push(start + local);
        }

        let mut num_replaced_pivots = 0;
        for i in 0..n {
            let end = row_offsets[i + 1];
            let d_i = diagonal_positions[i];
            let original_diagonal = values[d_i];

            for kk in row_offsets[i]..d_i {
                let k = col_indices[kk];
                let l_ik = values[kk] / values[diagonal_positions[k]];
                values[kk] = l_ik;

                // Eliminate with the strictly upper part of row k, restricted to the pattern
                let (k_start, k_end) = (diagonal_positions[k] + 1, row_offsets[k + 1]);
                for jj in (kk + 1)..end {
                    let j = col_indices[jj];
                    if let Ok(local) = col_indices[k_start..k_end].binary_search(&j) {
                        let u_kj = values[k_start + local];
                        values[jj] -= l_ik * u_kj;
                    }
                }
            }

            if !(values[d_i] > f64::EPSILON * original_diagonal.abs()) {
                num_replaced_pivots += 1;
                values[d_i] = if original_diagonal != 0.0 {
                    original_diagonal.abs()
                } else {
                    1.0
                };
            }
        }

        Ok(Self {
            row_offsets,
            col_indices,
            values,
            diagonal_positions,
            num_replaced_pivots,
        })
    }

    pub fn nrows(&self) -> usize {
        self.diagonal_positions.len()
    }

    pub fn num_replaced_pivots(&self) -> usize {
        self.num_replaced_pivots
    }

    /// Solves `L U z = r` in place.
    pub fn solve_in_place(&self, z: &mut DVector<f64>) {
        assert_eq!(z.len(), self.nrows());
        let n = self.nrows();

        for i in 0..n {
            let mut sum = z[i];
            for kk in self.row_offsets[i]..self.diagonal_positions[i] {
                sum -= self.values[kk] * z[self.col_indices[kk]];
            }
            z[i] = sum;
        }

        for i in (0..n).rev() {
            let d_i = self.diagonal_positions[i];
            let mut sum = z[i];
            for kk in (d_i + 1)..self.row_offsets[i + 1] {
                sum -= self.values[kk] * z[self.col_indices[kk]];
            }
            z[i] = sum / self.values[d_i];
        }
    }
}

impl LinearOperator for IncompleteLu {
    fn apply(&self, y: &mut DVector<f64>, x: &DVector<f64>) -> Result<(), OperatorError> {
        y.copy_from(x);
        self.solve_in_place(y);
        Ok(())
    }
}

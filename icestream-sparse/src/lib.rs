//! Sparse matrix functionality for `icestream`.
//!
//! Matrices are stored as [`nalgebra_sparse::CsrMatrix`]. This crate adds the pieces the
//! velocity solver needs on top of that: sparsity pattern construction from element
//! coordinates, in-place scatter into CSR rows, a row-parallel matrix-vector product,
//! an ILU(0) preconditioner and a preconditioned conjugate gradient solver.
pub mod cg;
pub mod ilu;

mod csr;

pub use csr::*;
pub use nalgebra_sparse::csr::CsrRowMut;
pub use nalgebra_sparse::pattern::SparsityPattern;
pub use nalgebra_sparse::{CooMatrix, CsrMatrix};

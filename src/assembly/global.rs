//! Global assembly into CSR matrices and Dirichlet boundary conditions.
use crate::assembly::local::{CellConnectivityAssembler, CellSystemAssembler};
use icestream_sparse::{add_to_csr_row, diagonal_scale, pattern_from_coordinates, CsrMatrix, SparsityPattern};
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorViewMut};
use rayon::prelude::*;
use std::ops::Range;

/// Number of cells whose local systems are held in memory at once during parallel assembly.
const PARALLEL_CHUNK_SIZE: usize = 4096;

/// An assembler for CSR matrices and their load vectors.
///
/// Cell contributions are computed independently (in parallel, unless disabled) into private
/// buffers and then scattered into the global system serially in cell order, so that results do
/// not depend on the number of threads.
#[derive(Debug, Clone)]
pub struct CsrAssembler {
    parallel: bool,
}

impl Default for CsrAssembler {
    fn default() -> Self {
        Self { parallel: true }
    }
}

struct LocalSystem {
    dofs: Vec<usize>,
    matrix: DMatrix<f64>,
    vector: DVector<f64>,
}

fn populate_cell_dofs<A>(assembler: &A, cell: usize, nodes: &mut Vec<usize>, dofs: &mut Vec<usize>)
where
    A: ?Sized + CellConnectivityAssembler,
{
    let sdim = assembler.solution_dim();
    nodes.resize(assembler.cell_node_count(cell), usize::MAX);
    assembler.populate_cell_nodes(nodes, cell);
    dofs.clear();
    dofs.extend(
        nodes
            .iter()
            .flat_map(|node| (0..sdim).map(move |i| sdim * node + i)),
    );
}

fn compute_local_system(assembler: &dyn CellSystemAssembler, cell: usize) -> eyre::Result<LocalSystem> {
    let mut nodes = Vec::new();
    let mut dofs = Vec::new();
    populate_cell_dofs(assembler, cell, &mut nodes, &mut dofs);
    let n = dofs.len();
    let mut matrix = DMatrix::zeros(n, n);
    let mut vector = DVector::zeros(n);
    assembler.assemble_cell_system_into(cell, DMatrixViewMut::from(&mut matrix), DVectorViewMut::from(&mut vector))?;
    Ok(LocalSystem { dofs, matrix, vector })
}

impl CsrAssembler {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    pub fn assemble_pattern(&self, assembler: &dyn CellConnectivityAssembler) -> SparsityPattern {
        let mut nodes = Vec::new();
        let mut dofs = Vec::new();
        let mut coordinates = Vec::new();
        for cell in 0..assembler.num_cells() {
            populate_cell_dofs(assembler, cell, &mut nodes, &mut dofs);
            for &i in &dofs {
                coordinates.extend(dofs.iter().map(|&j| (i, j)));
            }
        }
        pattern_from_coordinates(assembler.solution_dim() * assembler.num_nodes(), coordinates)
    }

    /// Adds the contributions of all cells to `matrix` and `rhs`.
    ///
    /// The matrix pattern must contain the pattern returned by
    /// [`assemble_pattern`](Self::assemble_pattern).
    pub fn assemble_system_into(
        &self,
        matrix: &mut CsrMatrix<f64>,
        rhs: &mut DVector<f64>,
        assembler: &(dyn CellSystemAssembler + Sync),
    ) -> eyre::Result<()> {
        let num_cells = assembler.num_cells();
        let mut row_values = Vec::new();
        for chunk_start in (0..num_cells).step_by(PARALLEL_CHUNK_SIZE) {
            let chunk: Range<usize> = chunk_start..num_cells.min(chunk_start + PARALLEL_CHUNK_SIZE);
            let local_systems: Vec<LocalSystem> = if self.parallel {
                chunk
                    .into_par_iter()
                    .map(|cell| compute_local_system(assembler, cell))
                    .collect::<eyre::Result<_>>()?
            } else {
                chunk
                    .map(|cell| compute_local_system(assembler, cell))
                    .collect::<eyre::Result<_>>()?
            };

            for local in &local_systems {
                for (local_row, &global_row) in local.dofs.iter().enumerate() {
                    row_values.clear();
                    row_values.extend(local.matrix.row(local_row).iter().copied());
                    add_to_csr_row(&mut matrix.row_mut(global_row), &local.dofs, &row_values);
                    rhs[global_row] += local.vector[local_row];
                }
            }
        }
        Ok(())
    }

    pub fn assemble_system(
        &self,
        pattern: &SparsityPattern,
        assembler: &(dyn CellSystemAssembler + Sync),
    ) -> eyre::Result<(CsrMatrix<f64>, DVector<f64>)> {
        let mut matrix = icestream_sparse::zeroed_csr(pattern);
        let mut rhs = DVector::zeros(matrix.nrows());
        self.assemble_system_into(&mut matrix, &mut rhs, assembler)?;
        Ok((matrix, rhs))
    }
}

/// Imposes `u[dof] = value` for the given `(dof, value)` pairs on a symmetric system.
///
/// Rows and columns of prescribed DoFs are eliminated: the known column contributions are
/// moved to the right-hand side, the rows and columns are zeroed and the diagonal entry is
/// replaced by a representative diagonal entry of the matrix (scaling the right-hand side
/// accordingly). The resulting system is symmetric and reproduces the prescribed values exactly.
pub fn apply_dirichlet_bc(matrix: &mut CsrMatrix<f64>, rhs: &mut DVector<f64>, boundary_values: &[(usize, f64)]) {
    assert_eq!(matrix.nrows(), rhs.len());

    // Simply setting 1 would ignore the scaling of the entries of the matrix, leading to
    // potentially poor condition numbers
    let scale = diagonal_scale(matrix);

    let mut prescribed = vec![None; matrix.nrows()];
    for &(dof, value) in boundary_values {
        prescribed[dof] = Some(value);
    }

    // Zeroing all columns naively would visit every entry of the matrix. By symmetry, if
    // (r, c) is non-zero for a prescribed row r, then row c is the only row that can contain a
    // non-zero in column r, so it suffices to visit those rows afterwards
    let mut rows_to_visit = vec![false; matrix.nrows()];
    for &(row_index, value) in boundary_values {
        let mut row = matrix.row_mut(row_index);
        let (cols, values) = row.cols_and_values_mut();
        for (&col_index, entry) in cols.iter().zip(values) {
            if col_index == row_index {
                *entry = scale;
            } else {
                *entry = 0.0;
                rows_to_visit[col_index] = true;
            }
        }
        rhs[row_index] = scale * value;
    }

    for row_index in (0..matrix.nrows()).filter(|&i| rows_to_visit[i] && prescribed[i].is_none()) {
        let mut row = matrix.row_mut(row_index);
        let (cols, values) = row.cols_and_values_mut();
        for (&col_index, entry) in cols.iter().zip(values) {
            if let Some(value) = prescribed[col_index] {
                rhs[row_index] -= *entry * value;
                *entry = 0.0;
            }
        }
    }
}

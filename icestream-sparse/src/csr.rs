use nalgebra::DVector;
use nalgebra_sparse::csr::CsrRowMut;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

/// Builds a square sparsity pattern from (possibly duplicate, unsorted) matrix coordinates.
///
/// # Panics
///
/// Panics if a coordinate is out of bounds.
pub fn pattern_from_coordinates(num_rows: usize, mut coordinates: Vec<(usize, usize)>) -> SparsityPattern {
    coordinates.par_sort_unstable();
    coordinates.dedup();

    let mut row_offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::with_capacity(coordinates.len());
    row_offsets.push(0);

    let mut current_row = 0;
    for (i, j) in coordinates {
        assert!(i < num_rows && j < num_rows, "Coordinates must be in bounds");
        while i > current_row {
            row_offsets.push(column_indices.len());
            current_row += 1;
        }
        column_indices.push(j);
    }

    // Fill out offsets for remaining empty rows
    while row_offsets.len() < num_rows + 1 {
        row_offsets.push(column_indices.len());
    }

    SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, row_offsets, column_indices)
        .expect("Sorted, deduplicated coordinates always form a valid pattern")
}

/// Creates a CSR matrix with the given pattern and all stored values set to zero.
pub fn zeroed_csr(pattern: &SparsityPattern) -> CsrMatrix<f64> {
    let values = vec![0.0; pattern.nnz()];
    CsrMatrix::try_from_pattern_and_values(pattern.clone(), values)
        .expect("Value count matches the pattern by construction")
}

/// Adds `values[k]` to the entry at column `columns[k]` of the given CSR row.
///
/// # Panics
///
/// Panics if a column is not part of the row's sparsity pattern.
pub fn add_to_csr_row(row: &mut CsrRowMut<f64>, columns: &[usize], values: &[f64]) {
    assert_eq!(columns.len(), values.len());
    let (row_columns, row_values) = row.cols_and_values_mut();
    for (column, value) in columns.iter().zip(values) {
        let local_index = row_columns
            .binary_search(column)
            .expect("Could not find column index in CSR row");
        row_values[local_index] += *value;
    }
}

/// Computes `y = A x`, distributing rows over the rayon thread pool.
///
/// # Panics
///
/// Panics if the dimensions are inconsistent.
pub fn spmv_par(y: &mut DVector<f64>, a: &CsrMatrix<f64>, x: &DVector<f64>) {
    assert_eq!(y.len(), a.nrows());
    assert_eq!(x.len(), a.ncols());
    y.as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .with_min_len(256)
        .for_each(|(i, y_i)| {
            let row = a.row(i);
            *y_i = row
                .col_indices()
                .iter()
                .zip(row.values())
                .map(|(&j, &a_ij)| a_ij * x[j])
                .sum();
        });
}

/// A representative diagonal magnitude: the first non-zero diagonal entry, or one.
///
/// Used when replacing eliminated rows so that the replacement diagonal is commensurate with
/// the rest of the matrix.
pub fn diagonal_scale(matrix: &CsrMatrix<f64>) -> f64 {
    (0..matrix.nrows())
        .filter_map(|i| {
            let row = matrix.row(i);
            row.col_indices()
                .binary_search(&i)
                .ok()
                .map(|local| row.values()[local])
        })
        .find(|&a_ii| a_ii != 0.0)
        .map(f64::abs)
        .unwrap_or(1.0)
}

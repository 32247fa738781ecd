//! Hanging-node constraints.
//!
//! Local refinement leaves vertices (and, for quadratic elements, edge nodes) on the fine side
//! of an edge that have no counterpart on the coarse side. Continuity across such an edge is
//! enforced by expressing the values at these *dependent* DoFs as linear combinations of the
//! *independent* DoFs of the coarse edge.
//!
//! A linear system `K u = f` is reduced to the independent DoFs by substituting `u = P û`,
//! which gives `Pᵀ K P û = Pᵀ f` ([`ConstraintSet::condense_system`]); after solving, the
//! dependent values are restored with [`ConstraintSet::distribute`].
use crate::dofs::{DofMap, SOLUTION_DIM};
use crate::element::LagrangeBasis;
use crate::mesh::{AdaptiveMesh, EdgeTopology, FaceNeighbor};
use icestream_sparse::{add_to_csr_row, diagonal_scale, pattern_from_coordinates, zeroed_csr};
use icestream_sparse::{CsrMatrix, SparsityPattern};
use nalgebra::DVector;
use std::collections::BTreeMap;

/// A set of constraints `u_d = Σ w_j u_j` mapping dependent DoFs to weighted independent DoFs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    constraints: BTreeMap<usize, Vec<(usize, f64)>>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the constraint of a dependent DoF.
    ///
    /// The right-hand side may reference other dependent DoFs until [`close`](Self::close) is
    /// called.
    pub fn add_constraint(&mut self, dependent: usize, entries: Vec<(usize, f64)>) {
        self.constraints.insert(dependent, entries);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn is_constrained(&self, dof: usize) -> bool {
        self.constraints.contains_key(&dof)
    }

    pub fn constraint(&self, dof: usize) -> Option<&[(usize, f64)]> {
        self.constraints.get(&dof).map(Vec::as_slice)
    }

    /// Constraints ordered by dependent DoF.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[(usize, f64)])> {
        self.constraints
            .iter()
            .map(|(&dof, entries)| (dof, entries.as_slice()))
    }

    /// Whether no constraint references a dependent DoF.
    pub fn is_closed(&self) -> bool {
        self.constraints
            .values()
            .flatten()
            .all(|(j, _)| !self.constraints.contains_key(j))
    }

    /// Substitutes dependent DoFs on right-hand sides until only independent DoFs remain.
    ///
    /// Entries referencing the same independent DoF are merged.
    ///
    /// # Panics
    ///
    /// Panics if the constraints are cyclic.
    pub fn close(&mut self) {
        // Every pass resolves at least one level of nesting
        for _ in 0..=self.constraints.len() {
            let open: Vec<usize> = self
                .constraints
                .iter()
                .filter(|(_, entries)| entries.iter().any(|(j, _)| self.constraints.contains_key(j)))
                .map(|(&dof, _)| dof)
                .collect();
            if open.is_empty() {
                return;
            }

            for dependent in open {
                let mut expanded = BTreeMap::new();
                for &(j, w) in &self.constraints[&dependent] {
                    match self.constraints.get(&j) {
                        Some(nested) => {
                            for &(k, w_k) in nested {
                                *expanded.entry(k).or_insert(0.0) += w * w_k;
                            }
                        }
                        None => *expanded.entry(j).or_insert(0.0) += w,
                    }
                }
                self.constraints
                    .insert(dependent, expanded.into_iter().collect());
            }
        }
        panic!("Constraints are cyclic");
    }

    fn for_each_independent(&self, dof: usize, mut f: impl FnMut(usize, f64)) {
        match self.constraints.get(&dof) {
            Some(entries) => entries.iter().for_each(|&(j, w)| f(j, w)),
            None => f(dof, 1.0),
        }
    }

    /// Projects onto the independent DoFs by zeroing all dependent entries.
    pub fn condense_vector(&self, v: &mut DVector<f64>) {
        for &dof in self.constraints.keys() {
            v[dof] = 0.0;
        }
    }

    /// Sets every dependent DoF from its independent DoFs.
    ///
    /// The constraints must be closed.
    pub fn distribute(&self, v: &mut DVector<f64>) {
        debug_assert!(self.is_closed());
        for (&dof, entries) in &self.constraints {
            v[dof] = entries.iter().map(|&(j, w)| w * v[j]).sum();
        }
    }

    /// The sparsity pattern of `Pᵀ K P` for a matrix `K` with the given pattern.
    ///
    /// Rows of dependent DoFs only contain the diagonal.
    pub fn condensed_pattern(&self, pattern: &SparsityPattern) -> SparsityPattern {
        let mut coordinates = Vec::with_capacity(pattern.nnz());
        for i in 0..pattern.major_dim() {
            let lane = pattern.lane(i);
            self.for_each_independent(i, |ii, _| {
                for &j in lane {
                    self.for_each_independent(j, |jj, _| coordinates.push((ii, jj)));
                }
            });
        }
        coordinates.extend(self.constraints.keys().map(|&dof| (dof, dof)));
        pattern_from_coordinates(pattern.major_dim(), coordinates)
    }

    /// Condenses a linear system onto the independent DoFs.
    ///
    /// Computes `Pᵀ K P` and `Pᵀ f`. Dependent DoFs keep a trivial equation with a diagonal
    /// entry commensurate with the rest of the matrix and a zero right-hand side, so the
    /// condensed system stays non-singular and its solution is zero at dependent DoFs.
    ///
    /// The constraints must be closed and `condensed_pattern` must be the result of
    /// [`condensed_pattern`](Self::condensed_pattern) for the pattern of `matrix`.
    pub fn condense_system(
        &self,
        matrix: &CsrMatrix<f64>,
        rhs: &DVector<f64>,
        condensed_pattern: &SparsityPattern,
    ) -> (CsrMatrix<f64>, DVector<f64>) {
        debug_assert!(self.is_closed());
        assert_eq!(matrix.nrows(), rhs.len());

        let mut condensed = zeroed_csr(condensed_pattern);
        let mut condensed_rhs = DVector::zeros(rhs.len());

        for i in 0..matrix.nrows() {
            let row = matrix.row(i);
            self.for_each_independent(i, |ii, w_i| {
                condensed_rhs[ii] += w_i * rhs[i];
                let mut target = condensed.row_mut(ii);
                for (&j, &k_ij) in row.col_indices().iter().zip(row.values()) {
                    self.for_each_independent(j, |jj, w_j| {
                        add_to_csr_row(&mut target, &[jj], &[w_i * w_j * k_ij]);
                    });
                }
            });
        }

        let scale = diagonal_scale(matrix);
        for &dof in self.constraints.keys() {
            add_to_csr_row(&mut condensed.row_mut(dof), &[dof], &[scale]);
            condensed_rhs[dof] = 0.0;
        }

        (condensed, condensed_rhs)
    }
}

/// Weights of the coarse edge nodes `(a, midpoint, b)` at the fine edge node at a quarter of
/// the edge from `a`, for quadratic elements.
const QUARTER_POINT_WEIGHTS: [f64; 3] = [3.0 / 8.0, 3.0 / 4.0, -1.0 / 8.0];

/// Builds the closed set of hanging-node constraints for the current mesh generation.
pub fn hanging_node_constraints(mesh: &AdaptiveMesh, topology: &EdgeTopology, dofs: &DofMap) -> ConstraintSet {
    let mut constraints = ConstraintSet::new();
    let mut add_node_constraint = |dependent: usize, entries: &[(usize, f64)]| {
        for c in 0..SOLUTION_DIM {
            let entries = entries
                .iter()
                .map(|&(node, w)| (SOLUTION_DIM * node + c, w))
                .collect();
            constraints.add_constraint(SOLUTION_DIM * dependent + c, entries);
        }
    };

    for position in 0..mesh.num_active_cells() {
        let cell = mesh.cell(dofs.cell(position));
        for (k, neighbor) in topology.cell_faces(position).iter().enumerate() {
            let FaceNeighbor::Finer { midpoint, .. } = *neighbor else {
                continue;
            };
            let [a, b] = cell.face_vertices(k);
            let vertex_node = |v| dofs.vertex_node(v).expect("Vertices of active cells have nodes");
            let (node_a, node_m, node_b) = (vertex_node(a), vertex_node(midpoint), vertex_node(b));

            match dofs.basis() {
                LagrangeBasis::Linear => {
                    add_node_constraint(node_m, &[(node_a, 0.5), (node_b, 0.5)]);
                }
                LagrangeBasis::Quadratic => {
                    let [w_near, w_mid, w_far] = QUARTER_POINT_WEIGHTS;
                    let quarter_a = dofs
                        .edge_node(a, midpoint)
                        .expect("Half edges of finer neighbors have edge nodes");
                    let quarter_b = dofs
                        .edge_node(midpoint, b)
                        .expect("Half edges of finer neighbors have edge nodes");
                    add_node_constraint(quarter_a, &[(node_a, w_near), (node_m, w_mid), (node_b, w_far)]);
                    add_node_constraint(quarter_b, &[(node_a, w_far), (node_m, w_mid), (node_b, w_near)]);
                }
            }
        }
    }

    constraints.close();
    constraints
}

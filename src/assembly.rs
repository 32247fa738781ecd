//! Assembly of the SSA linear systems.
//!
//! [`local`] computes the stiffness and load of single cells, [`global`] scatters them into a
//! CSR system. The [`GlobalSystemBuilder`] combines both with hanging-node condensation and
//! Dirichlet elimination to produce the system solved in each Picard iteration.
use crate::assembly::global::{apply_dirichlet_bc, CsrAssembler};
use crate::assembly::local::SsaCellAssembler;
use crate::constraints::{hanging_node_constraints, ConstraintSet};
use crate::dofs::DofMap;
use crate::element::LagrangeBasis;
use crate::fields::{IceSurface, VectorField};
use crate::mesh::{AdaptiveMesh, EdgeTopology};
use crate::physics::Viscosity;
use crate::solver::DiagnosticError;
use icestream_sparse::{CsrMatrix, SparsityPattern};
use log::debug;
use nalgebra::DVector;

pub mod global;
pub mod local;

/// Everything derived from one mesh generation: topology, DoF map, hanging-node constraints,
/// sparsity patterns and Dirichlet boundary values.
///
/// Vectors and matrices sized for one discretization are invalid for any other.
#[derive(Debug, Clone)]
pub struct Discretization {
    topology: EdgeTopology,
    dofs: DofMap,
    constraints: ConstraintSet,
    pattern: SparsityPattern,
    condensed_pattern: SparsityPattern,
    boundary_values: Vec<(usize, f64)>,
}

impl Discretization {
    /// Sets up the discretization of the current mesh generation, with Dirichlet values taken
    /// from `boundary_velocity` on faces with one of the `dirichlet_markers`.
    pub fn new(
        mesh: &AdaptiveMesh,
        basis: LagrangeBasis,
        boundary_velocity: &dyn VectorField,
        dirichlet_markers: &[u32],
    ) -> Self {
        let topology = mesh.topology();
        let dofs = DofMap::new(mesh, &topology, basis);
        let constraints = hanging_node_constraints(mesh, &topology, &dofs);
        let pattern = CsrAssembler::default().assemble_pattern(&dofs);
        let condensed_pattern = constraints.condensed_pattern(&pattern);
        let boundary_values = dofs.boundary_values(boundary_velocity, dirichlet_markers);
        debug!(
            "Generation {}: {} DoFs, {} hanging-node constraints, {} Dirichlet DoFs, {} matrix entries",
            mesh.generation(),
            dofs.num_dofs(),
            constraints.len(),
            boundary_values.len(),
            condensed_pattern.nnz()
        );
        Self {
            topology,
            dofs,
            constraints,
            pattern,
            condensed_pattern,
            boundary_values,
        }
    }

    pub fn generation(&self) -> usize {
        self.dofs.generation()
    }

    pub fn topology(&self) -> &EdgeTopology {
        &self.topology
    }

    pub fn dofs(&self) -> &DofMap {
        &self.dofs
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Pattern of the assembled (unconstrained) matrix.
    pub fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    /// Pattern of the matrix after hanging-node condensation.
    pub fn condensed_pattern(&self) -> &SparsityPattern {
        &self.condensed_pattern
    }

    /// Prescribed `(dof, value)` pairs, sorted by DoF.
    pub fn boundary_values(&self) -> &[(usize, f64)] {
        &self.boundary_values
    }

    pub fn impose_boundary_values(&self, u: &mut DVector<f64>) {
        for &(dof, value) in &self.boundary_values {
            u[dof] = value;
        }
    }

    /// Turns a velocity into an initial guess for the condensed system: boundary values are
    /// imposed and dependent DoFs zeroed.
    pub fn prepare_initial_guess(&self, u: &mut DVector<f64>) {
        self.impose_boundary_values(u);
        self.constraints.condense_vector(u);
    }
}

/// Builds the condensed, boundary-eliminated system of one Picard iteration.
pub struct GlobalSystemBuilder<'a> {
    mesh: &'a AdaptiveMesh,
    discretization: &'a Discretization,
    surface: IceSurface<'a>,
    calving_front_marker: u32,
    assembler: CsrAssembler,
}

impl<'a> GlobalSystemBuilder<'a> {
    /// # Panics
    ///
    /// Panics if the discretization does not belong to the current mesh generation.
    pub fn new(
        mesh: &'a AdaptiveMesh,
        discretization: &'a Discretization,
        surface: IceSurface<'a>,
        calving_front_marker: u32,
        parallel: bool,
    ) -> Self {
        assert_eq!(
            mesh.generation(),
            discretization.generation(),
            "Discretization must belong to the current mesh generation"
        );
        Self {
            mesh,
            discretization,
            surface,
            calving_front_marker,
            assembler: CsrAssembler::new(parallel),
        }
    }

    pub fn discretization(&self) -> &'a Discretization {
        self.discretization
    }

    /// Assembles the unconstrained system `K u = f` for the given viscosity law.
    ///
    /// The nonlinear viscosity is evaluated from `velocity`, which must be given in that case.
    pub fn assemble(
        &self,
        viscosity: Viscosity,
        velocity: Option<&DVector<f64>>,
    ) -> Result<(CsrMatrix<f64>, DVector<f64>), DiagnosticError> {
        let dofs = self.discretization.dofs();
        let mut cell_assembler =
            SsaCellAssembler::new(self.mesh, dofs, self.surface, viscosity, self.calving_front_marker);
        if let Some(velocity) = velocity {
            cell_assembler = cell_assembler.with_velocity(velocity);
        }
        self.assembler
            .assemble_system(self.discretization.pattern(), &cell_assembler)
            .map_err(DiagnosticError::Assembly)
    }

    /// Assembles the system and reduces it to the constrained, boundary-eliminated form.
    ///
    /// Every call rebuilds the system from scratch.
    pub fn build(
        &self,
        viscosity: Viscosity,
        velocity: Option<&DVector<f64>>,
    ) -> Result<(CsrMatrix<f64>, DVector<f64>), DiagnosticError> {
        let (matrix, rhs) = self.assemble(viscosity, velocity)?;
        let discretization = self.discretization;
        let (mut matrix, mut rhs) =
            discretization
                .constraints()
                .condense_system(&matrix, &rhs, discretization.condensed_pattern());
        apply_dirichlet_bc(&mut matrix, &mut rhs, discretization.boundary_values());
        Ok((matrix, rhs))
    }
}

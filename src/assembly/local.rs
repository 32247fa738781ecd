//! Cell-local assembly of the SSA momentum balance.
use crate::constants::PhysicalConstants;
use crate::dofs::{DofMap, SOLUTION_DIM};
use crate::element::{transform_gradients, LagrangeBasis, TriangleElement};
use crate::fields::{IceSurface, ScalarField};
use crate::mesh::AdaptiveMesh;
use crate::physics::Viscosity;
use eyre::eyre;
use icestream_quadrature::{Rule1d, Rule2d};
use itertools::izip;
use nalgebra::{DMatrixViewMut, DVector, DVectorViewMut, Matrix2, Point2, Vector2};

pub trait CellConnectivityAssembler {
    fn solution_dim(&self) -> usize;

    fn num_cells(&self) -> usize;

    fn num_nodes(&self) -> usize;

    fn cell_node_count(&self, cell: usize) -> usize;

    fn populate_cell_nodes(&self, output: &mut [usize], cell: usize);
}

pub trait CellSystemAssembler: CellConnectivityAssembler {
    /// Computes the cell stiffness matrix and load vector.
    ///
    /// Both outputs are sized `solution_dim * cell_node_count` and zeroed by the caller.
    fn assemble_cell_system_into(
        &self,
        cell: usize,
        matrix: DMatrixViewMut<f64>,
        vector: DVectorViewMut<f64>,
    ) -> eyre::Result<()>;
}

/// Assembles the SSA stiffness and load of the active cells of a mesh.
///
/// Cells are identified by their position in the active list. The stiffness block of the basis
/// functions `φ_i`, `φ_j` is `∫ C(∇φ_i, ∇φ_j)` with the membrane stiffness of the selected
/// viscosity law, and the load is the driving stress `-ρ_ice g h ∇s` plus, on calving-front
/// faces, the net hydrostatic pressure `½ g (ρ_ice h² - ρ_water b²) n` with `b = s - h`.
pub struct SsaCellAssembler<'a> {
    mesh: &'a AdaptiveMesh,
    dofs: &'a DofMap,
    surface: IceSurface<'a>,
    constants: PhysicalConstants,
    viscosity: Viscosity,
    velocity: Option<&'a DVector<f64>>,
    calving_front_marker: u32,
    cell_rule: Rule2d,
    face_rule: Rule1d,
}

impl<'a> SsaCellAssembler<'a> {
    pub fn new(
        mesh: &'a AdaptiveMesh,
        dofs: &'a DofMap,
        surface: IceSurface<'a>,
        viscosity: Viscosity,
        calving_front_marker: u32,
    ) -> Self {
        let basis = dofs.basis();
        Self {
            mesh,
            dofs,
            constants: *surface.constants(),
            surface,
            viscosity,
            velocity: None,
            calving_front_marker,
            cell_rule: basis.cell_quadrature(),
            face_rule: basis.face_quadrature(),
        }
    }

    /// Sets the velocity estimate the nonlinear viscosity is evaluated from.
    pub fn with_velocity(self, velocity: &'a DVector<f64>) -> Self {
        Self {
            velocity: Some(velocity),
            ..self
        }
    }

    fn basis(&self) -> LagrangeBasis {
        self.dofs.basis()
    }

    fn velocity_gradient(&self, cell: usize, gradients: &[Vector2<f64>]) -> eyre::Result<Matrix2<f64>> {
        if !self.viscosity.is_nonlinear() {
            return Ok(Matrix2::zeros());
        }
        let u = self
            .velocity
            .ok_or_else(|| eyre!("nonlinear viscosity requires a velocity estimate"))?;
        let mut grad_u = Matrix2::zeros();
        for (&node, grad_phi) in self.dofs.cell_nodes(cell).iter().zip(gradients) {
            let u_node = Vector2::new(u[SOLUTION_DIM * node], u[SOLUTION_DIM * node + 1]);
            grad_u += u_node * grad_phi.transpose();
        }
        Ok(grad_u)
    }

    fn assemble_calving_front(
        &self,
        element: &TriangleElement,
        face: usize,
        vector: &mut DVectorViewMut<f64>,
        phi: &mut [f64],
    ) {
        let PhysicalConstants {
            rho_ice,
            rho_water,
            gravity,
        } = self.constants;
        let normal = element.face_normal(face);
        let length = element.face_length(face);
        let thickness = self.surface.thickness();

        let (weights, points) = &self.face_rule;
        for (w, &[t]) in izip!(weights, points) {
            let xi = TriangleElement::face_reference_point(face, t);
            let x = element.map_reference_coords(&xi);
            self.basis().populate_basis(phi, &xi);

            let h = thickness.value(&x);
            let b = self.surface.value(&x) - h;
            let pressure = 0.5 * gravity * (rho_ice * h * h - rho_water * b * b);
            let traction = normal * (pressure * w * length);
            for (i, phi_i) in phi.iter().enumerate() {
                let mut f_i = vector.fixed_rows_mut::<2>(SOLUTION_DIM * i);
                f_i += traction * *phi_i;
            }
        }
    }
}

impl CellConnectivityAssembler for SsaCellAssembler<'_> {
    fn solution_dim(&self) -> usize {
        SOLUTION_DIM
    }

    fn num_cells(&self) -> usize {
        self.dofs.num_cells()
    }

    fn num_nodes(&self) -> usize {
        self.dofs.num_nodes()
    }

    fn cell_node_count(&self, _cell: usize) -> usize {
        self.basis().num_nodes()
    }

    fn populate_cell_nodes(&self, output: &mut [usize], cell: usize) {
        output.copy_from_slice(self.dofs.cell_nodes(cell));
    }
}

impl CellSystemAssembler for SsaCellAssembler<'_> {
    fn assemble_cell_system_into(
        &self,
        cell: usize,
        mut matrix: DMatrixViewMut<f64>,
        mut vector: DVectorViewMut<f64>,
    ) -> eyre::Result<()> {
        let basis = self.basis();
        let n = basis.num_nodes();
        assert_eq!(matrix.nrows(), SOLUTION_DIM * n);
        assert_eq!(vector.len(), SOLUTION_DIM * n);

        let cell_index = self.dofs.cell(cell);
        let element = self.mesh.element(cell_index);
        let jacobian = element.reference_jacobian();
        let det_j = jacobian.determinant();
        let j_inv_t = jacobian
            .try_inverse()
            .filter(|_| det_j.abs() > 0.0)
            .ok_or_else(|| eyre!("cell {cell_index} is degenerate (Jacobian determinant {det_j})"))?
            .transpose();

        let mut phi = vec![0.0; n];
        let mut ref_gradients = vec![Vector2::zeros(); n];
        let mut gradients = vec![Vector2::zeros(); n];

        let thickness = self.surface.thickness();
        let driving_stress_factor = -self.constants.rho_ice * self.constants.gravity;

        let (weights, points) = &self.cell_rule;
        for (w, xi) in izip!(weights, points) {
            let xi = Point2::from(*xi);
            let x = element.map_reference_coords(&xi);
            basis.populate_basis(&mut phi, &xi);
            basis.populate_reference_gradients(&mut ref_gradients, &xi);
            transform_gradients(&j_inv_t, &ref_gradients, &mut gradients);

            let h = thickness.value(&x);
            let grad_u = self.velocity_gradient(cell, &gradients)?;
            let stiffness = self.viscosity.membrane_stiffness(h, &grad_u);
            let driving_stress = self.surface.gradient(&x) * (driving_stress_factor * h);
            let scale = w * det_j.abs();

            for i in 0..n {
                for j in 0..n {
                    let block = stiffness.contract(&gradients[i], &gradients[j]) * scale;
                    let mut a_ij = matrix.fixed_view_mut::<2, 2>(SOLUTION_DIM * i, SOLUTION_DIM * j);
                    a_ij += block;
                }
                let mut f_i = vector.fixed_rows_mut::<2>(SOLUTION_DIM * i);
                f_i += driving_stress * (phi[i] * scale);
            }
        }

        let markers = self.mesh.cell(cell_index).face_markers();
        for (face, marker) in markers.iter().enumerate() {
            if *marker == Some(self.calving_front_marker) {
                self.assemble_calving_front(&element, face, &mut vector, &mut phi);
            }
        }

        Ok(())
    }
}

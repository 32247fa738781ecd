//! An ice shelf with a known analytic velocity.
//!
//! A floating shelf confined between two parallel walls flows in `x`, with thickness decreasing
//! linearly from the inflow boundary to the calving front. Away from the walls, the
//! depth-integrated momentum balance reduces to
//! $$
//! \frac{\mathrm{d}u}{\mathrm{d}x} = A \left( \zeta h \right)^3,
//! \qquad \zeta = \frac{\rho_i g (1 - \rho_i / \rho_w)}{4},
//! $$
//! which integrates in closed form. With the exact velocity prescribed on the inflow boundary
//! and on both walls, the two-dimensional problem has the same solution.
use crate::config::SolverConfig;
use crate::constants::{rate_factor, PhysicalConstants};
use crate::dofs::DofMap;
use crate::driver::ShallowShelf;
use crate::error::estimate_L2_error;
use crate::fields::{AffineField, ConstantField, ScalarField, VectorField};
use crate::mesh::procedural::{create_rectangular_tri_mesh_2d, RectangleBoundaryMarkers};
use crate::mesh::AdaptiveMesh;
use crate::solver::DiagnosticError;
use nalgebra::{DVector, Point2, Vector2};

/// Marker of the inflow boundary and the two side walls.
pub const WALL_MARKER: u32 = 0;
/// Marker of the calving front at `x = length`.
pub const CALVING_FRONT_MARKER: u32 = 1;

/// The confined shelf benchmark in meters, years and kelvin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfinedShelf {
    pub length: f64,
    pub width: f64,
    pub inflow_thickness: f64,
    pub outflow_thickness: f64,
    pub inflow_velocity: f64,
    pub bed: f64,
    pub temperature: f64,
    pub constants: PhysicalConstants,
}

impl Default for ConfinedShelf {
    fn default() -> Self {
        Self {
            length: 20_000.0,
            width: 5_000.0,
            inflow_thickness: 500.0,
            outflow_thickness: 400.0,
            inflow_velocity: 100.0,
            bed: -2_000.0,
            temperature: 254.15,
            constants: PhysicalConstants::default(),
        }
    }
}

/// The analytic velocity of a [`ConfinedShelf`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfinedShelfVelocity {
    shelf: ConfinedShelf,
    rate_factor: f64,
}

impl ConfinedShelfVelocity {
    pub fn speed(&self, x: f64) -> f64 {
        let shelf = &self.shelf;
        let h0 = shelf.inflow_thickness;
        let h = shelf.thickness().value(&Point2::new(x, 0.0));
        let constants = &shelf.constants;
        let zeta = constants.rho_ice * constants.gravity * (1.0 - constants.density_ratio()) / 4.0;
        let dh = shelf.outflow_thickness - h0;
        shelf.inflow_velocity + self.rate_factor * zeta.powi(3) * shelf.length / (4.0 * dh) * (h.powi(4) - h0.powi(4))
    }
}

impl VectorField for ConfinedShelfVelocity {
    fn value(&self, x: &Point2<f64>) -> Vector2<f64> {
        Vector2::new(self.speed(x.x), 0.0)
    }
}

impl ConfinedShelf {
    pub fn thickness(&self) -> AffineField {
        AffineField::linear_in_x(self.inflow_thickness, self.outflow_thickness, self.length)
    }

    pub fn bed(&self) -> ConstantField {
        ConstantField(self.bed)
    }

    pub fn exact_velocity(&self) -> ConfinedShelfVelocity {
        ConfinedShelfVelocity {
            shelf: *self,
            rate_factor: rate_factor(self.temperature),
        }
    }

    /// The largest speed, attained at the calving front.
    pub fn max_velocity(&self) -> f64 {
        self.exact_velocity().speed(self.length)
    }

    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    /// Root mean square error of `u_h` relative to the maximum velocity, i.e.
    /// `‖u_h - u‖_L2 / (√|Ω| max |u|)`.
    pub fn relative_error(&self, mesh: &AdaptiveMesh, dofs: &DofMap, u_h: &DVector<f64>) -> f64 {
        let l2_error = estimate_L2_error(mesh, dofs, u_h, &self.exact_velocity());
        l2_error / (self.area().sqrt() * self.max_velocity())
    }

    /// A base mesh of `4 × 1` rectangles, each split into two triangles.
    pub fn base_mesh(&self) -> AdaptiveMesh {
        let markers = RectangleBoundaryMarkers {
            bottom: WALL_MARKER,
            right: CALVING_FRONT_MARKER,
            top: WALL_MARKER,
            left: WALL_MARKER,
        };
        create_rectangular_tri_mesh_2d(
            &Point2::origin(),
            &Vector2::new(self.length, self.width),
            4,
            1,
            markers,
        )
    }

    /// Adjusts a configuration to the temperature, constants and markers of the benchmark.
    pub fn configure(&self, config: SolverConfig) -> SolverConfig {
        SolverConfig {
            temperature: self.temperature,
            constants: self.constants,
            dirichlet_markers: vec![WALL_MARKER],
            calving_front_marker: CALVING_FRONT_MARKER,
            ..config
        }
    }

    /// Sets up the solver on the base mesh, with the exact velocity as boundary velocity.
    pub fn solver(&self, config: SolverConfig) -> Result<ShallowShelf, DiagnosticError> {
        ShallowShelf::new(
            self.configure(config),
            self.base_mesh(),
            Box::new(self.thickness()),
            Box::new(self.bed()),
            Box::new(self.exact_velocity()),
        )
    }
}

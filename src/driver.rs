//! The adaptive refinement loop around the diagnostic velocity solve.
use crate::adapt::{adapt_mesh, transfer_velocity};
use crate::assembly::{Discretization, GlobalSystemBuilder};
use crate::config::{ConfigError, SolverConfig};
use crate::constants::rheology;
use crate::dofs::DofMap;
use crate::element::LagrangeBasis;
use crate::fields::{IceSurface, ScalarField, VectorField};
use crate::mesh::AdaptiveMesh;
use crate::solver::{DiagnosticError, LinearSolver, PicardOutput, PicardSolver};
use crate::velocity::VelocityField;
use log::info;

/// Results of one refinement cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleReport<'a> {
    pub cycle: usize,
    pub generation: usize,
    pub num_active_cells: usize,
    pub num_dofs: usize,
    pub velocity: &'a VelocityField,
    pub mesh: &'a AdaptiveMesh,
    pub dofs: &'a DofMap,
    pub picard: &'a PicardOutput,
}

/// Receives the results of every refinement cycle, e.g. for output or analysis.
///
/// An error aborts the run.
pub trait CycleReporter {
    fn report(&mut self, report: &CycleReport) -> eyre::Result<()>;
}

impl<F> CycleReporter for F
where
    F: FnMut(&CycleReport) -> eyre::Result<()>,
{
    fn report(&mut self, report: &CycleReport) -> eyre::Result<()> {
        self(report)
    }
}

/// Logs a summary of each cycle.
#[derive(Debug, Copy, Clone, Default)]
pub struct LogReporter;

impl CycleReporter for LogReporter {
    fn report(&mut self, report: &CycleReport) -> eyre::Result<()> {
        let max_speed = (0..report.velocity.num_nodes())
            .map(|node| report.velocity.node_velocity(node).norm())
            .fold(0.0, f64::max);
        let final_update = report.picard.relative_updates.last().copied().unwrap_or(0.0);
        info!(
            "Cycle {} finished: {} Picard iterations, final relative update {:.3e}, max speed {:.3} m/yr",
            report.cycle, report.picard.iterations, final_update, max_speed
        );
        Ok(())
    }
}

/// The state after the final cycle of a run.
#[derive(Debug, Clone)]
pub struct ShelfSolution {
    pub mesh: AdaptiveMesh,
    pub discretization: Discretization,
    pub velocity: VelocityField,
    pub picard: PicardOutput,
}

/// Diagnostic velocity solver for an ice shelf on an adaptively refined mesh.
pub struct ShallowShelf {
    config: SolverConfig,
    basis: LagrangeBasis,
    mesh: AdaptiveMesh,
    thickness: Box<dyn ScalarField>,
    bed: Box<dyn ScalarField>,
    boundary_velocity: Box<dyn VectorField>,
}

impl ShallowShelf {
    /// Validates the configuration and sets up a solver on the given base mesh.
    pub fn new(
        config: SolverConfig,
        mesh: AdaptiveMesh,
        thickness: Box<dyn ScalarField>,
        bed: Box<dyn ScalarField>,
        boundary_velocity: Box<dyn VectorField>,
    ) -> Result<Self, DiagnosticError> {
        config.validate()?;
        let basis = LagrangeBasis::from_degree(config.polynomial_degree).ok_or_else(|| ConfigError::Invalid {
            field: "polynomial_degree",
            reason: format!("degree {} is not supported", config.polynomial_degree),
        })?;
        Ok(Self {
            config,
            basis,
            mesh,
            thickness,
            bed,
            boundary_velocity,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn mesh(&self) -> &AdaptiveMesh {
        &self.mesh
    }

    /// The Picard solver configured from the solver configuration.
    pub fn picard_solver(&self) -> PicardSolver {
        let config = &self.config;
        PicardSolver {
            num_iterations: config.nonlinear_iterations,
            tolerance: config.picard_tolerance,
            rheology: rheology(config.temperature),
            guess_strain_rate: config.guess_strain_rate,
            linear_solver: LinearSolver::new(config.cg_tolerance, config.cg_max_iterations),
        }
    }

    /// Runs all refinement cycles.
    ///
    /// The first cycle refines the base mesh globally and starts from the boundary velocity
    /// interpolated everywhere. Every later cycle adapts the mesh to the previous velocity and
    /// starts from its transfer. Any failure aborts the run.
    pub fn run(self, reporter: &mut dyn CycleReporter) -> Result<ShelfSolution, DiagnosticError> {
        let picard = self.picard_solver();
        let Self {
            config,
            basis,
            mut mesh,
            thickness,
            bed,
            boundary_velocity,
        } = self;
        let surface = IceSurface::new(&*bed, &*thickness, config.constants);

        let mut previous: Option<(Discretization, VelocityField, PicardOutput)> = None;
        for cycle in 0..config.cycles {
            let (discretization, mut velocity) = match previous.take() {
                None => {
                    for _ in 0..config.initial_global_refinements {
                        mesh.refine_globally();
                    }
                    let discretization =
                        Discretization::new(&mesh, basis, &*boundary_velocity, &config.dirichlet_markers);
                    let velocity = discretization.dofs().interpolate(&*boundary_velocity);
                    (discretization, velocity)
                }
                Some((old_discretization, old_velocity, _)) => {
                    let transfer = adapt_mesh(
                        &mut mesh,
                        &old_discretization,
                        old_velocity.values(),
                        config.refine_fraction,
                        config.coarsen_fraction,
                    );
                    info!(
                        "Cycle {cycle}: refined {} and coarsened {} cells",
                        transfer.num_refined(),
                        transfer.num_coarsened()
                    );
                    let discretization =
                        Discretization::new(&mesh, basis, &*boundary_velocity, &config.dirichlet_markers);
                    let mut velocity = transfer_velocity(
                        &mesh,
                        &transfer,
                        old_discretization.dofs(),
                        old_velocity.values(),
                        discretization.dofs(),
                    );
                    discretization.impose_boundary_values(&mut velocity);
                    discretization.constraints().distribute(&mut velocity);
                    (discretization, velocity)
                }
            };

            let num_active_cells = mesh.num_active_cells();
            let num_dofs = discretization.dofs().num_dofs();
            info!("Cycle {cycle}: {num_active_cells} active cells, {num_dofs} degrees of freedom");

            let builder = GlobalSystemBuilder::new(
                &mesh,
                &discretization,
                surface,
                config.calving_front_marker,
                config.parallel_assembly,
            );
            let picard_output = picard.solve(&builder, &mut velocity)?;
            let velocity = VelocityField::new(mesh.generation(), velocity);

            let report = CycleReport {
                cycle,
                generation: mesh.generation(),
                num_active_cells,
                num_dofs,
                velocity: &velocity,
                mesh: &mesh,
                dofs: discretization.dofs(),
                picard: &picard_output,
            };
            reporter.report(&report).map_err(DiagnosticError::Report)?;
            previous = Some((discretization, velocity, picard_output));
        }

        let (discretization, velocity, picard) = previous.expect("Configuration requires at least one cycle");
        Ok(ShelfSolution {
            mesh,
            discretization,
            velocity,
            picard,
        })
    }
}

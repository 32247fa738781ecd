//! Adaptive refinement driven by a posteriori error indicators.
use crate::assembly::Discretization;
use crate::mesh::{mark_fixed_number, AdaptiveMesh, GenerationTransfer};
use log::debug;
use nalgebra::DVector;

mod estimator;
mod transfer;

pub use estimator::*;
pub use transfer::*;

/// Estimates the error of `velocity`, marks cells and executes refinement and coarsening.
///
/// Returns the transfer from the generation of `discretization` to the new generation.
pub fn adapt_mesh(
    mesh: &mut AdaptiveMesh,
    discretization: &Discretization,
    velocity: &DVector<f64>,
    refine_fraction: f64,
    coarsen_fraction: f64,
) -> GenerationTransfer {
    assert_eq!(mesh.generation(), discretization.generation());
    let indicators = kelly_indicators(mesh, discretization.topology(), discretization.dofs(), velocity);
    let max_indicator = indicators.iter().copied().fold(0.0, f64::max);
    debug!("Largest error indicator: {max_indicator:.3e}");

    let flags = mark_fixed_number(&indicators, refine_fraction, coarsen_fraction);
    mesh.execute_refinement(&flags)
}

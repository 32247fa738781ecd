//! Runs the confined ice shelf benchmark and reports the error of the computed velocity.
//!
//! Usage: `icestream [config.json]`
use eyre::WrapErr;
use icestream::benchmark::ConfinedShelf;
use icestream::config::SolverConfig;
use icestream::driver::LogReporter;
use log::info;

fn main() -> eyre::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => SolverConfig::from_json_file(&path).wrap_err_with(|| format!("failed to load {path}"))?,
        None => SolverConfig::default(),
    };

    let shelf = ConfinedShelf::default();
    let solution = shelf.solver(config)?.run(&mut LogReporter)?;

    let dofs = solution.discretization.dofs();
    let relative_error = shelf.relative_error(&solution.mesh, dofs, solution.velocity.values());
    info!("Maximum velocity of the exact solution: {:.3} m/yr", shelf.max_velocity());
    println!(
        "cells: {}, dofs: {}, relative L2 error: {relative_error:.4e}",
        solution.mesh.num_active_cells(),
        dofs.num_dofs(),
    );
    Ok(())
}

use icestream::benchmark::ConfinedShelf;
use icestream::config::SolverConfig;
use icestream::driver::{CycleReport, LogReporter, ShelfSolution};

/// Three cycles of five Picard iterations on a twice refined base mesh.
fn benchmark_config() -> SolverConfig {
    let config = SolverConfig::default();
    assert_eq!((config.cycles, config.initial_global_refinements, config.nonlinear_iterations), (3, 2, 5));
    config
}

fn solve(config: SolverConfig) -> ShelfSolution {
    let shelf = ConfinedShelf::default();
    shelf.solver(config).unwrap().run(&mut LogReporter).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
struct CycleSummary {
    cycle: usize,
    generation: usize,
    num_active_cells: usize,
    num_dofs: usize,
    picard_iterations: usize,
    relative_error: f64,
}

#[test]
fn adaptive_cycles_approximate_analytic_solution() {
    let shelf = ConfinedShelf::default();
    let mut summaries = Vec::new();
    let mut record = |report: &CycleReport| -> eyre::Result<()> {
        summaries.push(CycleSummary {
            cycle: report.cycle,
            generation: report.generation,
            num_active_cells: report.num_active_cells,
            num_dofs: report.num_dofs,
            picard_iterations: report.picard.iterations,
            relative_error: shelf.relative_error(report.mesh, report.dofs, report.velocity.values()),
        });
        Ok(())
    };
    let solution = shelf.solver(benchmark_config()).unwrap().run(&mut record).unwrap();

    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0].num_active_cells, 128);
    for (index, summary) in summaries.iter().enumerate() {
        assert_eq!(summary.cycle, index);
        assert_eq!(summary.picard_iterations, 5);
        assert!(summary.relative_error < 0.01, "cycle {index}: {summary:?}");
    }
    for pair in summaries.windows(2) {
        assert!(pair[1].generation > pair[0].generation);
        assert!(pair[1].num_active_cells >= pair[0].num_active_cells);
        assert!(pair[1].num_dofs >= pair[0].num_dofs);
    }

    let last = summaries.last().unwrap();
    assert_eq!(solution.velocity.generation(), last.generation);
    assert_eq!(solution.mesh.generation(), last.generation);
    assert_eq!(solution.velocity.values().len(), last.num_dofs);
    let error = shelf.relative_error(&solution.mesh, solution.discretization.dofs(), solution.velocity.values());
    assert_eq!(error, last.relative_error);
}

#[test]
fn solution_respects_boundary_velocity() {
    let shelf = ConfinedShelf::default();
    let solution = solve(benchmark_config());
    for &(dof, value) in solution.discretization.boundary_values() {
        assert!((solution.velocity.values()[dof] - value).abs() <= 1e-8 * shelf.max_velocity());
    }
}

#[test]
fn runs_are_deterministic() {
    let first = solve(benchmark_config());
    let second = solve(benchmark_config());
    assert_eq!(first.mesh.active_cells(), second.mesh.active_cells());
    assert_eq!(first.velocity, second.velocity);

    let serial = solve(SolverConfig {
        parallel_assembly: false,
        ..benchmark_config()
    });
    assert_eq!(first.velocity, serial.velocity);
}

#[test]
fn quadratic_elements_approximate_analytic_solution() {
    let shelf = ConfinedShelf::default();
    let config = SolverConfig {
        cycles: 2,
        polynomial_degree: 2,
        guess_strain_rate: 0.01,
        ..benchmark_config()
    };
    let solution = shelf.solver(config).unwrap().run(&mut LogReporter).unwrap();
    let error = shelf.relative_error(&solution.mesh, solution.discretization.dofs(), solution.velocity.values());
    assert!(error < 0.01, "relative error {error}");
}

#[test]
fn reporter_errors_abort_the_run() {
    let shelf = ConfinedShelf::default();
    let mut cycles = 0;
    let mut fail_on_second = |report: &CycleReport| -> eyre::Result<()> {
        cycles += 1;
        if report.cycle == 1 {
            eyre::bail!("output failed");
        }
        Ok(())
    };
    let result = shelf.solver(benchmark_config()).unwrap().run(&mut fail_on_second);
    assert!(matches!(result, Err(icestream::solver::DiagnosticError::Report(_))));
    assert_eq!(cycles, 2);
}

#[test]
fn small_bootstrap_strain_rate_approximates_analytic_solution() {
    let shelf = ConfinedShelf::default();
    let config = SolverConfig {
        guess_strain_rate: 0.01,
        ..benchmark_config()
    };
    let solution = shelf.solver(config).unwrap().run(&mut LogReporter).unwrap();
    let error = shelf.relative_error(&solution.mesh, solution.discretization.dofs(), solution.velocity.values());
    assert!(error < 0.01, "relative error {error}");
}

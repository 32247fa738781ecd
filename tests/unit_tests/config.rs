use icestream::benchmark::ConfinedShelf;
use icestream::config::{ConfigError, SolverConfig};
use icestream::driver::ShallowShelf;
use icestream::solver::DiagnosticError;

fn invalid_field(config: &SolverConfig) -> &'static str {
    match config.validate() {
        Err(ConfigError::Invalid { field, .. }) => field,
        other => panic!("expected invalid configuration, got {other:?}"),
    }
}

#[test]
fn default_config_is_valid_and_round_trips() {
    let config = SolverConfig::default();
    assert!(config.validate().is_ok());

    let json = serde_json::to_string_pretty(&config).unwrap();
    let parsed = SolverConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn constants_in_solver_units_round_trip_exactly() {
    // Densities in MPa yr² / m² are of order 1e-18 and must survive a save and reload bit for bit
    let config = SolverConfig::default();
    let parsed = SolverConfig::from_json_str(&serde_json::to_string(&config).unwrap()).unwrap();
    for (parsed, original) in [
        (parsed.constants.rho_ice, config.constants.rho_ice),
        (parsed.constants.rho_water, config.constants.rho_water),
        (parsed.constants.gravity, config.constants.gravity),
    ] {
        assert!(original < 1e-10 || original > 1e10);
        assert_eq!(parsed.to_bits(), original.to_bits());
    }
}

#[test]
fn missing_fields_take_default_values() {
    let config = SolverConfig::from_json_str(r#"{ "cycles": 5, "polynomial_degree": 2 }"#).unwrap();
    assert_eq!(config.cycles, 5);
    assert_eq!(config.polynomial_degree, 2);
    assert_eq!(
        config,
        SolverConfig {
            cycles: 5,
            polynomial_degree: 2,
            ..SolverConfig::default()
        }
    );

    let config = SolverConfig::from_json_str(r#"{ "picard_tolerance": 1e-4 }"#).unwrap();
    assert_eq!(config.picard_tolerance, Some(1e-4));
}

#[test]
fn invalid_values_are_rejected() {
    let default = SolverConfig::default;
    assert_eq!(invalid_field(&SolverConfig { polynomial_degree: 3, ..default() }), "polynomial_degree");
    assert_eq!(invalid_field(&SolverConfig { polynomial_degree: 0, ..default() }), "polynomial_degree");
    assert_eq!(invalid_field(&SolverConfig { cycles: 0, ..default() }), "cycles");
    assert_eq!(
        invalid_field(&SolverConfig { nonlinear_iterations: 0, ..default() }),
        "nonlinear_iterations"
    );
    assert_eq!(
        invalid_field(&SolverConfig { picard_tolerance: Some(0.0), ..default() }),
        "picard_tolerance"
    );
    assert_eq!(
        invalid_field(&SolverConfig { guess_strain_rate: -1.0, ..default() }),
        "guess_strain_rate"
    );
    assert_eq!(invalid_field(&SolverConfig { temperature: 0.0, ..default() }), "temperature");
    assert_eq!(invalid_field(&SolverConfig { refine_fraction: 1.5, ..default() }), "refine_fraction");
    assert_eq!(
        invalid_field(&SolverConfig { coarsen_fraction: f64::NAN, ..default() }),
        "coarsen_fraction"
    );
    assert_eq!(
        invalid_field(&SolverConfig { refine_fraction: 0.8, coarsen_fraction: 0.3, ..default() }),
        "coarsen_fraction"
    );
    assert_eq!(invalid_field(&SolverConfig { cg_max_iterations: 0, ..default() }), "cg_max_iterations");
}

#[test]
fn calving_front_cannot_carry_dirichlet_conditions() {
    let config = SolverConfig {
        dirichlet_markers: vec![0, 1],
        calving_front_marker: 1,
        ..SolverConfig::default()
    };
    assert_eq!(invalid_field(&config), "dirichlet_markers");
}

#[test]
fn parse_errors_are_reported() {
    assert!(matches!(SolverConfig::from_json_str("{ cycles: 3 }"), Err(ConfigError::Parse(_))));
    assert!(matches!(
        SolverConfig::from_json_str(r#"{ "cycles": "three" }"#),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        SolverConfig::from_json_str(r#"{ "polynomial_degree": 4 }"#),
        Err(ConfigError::Invalid { field: "polynomial_degree", .. })
    ));
    assert!(matches!(
        SolverConfig::from_json_file("this/path/does/not/exist.json"),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn solver_construction_validates_config() {
    let shelf = ConfinedShelf::default();
    let config = SolverConfig {
        polynomial_degree: 3,
        ..SolverConfig::default()
    };
    let result = ShallowShelf::new(
        config,
        shelf.base_mesh(),
        Box::new(shelf.thickness()),
        Box::new(shelf.bed()),
        Box::new(shelf.exact_velocity()),
    );
    assert!(matches!(
        result,
        Err(DiagnosticError::Config(ConfigError::Invalid { field: "polynomial_degree", .. }))
    ));

    let solver = shelf.solver(SolverConfig::default()).unwrap();
    assert_eq!(solver.config().temperature, shelf.temperature);
    assert_eq!(solver.mesh().num_active_cells(), 8);
}

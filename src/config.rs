//! Solver configuration.
//!
//! A [`SolverConfig`] is fixed when a solver is constructed and never changes during a run.
//! Configurations can be loaded from JSON; missing fields take their default values.
use crate::constants::PhysicalConstants;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of refinement cycles, including the initial one.
    pub cycles: usize,
    /// Number of uniform refinements applied to the base mesh before the first cycle.
    pub initial_global_refinements: usize,
    /// Number of linear solves per Picard iteration run, bootstrap included.
    pub nonlinear_iterations: usize,
    /// Optional early exit when `‖u_k - u_{k-1}‖ <= tol ‖u_k‖`.
    pub picard_tolerance: Option<f64>,
    /// Strain rate in 1 / yr used to compute the bootstrap viscosity.
    pub guess_strain_rate: f64,
    /// Uniform ice temperature in K.
    pub temperature: f64,
    pub refine_fraction: f64,
    pub coarsen_fraction: f64,
    /// Relative residual tolerance of the conjugate gradient solver.
    pub cg_tolerance: f64,
    pub cg_max_iterations: usize,
    /// Degree of the Lagrange elements, either 1 or 2.
    pub polynomial_degree: usize,
    /// Boundary markers on which the boundary velocity is prescribed.
    pub dirichlet_markers: Vec<u32>,
    /// Boundary marker of the calving front, where the ocean back-pressure acts.
    pub calving_front_marker: u32,
    /// Whether cell contributions are computed on the rayon thread pool.
    pub parallel_assembly: bool,
    pub constants: PhysicalConstants,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            cycles: 3,
            initial_global_refinements: 2,
            nonlinear_iterations: 5,
            picard_tolerance: None,
            guess_strain_rate: 0.2,
            temperature: 254.15,
            refine_fraction: 0.3,
            coarsen_fraction: 0.03,
            cg_tolerance: 1e-10,
            cg_max_iterations: 1000,
            polynomial_degree: 1,
            dirichlet_markers: vec![0],
            calving_front_marker: 1,
            parallel_assembly: true,
            constants: PhysicalConstants::default(),
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read configuration: {err}"),
            Self::Parse(err) => write!(f, "failed to parse configuration: {err}"),
            Self::Invalid { field, reason } => write!(f, "invalid value for `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl SolverConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycles == 0 {
            return Err(invalid("cycles", "at least one cycle is required"));
        }
        if self.nonlinear_iterations == 0 {
            return Err(invalid(
                "nonlinear_iterations",
                "at least the bootstrap iteration is required",
            ));
        }
        if let Some(tol) = self.picard_tolerance {
            if !(tol > 0.0) {
                return Err(invalid("picard_tolerance", format!("{tol} is not positive")));
            }
        }
        if !(self.guess_strain_rate > 0.0) {
            return Err(invalid(
                "guess_strain_rate",
                format!("{} is not positive", self.guess_strain_rate),
            ));
        }
        if !(self.temperature > 0.0) {
            return Err(invalid(
                "temperature",
                format!("{} K is not a valid absolute temperature", self.temperature),
            ));
        }
        for (field, fraction) in [
            ("refine_fraction", self.refine_fraction),
            ("coarsen_fraction", self.coarsen_fraction),
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(invalid(field, format!("{fraction} is not in [0, 1]")));
            }
        }
        if self.refine_fraction + self.coarsen_fraction > 1.0 {
            return Err(invalid(
                "coarsen_fraction",
                "refine and coarsen fractions must not sum to more than one",
            ));
        }
        if !(self.cg_tolerance > 0.0) {
            return Err(invalid("cg_tolerance", format!("{} is not positive", self.cg_tolerance)));
        }
        if self.cg_max_iterations == 0 {
            return Err(invalid("cg_max_iterations", "must be positive"));
        }
        if !matches!(self.polynomial_degree, 1 | 2) {
            return Err(invalid(
                "polynomial_degree",
                format!("degree {} is not supported, use 1 or 2", self.polynomial_degree),
            ));
        }
        if self.dirichlet_markers.contains(&self.calving_front_marker) {
            return Err(invalid(
                "dirichlet_markers",
                "the calving front marker cannot also carry Dirichlet conditions",
            ));
        }
        let constants = &self.constants;
        if !(constants.rho_ice > 0.0 && constants.rho_water > 0.0 && constants.gravity > 0.0) {
            return Err(invalid("constants", "densities and gravity must be positive"));
        }
        Ok(())
    }
}

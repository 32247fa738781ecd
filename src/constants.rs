//! Physical constants and ice rheology.
//!
//! Everything in this crate works in meters, years and megapascals. Quantities that are usually
//! quoted in SI units are converted on construction.
use serde::{Deserialize, Serialize};

/// Seconds in a Julian year.
pub const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Universal gas constant in kJ / (mol K).
pub const GAS_CONSTANT: f64 = 8.3144621e-3;

/// Temperature in K separating the cold and warm branches of the rate factor.
pub const RATE_FACTOR_TRANSITION_TEMPERATURE: f64 = 263.15;

/// Densities and gravitational acceleration in m/yr/MPa units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Density of ice in MPa yr² / m².
    pub rho_ice: f64,
    /// Density of sea water in MPa yr² / m².
    pub rho_water: f64,
    /// Gravitational acceleration in m / yr².
    pub gravity: f64,
}

impl PhysicalConstants {
    /// Converts densities in kg / m³ and gravity in m / s².
    pub fn from_si(rho_ice: f64, rho_water: f64, gravity: f64) -> Self {
        let year_squared = SECONDS_PER_YEAR * SECONDS_PER_YEAR;
        Self {
            rho_ice: rho_ice * 1.0e-6 / year_squared,
            rho_water: rho_water * 1.0e-6 / year_squared,
            gravity: gravity * year_squared,
        }
    }

    /// The ratio `ρ_ice / ρ_water`.
    pub fn density_ratio(&self) -> f64 {
        self.rho_ice / self.rho_water
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self::from_si(917.0, 1024.0, 9.81)
    }
}

/// Glen's law rate factor `A(T)` in MPa⁻³ yr⁻¹ for a temperature in K.
///
/// Uses the Arrhenius relation `A = A0 exp(-Q / (R T))` with the customary cold and warm
/// parameter sets (Cuffey and Paterson).
pub fn rate_factor(temperature: f64) -> f64 {
    // A0 in s⁻¹ Pa⁻³, Q in kJ / mol
    let (a0, q) = if temperature < RATE_FACTOR_TRANSITION_TEMPERATURE {
        (3.985e-13, 60.0)
    } else {
        (1.916e3, 139.0)
    };
    let a0 = a0 * SECONDS_PER_YEAR * 1.0e18;
    a0 * (-q / (GAS_CONSTANT * temperature)).exp()
}

/// The rheology coefficient `B = ½ A(T)^(-1/3)` in MPa yr^(1/3).
pub fn rheology(temperature: f64) -> f64 {
    0.5 * rate_factor(temperature).powf(-1.0 / 3.0)
}

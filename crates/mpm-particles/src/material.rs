//! Material constants carried by the problem.

use crate::error::MaterialError;

/// Equation-of-state constants of the simulated fluid.
///
/// The defaults describe a weakly compressible, water-like fluid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialProperties {
    /// Bulk modulus. Must be > 0.
    pub bulk_modulus: f64,
    /// Reference density. Must be > 0.
    pub density: f64,
    /// Adiabatic exponent of the equation of state.
    pub gamma: f64,
    /// Compressibility coefficient.
    pub kappa: f64,
}

impl Default for MaterialProperties {
    fn default() -> Self {
        Self {
            bulk_modulus: 2.0e6,
            density: 1000.0,
            gamma: 7.0,
            kappa: 0.0,
        }
    }
}

impl MaterialProperties {
    /// Check every property is finite and the positive ones are positive.
    pub fn validate(&self) -> Result<(), MaterialError> {
        let fields = [
            ("bulk_modulus", self.bulk_modulus, true),
            ("density", self.density, true),
            ("gamma", self.gamma, false),
            ("kappa", self.kappa, false),
        ];
        for (name, value, positive) in fields {
            if !value.is_finite() || (positive && value <= 0.0) {
                return Err(MaterialError::InvalidProperty { name, value });
            }
        }
        Ok(())
    }
}

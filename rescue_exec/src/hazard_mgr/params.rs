//! Parameters structure for the hazard arbiter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Hazard thresholds, loaded from `hazard.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Smoothed gas level at or above which the robot stops.
    pub gas_emergency_threshold: f32,

    /// A valid front range below this latches a collision hazard. Set wider
    /// than the bumper stop distance to cover the lag of the range filter.
    ///
    /// Units: centimeters
    pub critical_distance_cm: f32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            gas_emergency_threshold: 500.0,
            critical_distance_cm: 10.0,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.gas_emergency_threshold.is_finite() && self.gas_emergency_threshold > 0.0) {
            return Err(format!(
                "gas_emergency_threshold must be positive, got {}",
                self.gas_emergency_threshold
            ));
        }
        if !(self.critical_distance_cm.is_finite() && self.critical_distance_cm > 0.0) {
            return Err(format!(
                "critical_distance_cm must be positive, got {}",
                self.critical_distance_cm
            ));
        }

        Ok(())
    }
}

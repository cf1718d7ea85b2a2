//! Parameters structure for the approach controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// PID gains, limits and timing bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- GAINS ----

    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,

    // ---- LIMITS ----

    pub output_min: f64,
    pub output_max: f64,

    /// Bounds on the integral term `k_i * integral`. When not given the
    /// output limits are used.
    pub integral_min: Option<f64>,
    pub integral_max: Option<f64>,

    // ---- TIMING ----

    /// Shortest accepted time step.
    ///
    /// Units: seconds
    pub min_dt_s: f64,

    /// Longest accepted time step, anything longer means the loop stalled.
    ///
    /// Units: seconds
    pub max_dt_s: f64,

    /// Time step substituted for an out of range one.
    ///
    /// Units: seconds
    pub fallback_dt_s: f64,

    // ---- TUNING BOUNDS ----

    /// Upper bounds applied to gains received from the operator. Lower bounds
    /// are always zero.
    pub k_p_max: f64,
    pub k_i_max: f64,
    pub k_d_max: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            k_p: 4.0,
            k_i: 0.0,
            k_d: 1.0,
            output_min: 0.0,
            output_max: 180.0,
            integral_min: None,
            integral_max: None,
            min_dt_s: 0.001,
            max_dt_s: 0.2,
            fallback_dt_s: 0.05,
            k_p_max: 20.0,
            k_i_max: 2.0,
            k_d_max: 10.0,
        }
    }
}

//! Parameters structure for the sensor filters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for all sensor filters, loaded from `sensors.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Params {
    pub ranging: RangingParams,
    pub gas: GasParams,
    pub odometry: OdometryParams,
}

/// Ultrasonic ranging and smoothing parameters, shared by front and rear.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RangingParams {
    /// Weight of a new sample in the exponential moving average, in (0, 1].
    pub ema_alpha: f32,

    /// Minimum time between two triggers.
    ///
    /// Units: milliseconds
    pub measurement_interval_ms: u64,

    /// Maximum time to wait for the echo to start, and the maximum echo
    /// length.
    ///
    /// Units: milliseconds
    pub echo_timeout_ms: u64,

    /// Units: centimeters
    pub min_valid_cm: f32,

    /// Units: centimeters
    pub max_valid_cm: f32,

    /// Speed of sound.
    ///
    /// Units: centimeters/microsecond
    pub speed_of_sound_cm_per_us: f32,

    /// A sensor is healthy if more than this share of its readings are valid.
    ///
    /// Units: percent
    pub healthy_availability_pct: f32,
}

/// Gas sensor smoothing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GasParams {
    /// Units: milliseconds
    pub sample_interval_ms: u64,

    /// Number of samples in the running average.
    pub window: usize,

    /// Half width of the deadband around the average inside which the trend
    /// is stable.
    pub trend_band: f32,
}

/// Wheel encoder geometry and smoothing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OdometryParams {
    /// Pulse counter counts per motor revolution (pulses per revolution x4
    /// for full quadrature decoding).
    pub counts_per_rev: f32,

    /// Units: centimeters
    pub wheel_diameter_cm: f32,

    /// Wheel revolutions per motor revolution.
    pub gear_ratio: f32,

    /// Number of samples in the RPM moving average.
    pub rpm_window: usize,

    /// A wheel with no counter update for longer than this is stale.
    ///
    /// Units: milliseconds
    pub stale_timeout_ms: u64,

    /// Minimum time between two RPM calculations.
    ///
    /// Units: milliseconds
    pub min_rpm_interval_ms: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RangingParams {
    fn default() -> Self {
        Self {
            ema_alpha: 0.3,
            measurement_interval_ms: 60,
            echo_timeout_ms: 30,
            min_valid_cm: 2.0,
            max_valid_cm: 400.0,
            speed_of_sound_cm_per_us: 0.0343,
            healthy_availability_pct: 95.0,
        }
    }
}

impl Default for GasParams {
    fn default() -> Self {
        Self {
            sample_interval_ms: 500,
            window: 5,
            trend_band: 20.0,
        }
    }
}

impl Default for OdometryParams {
    fn default() -> Self {
        Self {
            counts_per_rev: 80.0,
            wheel_diameter_cm: 6.5,
            gear_ratio: 1.0,
            rpm_window: 5,
            stale_timeout_ms: 100,
            min_rpm_interval_ms: 1,
        }
    }
}

impl Params {
    /// Check the parameters make sense, returning a description of the first
    /// problem found.
    pub fn validate(&self) -> Result<(), String> {
        let r = &self.ranging;
        if !(r.ema_alpha > 0.0 && r.ema_alpha <= 1.0) {
            return Err(format!("ranging.ema_alpha must be in (0, 1], found {}", r.ema_alpha));
        }
        if r.min_valid_cm >= r.max_valid_cm {
            return Err(format!(
                "ranging.min_valid_cm ({}) must be below ranging.max_valid_cm ({})",
                r.min_valid_cm, r.max_valid_cm
            ));
        }
        if self.gas.window == 0 {
            return Err("gas.window must be at least 1".into());
        }
        if self.odometry.counts_per_rev <= 0.0 {
            return Err(format!(
                "odometry.counts_per_rev must be positive, found {}",
                self.odometry.counts_per_rev
            ));
        }
        if self.odometry.rpm_window == 0 {
            return Err("odometry.rpm_window must be at least 1".into());
        }

        Ok(())
    }
}

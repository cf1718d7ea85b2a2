//! # Approach controller
//!
//! A PID controller with integral clamping anti-windup and derivative on
//! measurement. Navigation uses it to slow the robot smoothly as it closes on
//! an obstacle, but nothing in here is specific to that use.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{tc::PidTuning, tm::PidStatus};
use log::{trace, warn};
use util::maths::clamp;

pub use params::Params;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PidError {
    #[error("Gains must be finite, got kP = {0}, kI = {1}, kD = {2}")]
    NonFiniteGain(f64, f64, f64),

    #[error("Invalid limits: minimum ({0}) must not be above maximum ({1})")]
    InvalidLimits(f64, f64),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// PID controller state.
#[derive(Debug, Clone)]
pub struct PidController {
    params: Params,

    setpoint: f64,

    /// Accumulated `error * dt`. Always kept such that `k_i * integral` lies
    /// within the integral limits.
    integral: f64,

    last_error: f64,
    last_measurement: Option<f64>,
    last_time_ms: Option<u64>,

    /// Time step used by the last computation, after fallback substitution.
    ///
    /// Units: seconds
    last_dt_s: f64,

    output: f64,
    p_term: f64,
    i_term: f64,
    d_term: f64,

    /// Number of out of range time steps seen.
    num_dt_faults: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller, checking that the limits are ordered.
    pub fn new(params: Params) -> Result<Self, PidError> {
        if !(params.output_min <= params.output_max) {
            return Err(PidError::InvalidLimits(params.output_min, params.output_max));
        }
        if let (Some(lo), Some(hi)) = (params.integral_min, params.integral_max) {
            if !(lo <= hi) {
                return Err(PidError::InvalidLimits(lo, hi));
            }
        }

        let mut ctrl = Self::unchecked(params);

        // Gains from a file are held to the same bounds as tuned ones
        let (k_p, k_i, k_d) = (ctrl.params.k_p, ctrl.params.k_i, ctrl.params.k_d);
        ctrl.set_tunings(k_p, k_i, k_d)?;

        Ok(ctrl)
    }

    fn unchecked(params: Params) -> Self {
        Self {
            params,
            setpoint: 0.0,
            integral: 0.0,
            last_error: 0.0,
            last_measurement: None,
            last_time_ms: None,
            last_dt_s: 0.0,
            output: 0.0,
            p_term: 0.0,
            i_term: 0.0,
            d_term: 0.0,
            num_dt_faults: 0,
        }
    }

    /// Compute the output using the time elapsed since the previous call.
    ///
    /// The first call after creation or a reset has no time step, it seeds
    /// the controller and returns the proportional response only.
    pub fn compute(&mut self, measurement: f64, now_ms: u64) -> f64 {
        let out = match self.last_time_ms {
            Some(t) => {
                let dt_s = now_ms.saturating_sub(t) as f64 / 1000.0;
                self.compute_with_dt(measurement, dt_s)
            },
            None => self.seed(measurement),
        };

        self.last_time_ms = Some(now_ms);

        out
    }

    /// Compute the output for an explicit time step.
    ///
    /// A time step outside `[min_dt_s, max_dt_s]` means the loop stalled or
    /// the clock misbehaved. The controller is then reset, so the stale
    /// integral does not survive, and this step runs with the fallback time
    /// step instead.
    pub fn compute_with_dt(&mut self, measurement: f64, dt_s: f64) -> f64 {
        if !measurement.is_finite() {
            warn!("Approach PID ignoring non-finite measurement {}", measurement);
            return self.output;
        }

        let dt_s = if dt_s >= self.params.min_dt_s && dt_s <= self.params.max_dt_s {
            dt_s
        }
        else {
            warn!(
                "Approach PID dt of {:.3} s is outside [{:.3}, {:.3}] s, using {:.3} s \
                and resetting",
                dt_s,
                self.params.min_dt_s,
                self.params.max_dt_s,
                self.params.fallback_dt_s
            );
            self.num_dt_faults += 1;

            let last_time_ms = self.last_time_ms;
            self.reset();
            self.last_time_ms = last_time_ms;

            // No last measurement after the reset, so no derivative kick
            self.params.fallback_dt_s
        };

        self.last_dt_s = dt_s;

        let error = self.setpoint - measurement;

        // Proportional
        self.p_term = self.params.k_p * error;

        // Integral, clamped so that k_i * integral stays in bounds
        self.integral += error * dt_s;
        let (int_lo, int_hi) = self.integral_bounds();
        self.integral = clamp(&self.integral, &int_lo, &int_hi);
        self.i_term = self.params.k_i * self.integral;

        // Derivative on measurement, so setpoint steps do not kick
        self.d_term = match self.last_measurement {
            Some(last) => -self.params.k_d * (measurement - last) / dt_s,
            None => 0.0,
        };

        self.last_measurement = Some(measurement);
        self.last_error = error;

        self.output = clamp(
            &(self.p_term + self.i_term + self.d_term),
            &self.params.output_min,
            &self.params.output_max
        );

        trace!(
            "Approach PID: e = {:.3}, P = {:.3}, I = {:.3}, D = {:.3}, out = {:.3}",
            error, self.p_term, self.i_term, self.d_term, self.output
        );

        self.output
    }

    /// Start from a fresh measurement with no integral or derivative history.
    fn seed(&mut self, measurement: f64) -> f64 {
        let error = self.setpoint - measurement;

        self.last_measurement = Some(measurement);
        self.last_error = error;

        self.p_term = self.params.k_p * error;
        self.i_term = self.params.k_i * self.integral;
        self.d_term = 0.0;

        self.output = clamp(
            &(self.p_term + self.i_term),
            &self.params.output_min,
            &self.params.output_max
        );

        self.output
    }

    /// Zero the integral and the error and measurement history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_measurement = None;
        self.last_time_ms = None;
        self.output = 0.0;
        self.p_term = 0.0;
        self.i_term = 0.0;
        self.d_term = 0.0;
    }

    /// Apply new gains, clamped into the configured safe bounds.
    ///
    /// Returns the gains actually applied. Non-finite gains are refused and
    /// leave the current gains in place.
    pub fn set_tunings(&mut self, k_p: f64, k_i: f64, k_d: f64) -> Result<PidTuning, PidError> {
        if !(k_p.is_finite() && k_i.is_finite() && k_d.is_finite()) {
            return Err(PidError::NonFiniteGain(k_p, k_i, k_d));
        }

        let applied = PidTuning {
            k_p: clamp(&k_p, &0.0, &self.params.k_p_max),
            k_i: clamp(&k_i, &0.0, &self.params.k_i_max),
            k_d: clamp(&k_d, &0.0, &self.params.k_d_max),
        };

        if applied.k_p != k_p || applied.k_i != k_i || applied.k_d != k_d {
            warn!(
                "Requested PID gains ({}, {}, {}) clamped to ({}, {}, {})",
                k_p, k_i, k_d, applied.k_p, applied.k_i, applied.k_d
            );
        }

        self.params.k_p = applied.k_p;
        self.params.k_i = applied.k_i;
        self.params.k_d = applied.k_d;

        Ok(applied)
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    /// Change the output limits. The integral is re-clamped to match.
    pub fn set_output_limits(&mut self, min: f64, max: f64) -> Result<(), PidError> {
        if !(min <= max) {
            return Err(PidError::InvalidLimits(min, max));
        }

        self.params.output_min = min;
        self.params.output_max = max;

        let (int_lo, int_hi) = self.integral_bounds();
        self.integral = clamp(&self.integral, &int_lo, &int_hi);
        self.output = clamp(&self.output, &min, &max);

        Ok(())
    }

    /// Bounds on the integral accumulator itself.
    fn integral_bounds(&self) -> (f64, f64) {
        let k_i = self.params.k_i.max(0.001);
        let lo = self.params.integral_min.unwrap_or(self.params.output_min);
        let hi = self.params.integral_max.unwrap_or(self.params.output_max);

        (lo / k_i, hi / k_i)
    }

    /// True if the last error was within `tolerance` of zero.
    pub fn at_setpoint(&self, tolerance: f64) -> bool {
        self.last_error.abs() <= tolerance
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn last_dt_s(&self) -> f64 {
        self.last_dt_s
    }

    pub fn num_dt_faults(&self) -> u64 {
        self.num_dt_faults
    }

    pub fn gains(&self) -> PidTuning {
        PidTuning {
            k_p: self.params.k_p,
            k_i: self.params.k_i,
            k_d: self.params.k_d,
        }
    }

    pub fn status(&self) -> PidStatus {
        PidStatus {
            setpoint: self.setpoint,
            error: self.last_error,
            output: self.output,
            p: self.p_term,
            i: self.i_term,
            d: self.d_term,
        }
    }
}

impl Default for PidController {
    fn default() -> Self {
        Self::unchecked(Params::default())
    }
}

//! # Distance filter
//!
//! Non-blocking ultrasonic ranging plus exponential smoothing for one sensor.
//!
//! On hardware the filter is driven through [`DistanceFilter::trigger`] and
//! [`DistanceFilter::poll`], which advance the ranging state machine from the
//! echo pin level without ever waiting on the echo. When a collaborator has
//! already produced a range (for example another board over the link) it is
//! fed in through [`DistanceFilter::ingest_cm`] instead. Both paths share the
//! same validation, health counting and smoothing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tm::SensorHealth;
use util::maths::ema_step;

use super::params::RangingParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A validated range reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSample {
    /// Units: centimeters
    pub value_cm: f32,

    /// Units: milliseconds
    pub timestamp_ms: u64,
}

/// Ranging filter for one ultrasonic sensor.
#[derive(Debug, Clone)]
pub struct DistanceFilter {
    params: RangingParams,

    phase: RangingPhase,

    /// Time of the last trigger, used to rate limit measurements.
    last_trigger_us: Option<u64>,

    /// Last reading which passed validation.
    last_valid: Option<DistanceSample>,

    /// Exponential moving average of the valid readings.
    smoothed_cm: Option<f32>,

    health: HealthCounter,
}

/// Valid/invalid reading counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthCounter {
    pub valid: u32,
    pub invalid: u32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Phase of a single ranging cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangingPhase {
    /// No measurement in progress.
    Idle,

    /// Trigger pulse sent, waiting for the echo line to go high.
    WaitingForEcho { triggered_at_us: u64 },

    /// Echo line is high, timing the pulse.
    Measuring { echo_start_us: u64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DistanceFilter {
    pub fn new(params: RangingParams) -> Self {
        Self {
            params,
            phase: RangingPhase::Idle,
            last_trigger_us: None,
            last_valid: None,
            smoothed_cm: None,
            health: HealthCounter::default(),
        }
    }

    /// Start a ranging cycle if the filter is idle and the minimum interval
    /// since the last trigger has elapsed.
    ///
    /// Returns `true` if the caller must now send the trigger pulse.
    pub fn trigger(&mut self, now_us: u64) -> bool {
        if self.phase != RangingPhase::Idle {
            return false;
        }

        let interval_us = self.params.measurement_interval_ms * 1000;
        if let Some(t) = self.last_trigger_us {
            if now_us.saturating_sub(t) < interval_us {
                return false;
            }
        }

        self.last_trigger_us = Some(now_us);
        self.phase = RangingPhase::WaitingForEcho { triggered_at_us: now_us };

        true
    }

    /// Advance the ranging state machine given the current level of the echo
    /// line.
    ///
    /// Returns the new valid sample if this poll completed a good
    /// measurement. Timeouts and out of range echoes complete the cycle as an
    /// invalid reading and return `None`.
    pub fn poll(&mut self, now_us: u64, echo_high: bool) -> Option<DistanceSample> {
        let timeout_us = self.params.echo_timeout_ms * 1000;
        let now_ms = now_us / 1000;

        match self.phase {
            RangingPhase::Idle => None,
            RangingPhase::WaitingForEcho { triggered_at_us } => {
                if echo_high {
                    self.phase = RangingPhase::Measuring { echo_start_us: now_us };
                }
                else if now_us.saturating_sub(triggered_at_us) > timeout_us {
                    self.phase = RangingPhase::Idle;
                    self.record_invalid();
                }
                None
            },
            RangingPhase::Measuring { echo_start_us } => {
                let pulse_us = now_us.saturating_sub(echo_start_us);

                if !echo_high {
                    self.phase = RangingPhase::Idle;

                    if pulse_us > timeout_us {
                        self.record_invalid();
                        None
                    }
                    else {
                        let distance_cm = pulse_us as f32
                            * self.params.speed_of_sound_cm_per_us
                            / 2.0;
                        self.record(distance_cm, now_ms)
                    }
                }
                else if pulse_us > timeout_us {
                    self.phase = RangingPhase::Idle;
                    self.record_invalid();
                    None
                }
                else {
                    None
                }
            }
        }
    }

    /// Feed a range computed elsewhere. Values at or below zero mean the
    /// source had no valid reading.
    pub fn ingest_cm(&mut self, value_cm: f32, now_ms: u64) -> Option<DistanceSample> {
        if value_cm > 0.0 {
            self.record(value_cm, now_ms)
        }
        else {
            self.record_invalid();
            None
        }
    }

    /// Current phase of the ranging state machine.
    pub fn phase(&self) -> RangingPhase {
        self.phase
    }

    /// Last valid reading, retained through later invalid ones.
    pub fn last_valid(&self) -> Option<DistanceSample> {
        self.last_valid
    }

    /// Smoothed distance, or `None` if no valid reading has ever been seen.
    ///
    /// Invalid readings leave the smoothed value untouched.
    pub fn smoothed(&self) -> Option<f32> {
        self.smoothed_cm
    }

    pub fn health(&self) -> SensorHealth {
        let total = self.health.valid.saturating_add(self.health.invalid);
        let availability_pct = if total == 0 {
            0.0
        }
        else {
            self.health.valid as f32 / total as f32 * 100.0
        };

        SensorHealth {
            valid: self.health.valid,
            invalid: self.health.invalid,
            total,
            availability_pct,
            healthy: total > 0 && availability_pct > self.params.healthy_availability_pct,
        }
    }

    /// Forget all readings and abort any measurement in progress.
    pub fn reset(&mut self) {
        *self = Self::new(self.params.clone());
    }

    fn record(&mut self, value_cm: f32, now_ms: u64) -> Option<DistanceSample> {
        // NaN fails both comparisons and is rejected here
        if !(value_cm >= self.params.min_valid_cm && value_cm <= self.params.max_valid_cm) {
            self.record_invalid();
            return None;
        }

        self.health.valid = self.health.valid.saturating_add(1);

        let sample = DistanceSample { value_cm, timestamp_ms: now_ms };
        self.last_valid = Some(sample);

        // The first valid reading seeds the average
        self.smoothed_cm = Some(match self.smoothed_cm {
            Some(old) => ema_step(self.params.ema_alpha, value_cm, old),
            None => value_cm,
        });

        Some(sample)
    }

    fn record_invalid(&mut self) {
        self.health.invalid = self.health.invalid.saturating_add(1);
    }
}

impl Default for DistanceFilter {
    fn default() -> Self {
        Self::new(RangingParams::default())
    }
}

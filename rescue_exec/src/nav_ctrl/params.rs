//! Parameters structure for the navigation policy

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::MAX_WHEEL_SPEED;
use serde::Deserialize;

use crate::approach_ctrl;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Navigation parameters, loaded from `nav_ctrl.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- DISTANCES ----

    /// A front range below this flags an obstacle.
    ///
    /// Units: centimeters
    pub obstacle_threshold_cm: f32,

    /// A flagged obstacle is only cleared once the front range is above this.
    /// Must be greater than `obstacle_threshold_cm`.
    ///
    /// Units: centimeters
    pub clearance_threshold_cm: f32,

    /// Below this the approach controller slows the robot down, and a lack of
    /// progress counts towards being stuck.
    ///
    /// Units: centimeters
    pub safe_distance_cm: f32,

    /// The rear is blocked if the rear range is below this.
    ///
    /// Units: centimeters
    pub rear_clear_distance_cm: f32,

    // ---- SPEEDS ----

    pub cruise_speed: i16,
    pub turn_speed: i16,
    pub climb_speed: i16,

    /// Lowest speed the approach controller will slow down to.
    pub min_approach_speed: i16,

    // ---- DURATIONS ----

    /// Units: milliseconds
    pub turn_duration_ms: u64,

    /// Avoidance gives up and backs up after this many turn durations.
    pub avoid_timeout_turns: u64,

    /// Units: milliseconds
    pub backup_duration_ms: u64,

    /// Units: milliseconds
    pub climb_duration_ms: u64,

    /// Time spent rotating in place while scanning for a way out.
    ///
    /// Units: milliseconds
    pub scan_duration_ms: u64,

    // ---- STUCK DETECTION ----

    /// Consecutive ticks without progress before the robot is stuck.
    pub stuck_threshold_ticks: u32,

    /// Change in front range below which a tick counts as no progress.
    ///
    /// Units: centimeters
    pub stuck_tolerance_cm: f32,

    // ---- CLIMBING ----

    pub climb_enabled: bool,

    /// Sudden drop in the front range which marks a ledge.
    ///
    /// Units: centimeters
    pub climb_drop_cm: f32,

    /// The ledge must be nearer than this...
    ///
    /// Units: centimeters
    pub climb_band_max_cm: f32,

    /// ...and further than this.
    ///
    /// Units: centimeters
    pub climb_band_min_cm: f32,

    // ---- APPROACH ----

    pub approach_pid_enabled: bool,

    pub approach: approach_ctrl::Params,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            obstacle_threshold_cm: 30.0,
            clearance_threshold_cm: 40.0,
            safe_distance_cm: 50.0,
            rear_clear_distance_cm: 30.0,
            cruise_speed: 180,
            turn_speed: 150,
            climb_speed: 255,
            min_approach_speed: 40,
            turn_duration_ms: 450,
            avoid_timeout_turns: 3,
            backup_duration_ms: 1000,
            climb_duration_ms: 2000,
            scan_duration_ms: 2000,
            stuck_threshold_ticks: 5,
            stuck_tolerance_cm: 1.0,
            climb_enabled: true,
            climb_drop_cm: 10.0,
            climb_band_max_cm: 15.0,
            climb_band_min_cm: 3.0,
            approach_pid_enabled: true,
            approach: approach_ctrl::Params::default(),
        }
    }
}

impl Params {
    /// Reverse speed used while backing up.
    pub fn backup_speed(&self) -> i16 {
        self.cruise_speed / 2
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.clearance_threshold_cm > self.obstacle_threshold_cm) {
            return Err(format!(
                "clearance_threshold_cm ({}) must be greater than obstacle_threshold_cm ({})",
                self.clearance_threshold_cm, self.obstacle_threshold_cm
            ));
        }

        for (name, speed) in [
            ("cruise_speed", self.cruise_speed),
            ("turn_speed", self.turn_speed),
            ("climb_speed", self.climb_speed),
            ("min_approach_speed", self.min_approach_speed),
        ].iter() {
            if *speed < 0 || *speed > MAX_WHEEL_SPEED {
                return Err(format!(
                    "{} must be in [0, {}], got {}",
                    name, MAX_WHEEL_SPEED, speed
                ));
            }
        }

        if self.min_approach_speed > self.cruise_speed {
            return Err(format!(
                "min_approach_speed ({}) must not be above cruise_speed ({})",
                self.min_approach_speed, self.cruise_speed
            ));
        }

        if self.turn_duration_ms == 0 || self.avoid_timeout_turns == 0 {
            return Err("Avoidance turn duration and timeout must be non-zero".into());
        }

        if self.stuck_threshold_ticks == 0 {
            return Err("stuck_threshold_ticks must be non-zero".into());
        }

        if self.climb_enabled && !(self.climb_band_min_cm < self.climb_band_max_cm) {
            return Err(format!(
                "Climb band ({}, {}) is empty",
                self.climb_band_min_cm, self.climb_band_max_cm
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let p = Params::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.backup_speed(), 90);
    }

    #[test]
    fn test_partial_file() {
        let p: Params = util::params::from_str(
            "obstacle_threshold_cm = 25.0\n\
            [approach]\n\
            k_p = 2.0\n"
        ).unwrap();

        assert_eq!(p.obstacle_threshold_cm, 25.0);
        assert_eq!(p.clearance_threshold_cm, 40.0);
        assert_eq!(p.approach.k_p, 2.0);
        assert_eq!(p.approach.k_d, 1.0);
    }

    #[test]
    fn test_hysteresis_band_must_be_open() {
        let p = Params {
            clearance_threshold_cm: 30.0,
            ..Params::default()
        };
        assert!(p.validate().is_err());
    }
}

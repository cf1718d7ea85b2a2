//! # Telemetry
//!
//! Read-only reports produced by the control core: the per-cycle
//! `TelemetrySnapshot` and the `HazardEvent` raised when an emergency latches.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::eqpt::drive::MotionCommand;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which board of the robot the control core is running on.
///
/// Only the rear board carries the wheel encoders.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRole {
    Front,
    Rear,
}

impl Default for BoardRole {
    fn default() -> Self {
        BoardRole::Front
    }
}

/// Top level operating mode of the robot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Init,
    Idle,
    Manual,
    Autonomous,
    Emergency,
}

/// The navigation state, without the state's internal timing data.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStateKind {
    Forward,
    ObstacleDetected,
    AvoidLeft,
    AvoidRight,
    BackingUp,
    Climbing,
    Stuck,
    Scanning,
    Idle,
}

/// Direction the gas reading is moving relative to its running average.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasTrend {
    Rising,
    Falling,
    Stable,
}

/// Cause of an emergency.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardKind {
    None,
    Gas,
    CollisionImminent,

    /// Reserved for the transport layer, nothing in the core raises this.
    ConnectionLost,

    /// Emergency stop requested by the operator.
    OperatorStop,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Raised once, on the transition into a latched emergency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HazardEvent {
    pub kind: HazardKind,
    pub description: String,
    pub critical: bool,

    /// Monotonic time the hazard latched at.
    ///
    /// Units: milliseconds
    pub timestamp_ms: u64,
}

/// Running health counters of one ranging sensor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorHealth {
    pub valid: u32,
    pub invalid: u32,
    pub total: u32,

    /// Units: percent
    pub availability_pct: f32,
    pub healthy: bool,
}

/// Odometry of one wheel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WheelOdometry {
    /// Smoothed wheel speed, `None` when the wheel is stale. A stale wheel's speed is unknown,
    /// not zero.
    ///
    /// Units: revolutions per minute
    pub rpm: Option<f32>,

    /// Units: centimeters
    pub distance_cm: f32,

    /// Reassembled 32 bit pulse count.
    pub total_counts: i32,
}

/// Internal terms of the approach controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct PidStatus {
    pub setpoint: f64,
    pub error: f64,
    pub output: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

/// Projection of the control core's state at the end of one cycle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    /// Units: milliseconds
    pub timestamp_ms: u64,

    pub board_role: BoardRole,
    pub mode: OperatingMode,
    pub nav_state: NavStateKind,

    pub hazard: HazardKind,
    pub hazard_latched: bool,

    /// Smoothed front range, `None` if the sensor has never produced a valid reading.
    ///
    /// Units: centimeters
    pub front_distance_cm: Option<f32>,

    /// Smoothed rear range, `None` if the sensor has never produced a valid reading.
    ///
    /// Units: centimeters
    pub rear_distance_cm: Option<f32>,

    pub front_health: SensorHealth,
    pub rear_health: SensorHealth,

    /// Running average of the gas reading, `None` before the first sample.
    pub gas_level: Option<f32>,
    pub gas_trend: GasTrend,

    /// Rear left and rear right wheel odometry, only present on the rear board.
    pub odometry: Option<[WheelOdometry; 2]>,

    pub pid: PidStatus,

    /// Estimated time to collision with whatever is in front, if approaching it.
    ///
    /// Units: milliseconds
    pub ttc_ms: Option<f32>,

    pub motion: MotionCommand,

    /// Time taken by the last control cycle.
    ///
    /// Units: milliseconds
    pub loop_time_ms: f64,
}

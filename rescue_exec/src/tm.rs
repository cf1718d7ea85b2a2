//! # Telemetry
//!
//! Builds the per cycle [`TelemetrySnapshot`] from the data store, and the
//! flat record form of it written to the telemetry archive.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tm::{
    BoardRole, GasTrend, HazardKind, NavStateKind, OperatingMode, TelemetrySnapshot,
};
use serde::Serialize;

use crate::{data_store::DataStore, sensors::Wheel};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One row of `telemetry.csv`.
#[derive(Debug, Clone, Serialize)]
pub struct TmRecord {
    pub timestamp_ms: u64,
    pub board_role: BoardRole,
    pub mode: OperatingMode,
    pub nav_state: NavStateKind,
    pub hazard: HazardKind,
    pub hazard_latched: bool,
    pub front_distance_cm: Option<f32>,
    pub rear_distance_cm: Option<f32>,
    pub front_availability_pct: f32,
    pub front_healthy: bool,
    pub rear_availability_pct: f32,
    pub rear_healthy: bool,
    pub gas_level: Option<f32>,
    pub gas_trend: GasTrend,
    pub rear_left_rpm: Option<f32>,
    pub rear_right_rpm: Option<f32>,
    pub rear_left_distance_cm: Option<f32>,
    pub rear_right_distance_cm: Option<f32>,
    pub pid_setpoint: f64,
    pub pid_error: f64,
    pub pid_output: f64,
    pub pid_p: f64,
    pub pid_i: f64,
    pub pid_d: f64,
    pub ttc_ms: Option<f32>,
    pub left_speed: i16,
    pub right_speed: i16,
    pub loop_time_ms: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Read-only projection of the current state of the core.
pub fn snapshot(ds: &DataStore, now_ms: u64) -> TelemetrySnapshot {
    let odometry = ds.sensors.odometry.as_ref().map(|o| [
        o.wheel_tm(Wheel::RearLeft, now_ms),
        o.wheel_tm(Wheel::RearRight, now_ms),
    ]);

    let nav_active = ds.mode_mgr.mode() == OperatingMode::Autonomous;

    TelemetrySnapshot {
        timestamp_ms: now_ms,
        board_role: ds.board_role,
        mode: ds.mode_mgr.mode(),
        nav_state: ds.nav_ctrl.state_kind(),
        hazard: ds.hazard.kind(),
        hazard_latched: ds.hazard.is_latched(),
        front_distance_cm: ds.sensors_output.front_distance_cm,
        rear_distance_cm: ds.sensors_output.rear_distance_cm,
        front_health: ds.sensors.front.health(),
        rear_health: ds.sensors.rear.health(),
        gas_level: ds.sensors_output.gas_level,
        gas_trend: ds.sensors.gas.trend(),
        odometry,
        pid: ds.nav_ctrl.pid_status(),
        ttc_ms: if nav_active { ds.nav_ctrl.ttc_ms() } else { None },
        motion: ds.motion_cmd,
        loop_time_ms: ds.last_loop_time_ms,
    }
}

impl From<&TelemetrySnapshot> for TmRecord {
    fn from(tm: &TelemetrySnapshot) -> Self {
        let (left, right) = match tm.odometry {
            Some([l, r]) => (Some(l), Some(r)),
            None => (None, None),
        };

        Self {
            timestamp_ms: tm.timestamp_ms,
            board_role: tm.board_role,
            mode: tm.mode,
            nav_state: tm.nav_state,
            hazard: tm.hazard,
            hazard_latched: tm.hazard_latched,
            front_distance_cm: tm.front_distance_cm,
            rear_distance_cm: tm.rear_distance_cm,
            front_availability_pct: tm.front_health.availability_pct,
            front_healthy: tm.front_health.healthy,
            rear_availability_pct: tm.rear_health.availability_pct,
            rear_healthy: tm.rear_health.healthy,
            gas_level: tm.gas_level,
            gas_trend: tm.gas_trend,
            rear_left_rpm: left.and_then(|w| w.rpm),
            rear_right_rpm: right.and_then(|w| w.rpm),
            rear_left_distance_cm: left.map(|w| w.distance_cm),
            rear_right_distance_cm: right.map(|w| w.distance_cm),
            pid_setpoint: tm.pid.setpoint,
            pid_error: tm.pid.error,
            pid_output: tm.pid.output,
            pid_p: tm.pid.p,
            pid_i: tm.pid.i,
            pid_d: tm.pid.d,
            ttc_ms: tm.ttc_ms,
            left_speed: tm.motion.left_speed,
            right_speed: tm.motion.right_speed,
            loop_time_ms: tm.loop_time_ms,
        }
    }
}

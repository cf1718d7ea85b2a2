//! # Control loop
//!
//! One cooperative cycle of the control core. Each call runs, in order:
//!
//! 1. Sensor filtering
//! 2. Telecommand processing
//! 3. Hazard check
//! 4. Navigation or manual control, if the mode allows motion
//! 5. Telemetry
//!
//! Nothing in here blocks or reads a clock, the caller supplies the time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    eqpt::{drive::MotionCommand, sens::SensorFrame},
    tc::Tc,
    tm::{HazardEvent, OperatingMode, TelemetrySnapshot},
};
use log::{error, trace};
use util::module::State;

use crate::{
    data_store::DataStore,
    hazard_mgr::Verdict,
    nav_ctrl, sensors, tc_processor, tm,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything the core emits in one cycle.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub motion: MotionCommand,

    /// Hazard events raised this cycle, at most one per latch.
    pub hazard_events: Vec<HazardEvent>,

    pub tm: TelemetrySnapshot,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Run one control cycle.
///
/// # Inputs
/// - `ds`: The data store holding all core state
/// - `now_ms`: Monotonic time of this cycle
/// - `frame`: Sensor readings for this cycle, if any
/// - `tcs`: Telecommands received since the last cycle, in order
pub fn tick(
    ds: &mut DataStore,
    now_ms: u64,
    frame: Option<SensorFrame>,
    tcs: &[Tc]
) -> TickOutput {

    ds.cycle_start();

    // ---- SENSORS ----

    match ds.sensors.proc(&sensors::InputData { now_ms, frame }) {
        Ok((o, r)) => {
            ds.sensors_output = o;
            ds.sensors_status_rpt = r;
        },
        Err(e) => match e {},
    }

    // ---- TELECOMMANDS ----

    for tc in tcs {
        tc_processor::exec(ds, tc, now_ms);
    }

    // ---- HAZARDS ----

    let verdict = ds.hazard.check(
        ds.sensors_output.gas_level,
        ds.sensors_output.front_distance_cm,
        now_ms
    );

    if let Verdict::Latched { kind, event } = verdict {
        if let Some(e) = event {
            ds.hazard_events.push(e);
        }

        if !ds.mode_mgr.is_emergency() {
            error!("{:?} hazard latched, stopping", kind);
            ds.enter_emergency();
        }
    }

    // ---- MOTION ----

    ds.motion_cmd = if ds.hazard.is_latched() {
        MotionCommand::stop()
    }
    else {
        match ds.mode_mgr.mode() {
            OperatingMode::Autonomous => {
                let input = nav_ctrl::InputData {
                    now_ms,
                    front_distance_cm: ds.sensors_output.front_distance_cm,
                    front_raw_cm: ds.sensors_output.front_raw_cm,
                    rear_distance_cm: ds.sensors_output.rear_distance_cm,
                };

                match ds.nav_ctrl.proc(&input) {
                    Ok((cmd, rpt)) => {
                        ds.nav_ctrl_status_rpt = rpt;
                        cmd
                    },
                    Err(e) => match e {},
                }
            },
            OperatingMode::Manual => ds.manual_ctrl.step(now_ms),
            OperatingMode::Init | OperatingMode::Idle | OperatingMode::Emergency => {
                MotionCommand::stop()
            },
        }
    };

    trace!("Cycle {} motion: {:?}", ds.num_cycles, ds.motion_cmd);

    // ---- TELEMETRY ----

    let tm = tm::snapshot(ds, now_ms);

    ds.num_cycles += 1;

    TickOutput {
        motion: ds.motion_cmd,
        hazard_events: ds.hazard_events.clone(),
        tm,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tm::{HazardKind, NavStateKind};
    use crate::{hazard_mgr, params::RescueExecParams};

    const PERIOD_MS: u64 = 50;

    fn ds() -> DataStore {
        DataStore::init(
            &RescueExecParams::default(),
            sensors::Params::default(),
            hazard_mgr::Params::default(),
            nav_ctrl::Params::default()
        ).unwrap()
    }

    fn frame(front: f32, rear: f32, gas: i32) -> Option<SensorFrame> {
        Some(SensorFrame {
            front_distance_cm: front,
            rear_distance_cm: rear,
            gas_level: gas,
            wheel_counts: None,
        })
    }

    #[test]
    fn test_idle_does_not_move() {
        let mut ds = ds();
        let out = tick(&mut ds, 0, frame(200.0, 200.0, 100), &[]);

        assert!(out.motion.is_stop());
        assert_eq!(out.tm.mode, OperatingMode::Idle);
        assert!(out.hazard_events.is_empty());
    }

    #[test]
    fn test_autonomous_cruise() {
        let mut ds = ds();

        let out = tick(&mut ds, 0, frame(200.0, 200.0, 100), &[Tc::AutonomousOn]);
        assert_eq!(out.motion, MotionCommand::forward(180));
        assert_eq!(out.tm.nav_state, NavStateKind::Forward);

        let out = tick(&mut ds, PERIOD_MS, frame(200.0, 200.0, 100), &[Tc::AutonomousOff]);
        assert!(out.motion.is_stop());
        assert_eq!(out.tm.nav_state, NavStateKind::Idle);
    }

    #[test]
    fn test_gas_hazard_stops_and_latches() {
        let mut ds = ds();
        tick(&mut ds, 0, frame(200.0, 200.0, 100), &[Tc::AutonomousOn]);

        // Average of 100 and 1000 is 550, over the 500 threshold
        let out = tick(&mut ds, 500, frame(200.0, 200.0, 1000), &[]);
        assert!(out.motion.is_stop());
        assert_eq!(out.tm.mode, OperatingMode::Emergency);
        assert_eq!(out.tm.hazard, HazardKind::Gas);
        assert_eq!(out.hazard_events.len(), 1);
        assert!(out.hazard_events[0].critical);

        // Gas clears, but nothing moves and no new event
        let mut t = 1000;
        for _ in 0..10 {
            let out = tick(&mut ds, t, frame(200.0, 200.0, 0), &[Tc::AutonomousOn, Tc::Forward]);
            assert!(out.motion.is_stop());
            assert!(out.hazard_events.is_empty());
            assert_eq!(out.tm.mode, OperatingMode::Emergency);
            t += 500;
        }

        // Explicit clear, then autonomy may resume
        let out = tick(&mut ds, t, frame(200.0, 200.0, 0), &[Tc::ClearEmergency]);
        assert_eq!(out.tm.mode, OperatingMode::Idle);
        assert!(!out.tm.hazard_latched);

        let out = tick(&mut ds, t + PERIOD_MS, frame(200.0, 200.0, 0), &[Tc::AutonomousOn]);
        assert_eq!(out.motion, MotionCommand::forward(180));
    }

    #[test]
    fn test_collision_hazard_in_manual() {
        let mut ds = ds();

        let out = tick(&mut ds, 0, frame(15.0, 200.0, 100), &[Tc::Forward]);
        assert_eq!(out.motion, MotionCommand::forward(180));

        // Filtered front drops below 10 cm: 0.3 * 2 + 0.7 * 15 = 11.1, then
        // 0.3 * 2 + 0.7 * 11.1 = 8.37
        let out = tick(&mut ds, 50, frame(2.0, 200.0, 100), &[]);
        assert_eq!(out.motion, MotionCommand::forward(180));

        let out = tick(&mut ds, 100, frame(2.0, 200.0, 100), &[]);
        assert!(out.motion.is_stop());
        assert_eq!(out.tm.hazard, HazardKind::CollisionImminent);
        assert_eq!(out.hazard_events.len(), 1);
    }

    #[test]
    fn test_clear_with_hazard_present_relatches() {
        let mut ds = ds();
        tick(&mut ds, 0, frame(200.0, 200.0, 900), &[]);
        assert!(ds.hazard.is_latched());

        let out = tick(&mut ds, 500, frame(200.0, 200.0, 900), &[Tc::ClearEmergency]);
        assert_eq!(out.tm.mode, OperatingMode::Emergency);
        assert_eq!(out.hazard_events.len(), 1);
        assert!(out.motion.is_stop());
    }

    #[test]
    fn test_operator_stop() {
        let mut ds = ds();
        tick(&mut ds, 0, frame(200.0, 200.0, 100), &[Tc::AutonomousOn]);

        let out = tick(&mut ds, 50, frame(200.0, 200.0, 100), &[Tc::EmergencyStop]);
        assert!(out.motion.is_stop());
        assert_eq!(out.tm.hazard, HazardKind::OperatorStop);
        assert_eq!(out.hazard_events.len(), 1);
        assert!(!out.hazard_events[0].critical);
    }

    #[test]
    fn test_obstacle_avoidance_scenario() {
        use NavStateKind::*;

        let mut ds = ds();
        tick(&mut ds, 0, frame(200.0, 200.0, 100), &[Tc::AutonomousOn]);

        // Hold a close front reading until the filter is well under the
        // obstacle threshold but above the critical distance
        let mut t = PERIOD_MS;
        let mut states = Vec::new();
        for _ in 0..12 {
            let out = tick(&mut ds, t, frame(25.0, 200.0, 100), &[]);
            assert!(!out.tm.hazard_latched);
            states.push(out.tm.nav_state);
            t += PERIOD_MS;
        }
        assert!(states.contains(&ObstacleDetected));
        assert!(states.contains(&AvoidLeft));

        // Obstacle moves away, navigation returns to forward
        for _ in 0..12 {
            tick(&mut ds, t, frame(200.0, 200.0, 100), &[]);
            t += PERIOD_MS;
        }
        assert_eq!(ds.nav_ctrl.state_kind(), Forward);
    }

    #[test]
    fn test_ledge_climbing() {
        let mut ds = ds();
        let mut t = 0;
        for _ in 0..10 {
            let out = tick(&mut ds, t, frame(60.0, 200.0, 100), &[Tc::AutonomousOn]);
            assert_eq!(out.tm.nav_state, NavStateKind::Forward);
            t += PERIOD_MS;
        }

        // Sudden raw drop onto a ledge, the smoothed front is still far away
        let out = tick(&mut ds, t, frame(12.0, 200.0, 100), &[]);
        assert_eq!(out.tm.nav_state, NavStateKind::Climbing);
        assert_eq!(out.motion, MotionCommand::forward(255));
        assert!(!out.tm.hazard_latched);

        // The boost is held while the ledge is still seen
        let out = tick(&mut ds, t + PERIOD_MS, frame(12.0, 200.0, 100), &[]);
        assert_eq!(out.tm.nav_state, NavStateKind::Climbing);
        assert_eq!(out.motion, MotionCommand::forward(255));
    }

    #[test]
    fn test_leaving_autonomous_resets_navigation() {
        let mut ds = ds();
        let mut t = 0;
        tick(&mut ds, t, frame(200.0, 200.0, 100), &[Tc::AutonomousOn]);
        for _ in 0..12 {
            t += PERIOD_MS;
            tick(&mut ds, t, frame(25.0, 200.0, 100), &[]);
        }
        assert!(ds.nav_ctrl.obstacle_detected());

        t += PERIOD_MS;
        let out = tick(&mut ds, t, frame(25.0, 200.0, 100), &[Tc::Left]);
        assert_eq!(out.tm.mode, OperatingMode::Manual);
        assert_eq!(out.tm.nav_state, NavStateKind::Idle);
        assert!(!ds.nav_ctrl.obstacle_detected());
        assert_eq!(out.motion, MotionCommand::spin_left(150));
    }
}

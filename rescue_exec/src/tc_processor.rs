//! # Telecommand processor module
//!
//! The telecommand processor handles operator TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};

// Internal
use comms_if::{
    tc::Tc,
    tm::{HazardKind, OperatingMode},
};
use crate::data_store::DataStore;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules. Mode
/// requests made during an emergency are rejected by the mode manager.
pub(crate) fn exec(ds: &mut DataStore, tc: &Tc, now_ms: u64) {

    debug!("Recieved {:?} command", tc);

    match tc {
        Tc::Forward | Tc::Backward | Tc::Left | Tc::Right | Tc::Rotate360 => {
            let change = ds.mode_mgr.set_manual();
            ds.on_mode_change(change);

            // Only drive if manual mode was actually granted
            if ds.mode_mgr.mode() == OperatingMode::Manual {
                ds.manual_ctrl.set(*tc, now_ms);
            }
        },
        Tc::Stop => {
            ds.manual_ctrl.clear();
            let change = ds.mode_mgr.set_idle();
            ds.on_mode_change(change);
        },
        Tc::AutonomousOn => {
            let change = ds.mode_mgr.set_autonomous();
            ds.on_mode_change(change);
        },
        Tc::AutonomousOff => {
            if ds.mode_mgr.mode() == OperatingMode::Autonomous {
                let change = ds.mode_mgr.set_idle();
                ds.on_mode_change(change);
            }
        },
        Tc::EmergencyStop => {
            if let Some(event) = ds.hazard.latch(
                HazardKind::OperatorStop,
                "Emergency stop requested by the operator".into(),
                now_ms
            ) {
                ds.hazard_events.push(event);
            }
            ds.enter_emergency();
        },
        Tc::ClearEmergency => {
            ds.clear_emergency();
        },
        Tc::TunePid(tuning) => match ds.nav_ctrl.tune_pid(*tuning) {
            Ok(applied) => info!(
                "Approach PID gains set to kP = {}, kI = {}, kD = {}",
                applied.k_p, applied.k_i, applied.k_d
            ),
            Err(e) => warn!("PID tuning rejected: {}", e),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::{eqpt::drive::MotionCommand, tc::PidTuning};
    use crate::{hazard_mgr, nav_ctrl, params::RescueExecParams, sensors};

    fn ds() -> DataStore {
        DataStore::init(
            &RescueExecParams::default(),
            sensors::Params::default(),
            hazard_mgr::Params::default(),
            nav_ctrl::Params::default()
        ).unwrap()
    }

    #[test]
    fn test_manual_motion() {
        let mut ds = ds();

        exec(&mut ds, &Tc::Forward, 0);
        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Manual);
        assert_eq!(ds.manual_ctrl.step(0), MotionCommand::forward(180));

        exec(&mut ds, &Tc::Stop, 50);
        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Idle);
        assert_eq!(ds.manual_ctrl.step(50), MotionCommand::stop());
    }

    #[test]
    fn test_emergency_stop_and_clear() {
        let mut ds = ds();
        exec(&mut ds, &Tc::AutonomousOn, 0);

        exec(&mut ds, &Tc::EmergencyStop, 10);
        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Emergency);
        assert_eq!(ds.hazard.kind(), HazardKind::OperatorStop);
        assert_eq!(ds.hazard_events.len(), 1);
        assert!(!ds.hazard_events[0].critical);

        // Nothing else gets through
        exec(&mut ds, &Tc::Forward, 20);
        exec(&mut ds, &Tc::AutonomousOn, 30);
        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Emergency);
        assert!(ds.manual_ctrl.current().is_none());

        exec(&mut ds, &Tc::ClearEmergency, 40);
        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Idle);
        assert!(!ds.hazard.is_latched());
    }

    #[test]
    fn test_autonomous_off_only_from_autonomous() {
        let mut ds = ds();

        exec(&mut ds, &Tc::Forward, 0);
        exec(&mut ds, &Tc::AutonomousOff, 10);
        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Manual);

        exec(&mut ds, &Tc::AutonomousOn, 20);
        exec(&mut ds, &Tc::AutonomousOff, 30);
        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Idle);
    }

    #[test]
    fn test_tune_pid_in_any_mode() {
        let mut ds = ds();
        exec(&mut ds, &Tc::EmergencyStop, 0);

        exec(&mut ds, &Tc::TunePid(PidTuning { k_p: 30.0, k_i: 1.0, k_d: 2.0 }), 10);
        assert_eq!(
            ds.nav_ctrl.pid_gains(),
            PidTuning { k_p: 20.0, k_i: 1.0, k_d: 2.0 }
        );
    }
}

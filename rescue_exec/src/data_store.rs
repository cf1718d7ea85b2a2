//! # Data Store
//!
//! All state of the control core, owned by the control loop and passed by
//! reference into each module on every cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    eqpt::drive::MotionCommand,
    tm::{BoardRole, HazardEvent, OperatingMode},
};
use log::{info, warn};
use util::module::State;

use crate::{
    hazard_mgr::{self, HazardArbiter, HazardMgrError},
    manual_ctrl::ManualCtrl,
    mode_mgr::{ModeChange, ModeMgr},
    nav_ctrl::{self, NavCtrl, NavCtrlError},
    params::RescueExecParams,
    sensors::{self, Sensors, SensorsError},
};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Errors which can occur while initialising the control core.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to initialise the sensors: {0}")]
    SensorsInitError(#[from] SensorsError),

    #[error("Failed to initialise the hazard arbiter: {0}")]
    HazardInitError(#[from] HazardMgrError),

    #[error("Failed to initialise navigation: {0}")]
    NavCtrlInitError(#[from] NavCtrlError),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Debug, Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Duration of the last complete cycle.
    ///
    /// Units: milliseconds
    pub last_loop_time_ms: f64,

    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    pub board_role: BoardRole,

    // Mode
    pub mode_mgr: ModeMgr,

    // Sensors
    pub sensors: Sensors,
    pub sensors_output: sensors::OutputData,
    pub sensors_status_rpt: sensors::StatusReport,

    // Hazards
    pub hazard: HazardArbiter,

    /// Hazard events raised during this cycle
    pub hazard_events: Vec<HazardEvent>,

    // Navigation
    pub nav_ctrl: NavCtrl,
    pub nav_ctrl_status_rpt: nav_ctrl::StatusReport,

    // Manual control
    pub manual_ctrl: ManualCtrl,

    /// Motion command emitted this cycle
    pub motion_cmd: MotionCommand,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Initialise every module and leave `Init` for `Idle`.
    pub fn init(
        exec_params: &RescueExecParams,
        sensors_params: sensors::Params,
        hazard_params: hazard_mgr::Params,
        nav_params: nav_ctrl::Params
    ) -> Result<Self, ExecError> {
        let mut ds = Self {
            board_role: exec_params.board_role,
            manual_ctrl: ManualCtrl::new(exec_params.manual.clone()),
            ..Self::default()
        };

        ds.sensors.init((sensors_params, exec_params.board_role))?;
        ds.hazard.init(hazard_params)?;
        ds.nav_ctrl.init(nav_params)?;

        ds.mode_mgr.start();

        Ok(ds)
    }

    /// Clear items that need wiping at the start of the cycle.
    pub fn cycle_start(&mut self) {
        self.hazard_events.clear();
    }

    /// Stop everything and enter emergency mode.
    ///
    /// Navigation (and with it the approach controller) is reset so nothing
    /// stale survives into the next autonomous run.
    pub fn enter_emergency(&mut self) {
        self.mode_mgr.trigger_emergency();

        self.nav_ctrl.reset();
        self.manual_ctrl.clear();
        self.motion_cmd = MotionCommand::stop();
    }

    /// Operator clear of an emergency. Unlatches the hazard and returns to
    /// `Idle`.
    pub fn clear_emergency(&mut self) {
        if !self.mode_mgr.is_emergency() {
            warn!("Clear emergency requested while not in emergency, ignored");
            return;
        }

        self.hazard.clear();
        self.mode_mgr.clear_emergency();

        self.nav_ctrl.reset();
        self.manual_ctrl.clear();

        info!("Emergency cleared, controllers reset");
    }

    /// Tidy up the modules affected by a mode change.
    pub fn on_mode_change(&mut self, change: Option<ModeChange>) {
        let change = match change {
            Some(c) => c,
            None => return,
        };

        if change.from == OperatingMode::Autonomous || change.to == OperatingMode::Autonomous {
            self.nav_ctrl.reset();
        }

        if change.from == OperatingMode::Manual {
            self.manual_ctrl.clear();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::tm::HazardKind;
    use comms_if::tc::Tc;

    fn ds() -> DataStore {
        DataStore::init(
            &RescueExecParams::default(),
            sensors::Params::default(),
            hazard_mgr::Params::default(),
            nav_ctrl::Params::default()
        ).unwrap()
    }

    #[test]
    fn test_init() {
        let ds = ds();
        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Idle);
        assert!(ds.sensors.odometry.is_none());

        let rear = RescueExecParams {
            board_role: BoardRole::Rear,
            ..RescueExecParams::default()
        };
        let ds = DataStore::init(
            &rear,
            sensors::Params::default(),
            hazard_mgr::Params::default(),
            nav_ctrl::Params::default()
        ).unwrap();
        assert!(ds.sensors.odometry.is_some());
    }

    #[test]
    fn test_init_rejects_bad_params() {
        let r = DataStore::init(
            &RescueExecParams::default(),
            sensors::Params::default(),
            hazard_mgr::Params::default(),
            nav_ctrl::Params {
                clearance_threshold_cm: 10.0,
                ..nav_ctrl::Params::default()
            }
        );
        assert!(matches!(r, Err(ExecError::NavCtrlInitError(_))));
    }

    #[test]
    fn test_emergency_resets_navigation() {
        let mut ds = ds();
        let change = ds.mode_mgr.set_autonomous();
        ds.on_mode_change(change);

        ds.nav_ctrl.step(0, Some(20.0), None);
        ds.nav_ctrl.step(50, Some(20.0), None);
        assert!(ds.nav_ctrl.obstacle_detected());

        ds.hazard.latch(HazardKind::Gas, "test".into(), 100);
        ds.enter_emergency();

        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Emergency);
        assert!(!ds.nav_ctrl.obstacle_detected());
        assert!(ds.motion_cmd.is_stop());

        ds.clear_emergency();
        assert_eq!(ds.mode_mgr.mode(), OperatingMode::Idle);
        assert!(!ds.hazard.is_latched());
    }

    #[test]
    fn test_leaving_manual_drops_command() {
        let mut ds = ds();
        let change = ds.mode_mgr.set_manual();
        ds.on_mode_change(change);
        ds.manual_ctrl.set(Tc::Forward, 0);

        let change = ds.mode_mgr.set_autonomous();
        ds.on_mode_change(change);
        assert!(ds.manual_ctrl.current().is_none());
    }
}

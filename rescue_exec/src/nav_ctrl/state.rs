//! Implementations for the NavCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::Serialize;

// Internal
use super::{ttc_ms, NavCtrlError, NavState, ObstacleFlag, Params, TurnDirection};
use crate::approach_ctrl::{PidController, PidError};
use comms_if::{
    eqpt::drive::MotionCommand,
    tc::PidTuning,
    tm::{NavStateKind, PidStatus},
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Navigation control module state
#[derive(Debug, Clone)]
pub struct NavCtrl {
    pub(crate) params: Params,

    pub(crate) state: NavState,

    pub(crate) obstacle: ObstacleFlag,

    /// Approach controller, owned here so that every reset of navigation
    /// also resets it.
    pub(crate) pid: PidController,

    /// Set by the forward step when the approach controller was used this
    /// cycle.
    pub(crate) pid_active: bool,

    /// Direction of the last avoidance turn, used to alternate turns.
    pub(crate) last_turn: Option<TurnDirection>,

    /// Consecutive cycles without progress towards the obstacle ahead.
    pub(crate) stuck_counter: u32,

    /// Last valid front range and the time it was seen.
    pub(crate) last_front: Option<(f32, u64)>,

    /// Last unsmoothed front range, for ledge detection.
    pub(crate) last_front_raw: Option<f32>,

    pub(crate) ttc_ms: Option<f32>,

    pub(crate) report: StatusReport,
}

/// Input data to navigation control.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Units: milliseconds
    pub now_ms: u64,

    /// Smoothed front range, `None` if no valid reading.
    ///
    /// Units: centimeters
    pub front_distance_cm: Option<f32>,

    /// Unsmoothed front range from this cycle, `None` if no valid reading.
    ///
    /// Units: centimeters
    pub front_raw_cm: Option<f32>,

    /// Smoothed rear range, `None` if no valid reading.
    ///
    /// Units: centimeters
    pub rear_distance_cm: Option<f32>,
}

/// Status report for NavCtrl processing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusReport {
    pub state: NavStateKind,
    pub state_changed: bool,
    pub obstacle_detected: bool,
    pub stuck_counter: u32,
    pub ttc_ms: Option<f32>,
}

/// Everything a state step needs to know about the current cycle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tick {
    pub now_ms: u64,
    pub front: Option<f32>,
    pub front_raw: Option<f32>,
    pub rear: Option<f32>,

    /// Hysteresis obstacle flag after this cycle's update.
    pub obstacle: bool,

    /// The raw front range dropped suddenly to a climbable height.
    pub climbable: bool,

    /// Change in front range since the last cycle, if both were valid.
    ///
    /// Units: centimeters
    pub front_delta_cm: Option<f32>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NavCtrl {
    /// Create a new navigation controller, validating the parameters.
    pub fn new(params: Params) -> Result<Self, NavCtrlError> {
        params.validate().map_err(NavCtrlError::InvalidParams)?;

        let pid = PidController::new(params.approach.clone())?;

        Ok(Self::build(params, pid))
    }

    fn build(params: Params, mut pid: PidController) -> Self {
        // The approach output is a braking effort taken off cruise speed, so
        // it is limited to the span between cruise and the minimum speed.
        let max_brake = (params.cruise_speed - params.min_approach_speed) as f64;
        if let Err(e) = pid.set_output_limits(0.0, max_brake) {
            warn!("Could not limit approach braking: {}", e);
        }
        pid.set_setpoint(params.safe_distance_cm as f64);

        let obstacle = ObstacleFlag::new(
            params.obstacle_threshold_cm,
            params.clearance_threshold_cm
        );

        Self {
            params,
            state: NavState::Idle,
            obstacle,
            pid,
            pid_active: false,
            last_turn: None,
            stuck_counter: 0,
            last_front: None,
            last_front_raw: None,
            ttc_ms: None,
            report: StatusReport::default(),
        }
    }

    /// Advance the navigation state machine by one cycle, using the front
    /// range for ledge detection as well.
    pub fn step(
        &mut self,
        now_ms: u64,
        front_distance_cm: Option<f32>,
        rear_distance_cm: Option<f32>
    ) -> MotionCommand {
        self.step_with_raw(now_ms, front_distance_cm, front_distance_cm, rear_distance_cm)
    }

    /// Advance the navigation state machine by one cycle.
    ///
    /// Obstacle, approach and stuck decisions use the smoothed front range.
    /// Ledge detection uses the raw one, since smoothing spreads a sudden
    /// drop over several cycles.
    pub fn step_with_raw(
        &mut self,
        now_ms: u64,
        front_distance_cm: Option<f32>,
        front_raw_cm: Option<f32>,
        rear_distance_cm: Option<f32>
    ) -> MotionCommand {
        let tick = self.begin_tick(now_ms, front_distance_cm, front_raw_cm, rear_distance_cm);

        self.pid_active = false;

        let prev = self.state;
        let (next, cmd) = self.step_state(prev, &tick);

        // Approach history must not survive a gap in which it was not used
        if !self.pid_active {
            self.pid.reset();
        }

        let state_changed = next.kind() != prev.kind();
        if state_changed {
            debug!("NavCtrl: {:?} -> {:?}", prev.kind(), next.kind());
        }

        self.state = next;
        self.report = StatusReport {
            state: next.kind(),
            state_changed,
            obstacle_detected: tick.obstacle,
            stuck_counter: self.stuck_counter,
            ttc_ms: self.ttc_ms,
        };

        trace!("NavCtrl output: {:?} in {:?}", cmd, next.kind());

        cmd
    }

    /// Update the per cycle observations ahead of stepping the state.
    fn begin_tick(
        &mut self,
        now_ms: u64,
        front: Option<f32>,
        front_raw: Option<f32>,
        rear: Option<f32>
    ) -> Tick {
        let obstacle = self.obstacle.update(front);

        let mut front_delta_cm = None;
        let mut climbable = false;
        self.ttc_ms = None;

        if let Some(raw) = front_raw {
            if let Some(last_raw) = self.last_front_raw {
                climbable = self.params.climb_enabled
                    && last_raw - raw > self.params.climb_drop_cm
                    && raw > self.params.climb_band_min_cm
                    && raw < self.params.climb_band_max_cm;
            }

            self.last_front_raw = Some(raw);
        }

        if let Some(f) = front {
            if let Some((last_f, last_ms)) = self.last_front {
                let delta = f - last_f;
                front_delta_cm = Some(delta);

                let dt_s = now_ms.saturating_sub(last_ms) as f32 / 1000.0;
                if dt_s > 0.0 {
                    self.ttc_ms = ttc_ms(f, -delta / dt_s);
                }
            }

            self.last_front = Some((f, now_ms));
        }

        Tick {
            now_ms,
            front,
            front_raw,
            rear,
            obstacle,
            climbable,
            front_delta_cm,
        }
    }

    fn step_state(&mut self, state: NavState, tick: &Tick) -> (NavState, MotionCommand) {
        match state {
            NavState::Idle | NavState::Forward => self.step_forward(tick),
            NavState::ObstacleDetected => self.step_obstacle_detected(tick),
            NavState::AvoidLeft { entered_at_ms } => {
                self.step_avoid(TurnDirection::Left, entered_at_ms, tick)
            },
            NavState::AvoidRight { entered_at_ms } => {
                self.step_avoid(TurnDirection::Right, entered_at_ms, tick)
            },
            NavState::BackingUp { entered_at_ms } => self.step_backing_up(entered_at_ms, tick),
            NavState::Climbing { entered_at_ms } => self.step_climbing(entered_at_ms, tick),
            NavState::Stuck => self.step_stuck(tick),
            NavState::Scanning { entered_at_ms } => self.step_scanning(entered_at_ms, tick),
        }
    }

    /// Apply operator requested approach gains, clamped to the safe bounds.
    pub fn tune_pid(&mut self, tuning: PidTuning) -> Result<PidTuning, PidError> {
        self.pid.set_tunings(tuning.k_p, tuning.k_i, tuning.k_d)
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn state_kind(&self) -> NavStateKind {
        self.state.kind()
    }

    pub fn obstacle_detected(&self) -> bool {
        self.obstacle.is_detected()
    }

    pub fn stuck_counter(&self) -> u32 {
        self.stuck_counter
    }

    pub fn ttc_ms(&self) -> Option<f32> {
        self.ttc_ms
    }

    pub fn pid_status(&self) -> PidStatus {
        self.pid.status()
    }

    pub fn pid_gains(&self) -> PidTuning {
        self.pid.gains()
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl Default for NavCtrl {
    fn default() -> Self {
        Self::build(Params::default(), PidController::default())
    }
}

impl Default for StatusReport {
    fn default() -> Self {
        Self {
            state: NavStateKind::Idle,
            state_changed: false,
            obstacle_detected: false,
            stuck_counter: 0,
            ttc_ms: None,
        }
    }
}

impl State for NavCtrl {
    type InitData = Params;
    type InitError = NavCtrlError;

    type InputData = InputData;
    type OutputData = MotionCommand;
    type StatusReport = StatusReport;
    type ProcError = std::convert::Infallible;

    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        *self = Self::new(init_data)?;
        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let cmd = self.step_with_raw(
            input_data.now_ms,
            input_data.front_distance_cm,
            input_data.front_raw_cm,
            input_data.rear_distance_cm
        );

        Ok((cmd, self.report))
    }

    /// Return to `Idle` with no obstacle, turn, stuck or approach history.
    fn reset(&mut self) {
        self.state = NavState::Idle;
        self.obstacle.reset();
        self.pid.reset();
        self.pid_active = false;
        self.last_turn = None;
        self.stuck_counter = 0;
        self.last_front = None;
        self.last_front_raw = None;
        self.ttc_ms = None;
        self.report = StatusReport::default();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PERIOD_MS: u64 = 50;

    /// Step through a sequence of front ranges, one per period, returning the
    /// state kind and command after each.
    fn run(
        nav: &mut NavCtrl,
        start_ms: u64,
        fronts: &[f32],
        rear: Option<f32>
    ) -> Vec<(NavStateKind, MotionCommand)> {
        fronts.iter()
            .enumerate()
            .map(|(i, f)| {
                let cmd = nav.step(start_ms + i as u64 * PERIOD_MS, Some(*f), rear);
                (nav.state_kind(), cmd)
            })
            .collect()
    }

    fn kinds(steps: &[(NavStateKind, MotionCommand)]) -> Vec<NavStateKind> {
        steps.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_avoidance_round_trip() {
        use NavStateKind::*;

        let mut nav = NavCtrl::new(Params::default()).unwrap();

        let steps = run(&mut nav, 0, &[50.0, 50.0, 28.0, 28.0, 28.0, 45.0], None);

        assert_eq!(
            kinds(&steps),
            vec![Forward, Forward, ObstacleDetected, AvoidLeft, AvoidLeft, Forward]
        );
        assert_eq!(steps[1].1, MotionCommand::forward(180));
        assert_eq!(steps[2].1, MotionCommand::stop());
        assert_eq!(steps[3].1, MotionCommand::stop());
        assert_eq!(steps[4].1, MotionCommand::spin_left(150));

        // Back to forward inside the safe distance, so slowed
        let (_, cmd) = steps[5];
        assert!(cmd.left_speed >= 40 && cmd.left_speed < 180);

        // A second episode turns the other way
        let steps = run(&mut nav, 300, &[28.0, 28.0, 28.0, 60.0], None);
        assert_eq!(
            kinds(&steps),
            vec![ObstacleDetected, AvoidRight, AvoidRight, Forward]
        );
        assert_eq!(steps[2].1, MotionCommand::spin_right(150));
        assert_eq!(steps[3].1, MotionCommand::forward(180));
    }

    #[test]
    fn test_obstacle_hysteresis_in_avoid() {
        let mut nav = NavCtrl::default();

        run(&mut nav, 0, &[35.0, 25.0, 25.0], None);
        assert_eq!(nav.state_kind(), NavStateKind::AvoidLeft);

        // Inside the band the obstacle is still there
        let steps = run(&mut nav, 150, &[32.0, 38.0, 40.0], None);
        for (k, _) in steps.iter() {
            assert_eq!(*k, NavStateKind::AvoidLeft);
        }
        assert!(nav.obstacle_detected());

        nav.step(300, Some(40.1), None);
        assert!(!nav.obstacle_detected());
        assert_eq!(nav.state_kind(), NavStateKind::Forward);
    }

    #[test]
    fn test_rear_blocked_forces_right_turn() {
        let mut nav = NavCtrl::default();

        run(&mut nav, 0, &[20.0, 20.0], Some(10.0));
        assert_eq!(nav.state_kind(), NavStateKind::AvoidRight);
    }

    #[test]
    fn test_avoid_timeout_backs_up_then_scans() {
        let p = Params::default();
        let mut nav = NavCtrl::new(p.clone()).unwrap();

        nav.step(0, Some(20.0), None);
        nav.step(50, Some(20.0), None);
        assert_eq!(nav.state(), NavState::AvoidLeft { entered_at_ms: 50 });

        // Still spinning just before the timeout
        let timeout = p.turn_duration_ms * p.avoid_timeout_turns;
        let cmd = nav.step(50 + timeout - 1, Some(20.0), None);
        assert_eq!(cmd, MotionCommand::spin_left(150));

        let cmd = nav.step(50 + timeout, Some(20.0), None);
        assert_eq!(nav.state_kind(), NavStateKind::BackingUp);
        assert_eq!(cmd, MotionCommand::reverse(90));

        let backing_at = 50 + timeout;
        let cmd = nav.step(backing_at + p.backup_duration_ms - 1, Some(20.0), None);
        assert_eq!(cmd, MotionCommand::reverse(90));

        // Backup done, scan in the last turn direction
        let cmd = nav.step(backing_at + p.backup_duration_ms, Some(20.0), None);
        assert_eq!(nav.state_kind(), NavStateKind::Scanning);
        assert_eq!(cmd, MotionCommand::spin_left(150));

        // Scan done, forward again finds the obstacle still there
        let scan_at = backing_at + p.backup_duration_ms;
        nav.step(scan_at + p.scan_duration_ms, Some(20.0), None);
        assert_eq!(nav.state_kind(), NavStateKind::ObstacleDetected);
        assert_eq!(nav.stuck_counter(), 0);
    }

    #[test]
    fn test_rear_blocked_while_backing_up() {
        let p = Params::default();
        let mut nav = NavCtrl::new(p.clone()).unwrap();

        nav.step(0, Some(20.0), None);
        nav.step(50, Some(20.0), None);
        nav.step(50 + p.turn_duration_ms * p.avoid_timeout_turns, Some(20.0), None);
        assert_eq!(nav.state_kind(), NavStateKind::BackingUp);

        let cmd = nav.step(1500, Some(20.0), Some(15.0));
        assert_eq!(nav.state_kind(), NavStateKind::Stuck);
        assert!(cmd.is_stop());

        // Stuck requests the rotation and moves on to scanning
        let cmd = nav.step(1550, Some(20.0), Some(15.0));
        assert_eq!(nav.state_kind(), NavStateKind::Scanning);
        assert_eq!(cmd, MotionCommand::spin_left(150));
    }

    #[test]
    fn test_stuck_detection() {
        use NavStateKind::*;

        let mut nav = NavCtrl::default();

        let steps = run(&mut nav, 0, &[45.0, 45.2, 45.0, 44.8, 45.0, 45.0, 45.0], None);
        assert_eq!(
            kinds(&steps),
            vec![Forward, Forward, Forward, Forward, Forward, Stuck, Scanning]
        );
        assert!(steps[5].1.is_stop());

        // Progress resets the count
        let mut nav = NavCtrl::default();
        run(&mut nav, 0, &[45.0, 45.0, 45.0, 42.0, 42.0], None);
        assert_eq!(nav.stuck_counter(), 1);
        assert_eq!(nav.state_kind(), Forward);

        // No stagnation counted beyond the safe distance
        let mut nav = NavCtrl::default();
        run(&mut nav, 0, &[80.0; 10], None);
        assert_eq!(nav.stuck_counter(), 0);
    }

    #[test]
    fn test_scanning_returns_forward() {
        let p = Params::default();
        let mut nav = NavCtrl::new(p.clone()).unwrap();

        run(&mut nav, 0, &[45.0; 7], None);
        assert_eq!(nav.state(), NavState::Scanning { entered_at_ms: 300 });

        let cmd = nav.step(300 + p.scan_duration_ms, Some(100.0), None);
        assert_eq!(nav.state_kind(), NavStateKind::Forward);
        assert_eq!(cmd, MotionCommand::forward(180));
        assert_eq!(nav.stuck_counter(), 0);
    }

    #[test]
    fn test_climbing() {
        let p = Params::default();
        let mut nav = NavCtrl::new(p.clone()).unwrap();

        let steps = run(&mut nav, 0, &[50.0, 12.0, 12.0], None);
        assert_eq!(steps[1].0, NavStateKind::Climbing);
        assert_eq!(steps[1].1, MotionCommand::forward(255));
        assert_eq!(steps[2].1, MotionCommand::forward(255));

        // After the boost the close range is treated as an obstacle again
        nav.step(50 + p.climb_duration_ms, Some(12.0), None);
        assert_eq!(nav.state_kind(), NavStateKind::ObstacleDetected);

        // Without the climb heuristic the same drop is just an obstacle
        let mut nav = NavCtrl::new(Params { climb_enabled: false, ..p }).unwrap();
        run(&mut nav, 0, &[50.0, 12.0], None);
        assert_eq!(nav.state_kind(), NavStateKind::ObstacleDetected);
    }

    #[test]
    fn test_climbing_on_raw_drop() {
        let mut nav = NavCtrl::default();

        nav.step_with_raw(0, Some(50.0), Some(50.0), None);

        // The smoothed range is still clear but the raw one fell onto a ledge
        let cmd = nav.step_with_raw(50, Some(38.6), Some(12.0), None);
        assert_eq!(nav.state_kind(), NavStateKind::Climbing);
        assert_eq!(cmd, MotionCommand::forward(255));
        assert!(!nav.obstacle_detected());

        // A slow smoothed decline with a steady raw range is not a ledge
        let mut nav = NavCtrl::default();
        for (i, f) in [50.0, 40.0, 30.0, 20.0].iter().enumerate() {
            nav.step_with_raw(i as u64 * PERIOD_MS, Some(*f), Some(12.0), None);
        }
        assert_ne!(nav.state_kind(), NavStateKind::Climbing);
    }

    #[test]
    fn test_approach_slows_down() {
        let mut nav = NavCtrl::default();

        // Beyond the safe distance, cruise
        assert_eq!(nav.step(0, Some(100.0), None), MotionCommand::forward(180));

        // First approach cycle is proportional only: 4 * (50 - 45) = 20
        assert_eq!(nav.step(50, Some(45.0), None), MotionCommand::forward(160));
        assert!(nav.pid_status().output > 0.0);

        // Closing quickly brakes harder, down to the minimum speed
        let cmd = nav.step(100, Some(35.0), None);
        assert_eq!(cmd, MotionCommand::forward(40));

        // Leaving the approach region drops the controller history
        assert_eq!(nav.step(150, Some(70.0), None), MotionCommand::forward(180));
        assert_eq!(nav.pid_status().output, 0.0);
    }

    #[test]
    fn test_approach_disabled() {
        let mut nav = NavCtrl::new(Params {
            approach_pid_enabled: false,
            ..Params::default()
        }).unwrap();

        assert_eq!(nav.step(0, Some(45.0), None), MotionCommand::forward(180));
    }

    #[test]
    fn test_no_front_reading_cruises() {
        let mut nav = NavCtrl::default();
        assert_eq!(nav.step(0, None, None), MotionCommand::forward(180));
        assert_eq!(nav.state_kind(), NavStateKind::Forward);
    }

    #[test]
    fn test_ttc_reported() {
        let mut nav = NavCtrl::default();

        nav.step(0, Some(100.0), None);
        assert_eq!(nav.ttc_ms(), None);

        // 10 cm in 50 ms is 200 cm/s, 90 cm away
        nav.step(50, Some(90.0), None);
        let ttc = nav.ttc_ms().unwrap();
        assert!((ttc - 450.0).abs() < 1e-2);

        // Moving away
        nav.step(100, Some(95.0), None);
        assert_eq!(nav.ttc_ms(), None);
    }

    #[test]
    fn test_reset() {
        let mut nav = NavCtrl::default();
        run(&mut nav, 0, &[20.0, 20.0, 20.0], None);
        assert_eq!(nav.state_kind(), NavStateKind::AvoidLeft);

        nav.reset();
        assert_eq!(nav.state(), NavState::Idle);
        assert!(!nav.obstacle_detected());
        assert_eq!(nav.pid_status(), PidStatus {
            setpoint: 50.0,
            ..PidStatus::default()
        });

        // Turn alternation starts afresh
        run(&mut nav, 1000, &[20.0, 20.0], None);
        assert_eq!(nav.state_kind(), NavStateKind::AvoidLeft);
    }

    #[test]
    fn test_tune_pid() {
        let mut nav = NavCtrl::default();

        let applied = nav.tune_pid(PidTuning { k_p: 100.0, k_i: 0.5, k_d: 0.0 }).unwrap();
        assert_eq!(applied, PidTuning { k_p: 20.0, k_i: 0.5, k_d: 0.0 });
    }

    #[test]
    fn test_proc() {
        let mut nav = NavCtrl::default();
        nav.init(Params::default()).unwrap();

        let (cmd, rpt) = nav.proc(&InputData {
            now_ms: 0,
            front_distance_cm: Some(200.0),
            front_raw_cm: Some(200.0),
            rear_distance_cm: None,
        }).unwrap();

        assert_eq!(cmd, MotionCommand::forward(180));
        assert_eq!(rpt.state, NavStateKind::Forward);
        assert!(rpt.state_changed);

        assert!(nav.init(Params { obstacle_threshold_cm: 45.0, ..Params::default() }).is_err());
    }
}

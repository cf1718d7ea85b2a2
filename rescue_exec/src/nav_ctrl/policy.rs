//! Per state step functions of the navigation policy
//!
//! Each function returns the next state and the command for this cycle.
//! States which hand back to `Forward` step it in the same cycle, so the robot
//! never sits out a cycle on the way back.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};

use super::{state::Tick, NavCtrl, NavState, TurnDirection};
use comms_if::eqpt::drive::MotionCommand;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NavCtrl {

    pub(crate) fn step_forward(&mut self, tick: &Tick) -> (NavState, MotionCommand) {
        // A ledge shows up in the raw range before the smoothed one crosses
        // the obstacle threshold
        if tick.climbable {
            self.stuck_counter = 0;
            info!("Sudden drop to {:?} cm, climbing", tick.front_raw);
            return (
                NavState::Climbing { entered_at_ms: tick.now_ms },
                MotionCommand::forward(self.params.climb_speed as i32)
            );
        }

        if tick.obstacle {
            self.stuck_counter = 0;
            return (NavState::ObstacleDetected, MotionCommand::stop());
        }

        // No progress while close to something counts towards being stuck
        match (tick.front, tick.front_delta_cm) {
            (Some(f), Some(delta))
                if delta.abs() < self.params.stuck_tolerance_cm
                    && f < self.params.safe_distance_cm =>
            {
                self.stuck_counter = self.stuck_counter.saturating_add(1);
            },
            (Some(_), _) => self.stuck_counter = 0,
            (None, _) => (),
        }

        if self.stuck_counter >= self.params.stuck_threshold_ticks {
            warn!(
                "No progress for {} cycles with front at {:?} cm, robot is stuck",
                self.stuck_counter, tick.front
            );
            return (NavState::Stuck, MotionCommand::stop());
        }

        let cruise = self.params.cruise_speed as f64;

        match tick.front {
            Some(f) if self.params.approach_pid_enabled && f < self.params.safe_distance_cm => {
                self.pid_active = true;

                let brake = self.pid.compute(f as f64, tick.now_ms);
                let speed = clamp(
                    &(cruise - brake),
                    &(self.params.min_approach_speed as f64),
                    &cruise
                );

                (NavState::Forward, MotionCommand::forward(speed.round() as i32))
            },
            _ => (NavState::Forward, MotionCommand::forward(self.params.cruise_speed as i32)),
        }
    }

    pub(crate) fn step_obstacle_detected(&mut self, tick: &Tick) -> (NavState, MotionCommand) {
        let dir = if self.rear_blocked(tick) {
            TurnDirection::Right
        }
        else {
            match self.last_turn {
                Some(d) => d.opposite(),
                None => TurnDirection::Left,
            }
        };

        debug!("Obstacle at {:?} cm, turning {:?}", tick.front, dir);

        self.last_turn = Some(dir);

        (dir.avoid_state(tick.now_ms), MotionCommand::stop())
    }

    pub(crate) fn step_avoid(
        &mut self,
        dir: TurnDirection,
        entered_at_ms: u64,
        tick: &Tick
    ) -> (NavState, MotionCommand) {
        if !tick.obstacle {
            return self.step_forward(tick);
        }

        let timeout_ms = self.params.turn_duration_ms * self.params.avoid_timeout_turns;

        if tick.now_ms.saturating_sub(entered_at_ms) >= timeout_ms {
            if self.rear_blocked(tick) {
                warn!("Front still blocked after turning and rear blocked, robot is stuck");
                return (NavState::Stuck, MotionCommand::stop());
            }

            debug!("Front still blocked after turning {:?}, backing up", dir);
            return (
                NavState::BackingUp { entered_at_ms: tick.now_ms },
                MotionCommand::reverse(self.params.backup_speed() as i32)
            );
        }

        (dir.avoid_state(entered_at_ms), dir.spin(self.params.turn_speed))
    }

    pub(crate) fn step_backing_up(
        &mut self,
        entered_at_ms: u64,
        tick: &Tick
    ) -> (NavState, MotionCommand) {
        if self.rear_blocked(tick) {
            warn!("Rear blocked at {:?} cm while backing up, robot is stuck", tick.rear);
            return (NavState::Stuck, MotionCommand::stop());
        }

        if tick.now_ms.saturating_sub(entered_at_ms) >= self.params.backup_duration_ms {
            return self.enter_scanning(tick);
        }

        (
            NavState::BackingUp { entered_at_ms },
            MotionCommand::reverse(self.params.backup_speed() as i32)
        )
    }

    pub(crate) fn step_stuck(&mut self, tick: &Tick) -> (NavState, MotionCommand) {
        self.enter_scanning(tick)
    }

    pub(crate) fn step_scanning(
        &mut self,
        entered_at_ms: u64,
        tick: &Tick
    ) -> (NavState, MotionCommand) {
        if tick.now_ms.saturating_sub(entered_at_ms) >= self.params.scan_duration_ms {
            self.stuck_counter = 0;
            return self.step_forward(tick);
        }

        (
            NavState::Scanning { entered_at_ms },
            self.scan_direction().spin(self.params.turn_speed)
        )
    }

    pub(crate) fn step_climbing(
        &mut self,
        entered_at_ms: u64,
        tick: &Tick
    ) -> (NavState, MotionCommand) {
        if tick.now_ms.saturating_sub(entered_at_ms) >= self.params.climb_duration_ms {
            return self.step_forward(tick);
        }

        (
            NavState::Climbing { entered_at_ms },
            MotionCommand::forward(self.params.climb_speed as i32)
        )
    }

    fn enter_scanning(&mut self, tick: &Tick) -> (NavState, MotionCommand) {
        (
            NavState::Scanning { entered_at_ms: tick.now_ms },
            self.scan_direction().spin(self.params.turn_speed)
        )
    }

    /// Scans continue the way the robot last turned.
    fn scan_direction(&self) -> TurnDirection {
        self.last_turn.unwrap_or(TurnDirection::Left)
    }

    /// No valid rear range counts as clear.
    fn rear_blocked(&self, tick: &Tick) -> bool {
        match tick.rear {
            Some(r) => r < self.params.rear_clear_distance_cm,
            None => false,
        }
    }
}

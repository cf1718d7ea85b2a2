//! # Manual control
//!
//! Turns operator motion telecommands into motion commands. A command is held
//! until another one or a stop arrives, except for the full rotation which
//! stops by itself once its duration has elapsed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{eqpt::drive::MotionCommand, tc::Tc};
use log::{debug, trace};

pub use params::Params;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The manual command being executed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManualCmd {
    Drive(MotionCommand),
    Rotation { started_at_ms: u64 },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ManualCtrl {
    params: Params,
    current: Option<ManualCmd>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ManualCtrl {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            current: None,
        }
    }

    /// Start executing a motion telecommand.
    ///
    /// Returns `false` if the telecommand is not a manual motion.
    pub fn set(&mut self, tc: Tc, now_ms: u64) -> bool {
        let drive = self.params.drive_speed as i32;
        let turn = self.params.turn_speed as i32;

        self.current = match tc {
            Tc::Forward => Some(ManualCmd::Drive(MotionCommand::forward(drive))),
            Tc::Backward => Some(ManualCmd::Drive(MotionCommand::reverse(drive))),
            Tc::Left => Some(ManualCmd::Drive(MotionCommand::spin_left(turn))),
            Tc::Right => Some(ManualCmd::Drive(MotionCommand::spin_right(turn))),
            Tc::Rotate360 => Some(ManualCmd::Rotation { started_at_ms: now_ms }),
            Tc::Stop => None,
            _ => return false,
        };

        debug!("Manual command: {:?}", self.current);

        true
    }

    /// The motion command for this cycle.
    pub fn step(&mut self, now_ms: u64) -> MotionCommand {
        let cmd = match self.current {
            Some(ManualCmd::Drive(c)) => c,
            Some(ManualCmd::Rotation { started_at_ms }) => {
                if now_ms.saturating_sub(started_at_ms) < self.params.rotation_duration_ms {
                    MotionCommand::spin_left(self.params.turn_speed as i32)
                }
                else {
                    debug!("Manual rotation complete");
                    self.current = None;
                    MotionCommand::stop()
                }
            },
            None => MotionCommand::stop(),
        };

        trace!("Manual output: {:?}", cmd);

        cmd
    }

    pub fn current(&self) -> Option<ManualCmd> {
        self.current
    }

    /// Drop any held command.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_held_until_stop() {
        let mut m = ManualCtrl::default();

        assert!(m.set(Tc::Forward, 0));
        assert_eq!(m.step(0), MotionCommand::forward(180));
        assert_eq!(m.step(10_000), MotionCommand::forward(180));

        assert!(m.set(Tc::Left, 10_000));
        assert_eq!(m.step(10_050), MotionCommand::spin_left(150));

        assert!(m.set(Tc::Stop, 10_100));
        assert_eq!(m.step(10_100), MotionCommand::stop());
        assert_eq!(m.current(), None);
    }

    #[test]
    fn test_rotation_is_timed() {
        let mut m = ManualCtrl::default();

        m.set(Tc::Rotate360, 1000);
        assert_eq!(m.step(1000), MotionCommand::spin_left(150));
        assert_eq!(m.step(2999), MotionCommand::spin_left(150));
        assert_eq!(m.step(3000), MotionCommand::stop());
        assert_eq!(m.current(), None);
        assert_eq!(m.step(3050), MotionCommand::stop());
    }

    #[test]
    fn test_non_motion_tc() {
        let mut m = ManualCtrl::default();
        m.set(Tc::Backward, 0);

        assert!(!m.set(Tc::AutonomousOn, 0));
        assert_eq!(m.step(0), MotionCommand::reverse(180));
    }
}

//! # Rescue Executable Parameters
//!
//! This module provide parameters for the rescue executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::tm::BoardRole;
use serde::Deserialize;

use crate::manual_ctrl;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Executable parameters, loaded from `rescue_exec.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RescueExecParams {

    /// Which board this executable is running on.
    pub board_role: BoardRole,

    /// Target period of one control cycle.
    ///
    /// Units: milliseconds
    pub cycle_period_ms: u64,

    /// The process is aborted if the control loop does not feed the watchdog
    /// within this time.
    ///
    /// Units: milliseconds
    pub watchdog_timeout_ms: u64,

    /// Number of cycles between telemetry lines in the log.
    pub tm_log_period_cycles: u64,

    /// Directory sessions are created in, relative to the software root.
    pub sessions_dir: String,

    pub manual: manual_ctrl::Params,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Default for RescueExecParams {
    fn default() -> Self {
        Self {
            board_role: BoardRole::Front,
            cycle_period_ms: 50,
            watchdog_timeout_ms: 5000,
            tm_log_period_cycles: 20,
            sessions_dir: "sessions".into(),
            manual: manual_ctrl::Params::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load() {
        let p: RescueExecParams = util::params::from_str(
            "board_role = \"Rear\"\n\
            cycle_period_ms = 40\n\
            [manual]\n\
            drive_speed = 200\n"
        ).unwrap();

        assert_eq!(p.board_role, BoardRole::Rear);
        assert_eq!(p.cycle_period_ms, 40);
        assert_eq!(p.watchdog_timeout_ms, 5000);
        assert_eq!(p.manual.drive_speed, 200);
        assert_eq!(p.manual.turn_speed, 150);
    }
}

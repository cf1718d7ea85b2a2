//! # Navigation control module
//!
//! Reactive obstacle avoidance for autonomous mode. A state machine driven by
//! the filtered front and rear ranges and the time spent in each state
//! produces one [`MotionCommand`](comms_if::eqpt::drive::MotionCommand) per
//! cycle. While closing on an obstacle the approach controller slows the robot
//! smoothly rather than stepping from cruise speed to a stop.
//!
//! States:
//!
//! - `Forward` - Drive at cruise speed, slowing down inside the safe distance.
//! - `ObstacleDetected` - Stop for one cycle and pick a turn direction.
//! - `AvoidLeft`/`AvoidRight` - Spin in place until the front clears.
//! - `BackingUp` - Reverse at half cruise speed while the rear is clear.
//! - `Stuck` - No progress has been made, request a rotation.
//! - `Scanning` - Rotate in place for a while, then try forward again.
//! - `Climbing` - A sudden close drop in range is taken as a climbable ledge
//!   and driven over at boosted speed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod nav_state;
mod obstacle;
mod params;
mod policy;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use nav_state::*;
pub use obstacle::ObstacleFlag;
pub use params::Params;
pub use state::*;

use crate::approach_ctrl::PidError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during NavCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum NavCtrlError {
    #[error("Invalid navigation parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid approach controller parameters: {0}")]
    ApproachParams(#[from] PidError),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Estimated time to collision.
///
/// Returns `None` unless the object is being approached, i.e. the approach
/// speed is positive.
///
/// # Inputs
/// - `distance_cm`: Current range to the object
/// - `approach_speed_cm_s`: Closing speed, positive when getting nearer
///
/// # Outputs
/// - Time to collision in milliseconds
pub fn ttc_ms(distance_cm: f32, approach_speed_cm_s: f32) -> Option<f32> {
    if approach_speed_cm_s > 0.0
        && approach_speed_cm_s.is_finite()
        && distance_cm.is_finite()
        && distance_cm >= 0.0
    {
        Some(distance_cm / approach_speed_cm_s * 1000.0)
    }
    else {
        None
    }
}

//! # Drive Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Largest magnitude a wheel speed demand may take, matching the 8 bit PWM resolution of the
/// motor drivers.
pub const MAX_WHEEL_SPEED: i16 = 255;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Differential drive demand handed to the motor drivers once per cycle.
///
/// Positive speeds drive the wheels forwards, negative speeds backwards. Both speeds are always
/// within `[-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED]`, the constructors enforce this.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionCommand {
    pub left_speed: i16,
    pub right_speed: i16,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionCommand {
    /// Build a command from arbitrary left and right speeds, clamping each into the valid range.
    pub fn new(left_speed: i32, right_speed: i32) -> Self {
        Self {
            left_speed: clamp_speed(left_speed),
            right_speed: clamp_speed(right_speed),
        }
    }

    /// All wheels stopped.
    pub fn stop() -> Self {
        Self::default()
    }

    /// Both sides driving forwards at the same speed.
    pub fn forward(speed: i32) -> Self {
        Self::new(speed, speed)
    }

    /// Both sides driving backwards at the same speed.
    pub fn reverse(speed: i32) -> Self {
        Self::new(-speed, -speed)
    }

    /// Spin anticlockwise (to the left) on the spot.
    pub fn spin_left(speed: i32) -> Self {
        Self::new(-speed, speed)
    }

    /// Spin clockwise (to the right) on the spot.
    pub fn spin_right(speed: i32) -> Self {
        Self::new(speed, -speed)
    }

    /// True if neither side is being driven.
    pub fn is_stop(&self) -> bool {
        self.left_speed == 0 && self.right_speed == 0
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn clamp_speed(speed: i32) -> i16 {
    let max = MAX_WHEEL_SPEED as i32;
    speed.max(-max).min(max) as i16
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_speeds_are_clamped() {
        let cmd = MotionCommand::new(1000, -1000);
        assert_eq!(cmd.left_speed, 255);
        assert_eq!(cmd.right_speed, -255);

        let cmd = MotionCommand::reverse(i32::MIN + 1);
        assert_eq!(cmd.left_speed, 255);
    }

    #[test]
    fn test_spin_directions() {
        let left = MotionCommand::spin_left(150);
        assert!(left.left_speed < 0 && left.right_speed > 0);

        let right = MotionCommand::spin_right(150);
        assert!(right.left_speed > 0 && right.right_speed < 0);

        assert!(MotionCommand::stop().is_stop());
        assert!(!MotionCommand::forward(1).is_stop());
    }
}

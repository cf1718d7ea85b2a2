//! Navigation states
//!
//! Timed states carry the time they were entered at, so the policy only
//! needs the current time to know how long it has been in them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{eqpt::drive::MotionCommand, tm::NavStateKind};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// Not yet stepped since the last reset.
    Idle,

    Forward,
    ObstacleDetected,
    AvoidLeft { entered_at_ms: u64 },
    AvoidRight { entered_at_ms: u64 },
    BackingUp { entered_at_ms: u64 },
    Climbing { entered_at_ms: u64 },
    Stuck,
    Scanning { entered_at_ms: u64 },
}

/// Direction of an in place turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NavState {
    pub fn kind(&self) -> NavStateKind {
        match self {
            NavState::Idle => NavStateKind::Idle,
            NavState::Forward => NavStateKind::Forward,
            NavState::ObstacleDetected => NavStateKind::ObstacleDetected,
            NavState::AvoidLeft { .. } => NavStateKind::AvoidLeft,
            NavState::AvoidRight { .. } => NavStateKind::AvoidRight,
            NavState::BackingUp { .. } => NavStateKind::BackingUp,
            NavState::Climbing { .. } => NavStateKind::Climbing,
            NavState::Stuck => NavStateKind::Stuck,
            NavState::Scanning { .. } => NavStateKind::Scanning,
        }
    }

    /// Time spent in a timed state, `None` for the untimed ones.
    ///
    /// Units: milliseconds
    pub fn elapsed_ms(&self, now_ms: u64) -> Option<u64> {
        match self {
            NavState::AvoidLeft { entered_at_ms }
            | NavState::AvoidRight { entered_at_ms }
            | NavState::BackingUp { entered_at_ms }
            | NavState::Climbing { entered_at_ms }
            | NavState::Scanning { entered_at_ms } => {
                Some(now_ms.saturating_sub(*entered_at_ms))
            },
            _ => None,
        }
    }
}

impl Default for NavState {
    fn default() -> Self {
        NavState::Idle
    }
}

impl TurnDirection {
    pub fn opposite(self) -> Self {
        match self {
            TurnDirection::Left => TurnDirection::Right,
            TurnDirection::Right => TurnDirection::Left,
        }
    }

    /// In place spin in this direction.
    pub fn spin(self, speed: i16) -> MotionCommand {
        match self {
            TurnDirection::Left => MotionCommand::spin_left(speed as i32),
            TurnDirection::Right => MotionCommand::spin_right(speed as i32),
        }
    }

    /// The avoidance state turning this way.
    pub fn avoid_state(self, now_ms: u64) -> NavState {
        match self {
            TurnDirection::Left => NavState::AvoidLeft { entered_at_ms: now_ms },
            TurnDirection::Right => NavState::AvoidRight { entered_at_ms: now_ms },
        }
    }
}

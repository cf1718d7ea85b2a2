//! # Telecommand module
//!
//! Operator commands accepted by the rescue robot. Commands arrive as small
//! JSON packets of the form `{"type": "FORWARD"}`, with a `"payload"` object
//! for those types that carry data (currently only `TUNE_PID`).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use serde_json::{self, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An operator command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Tc {
    /// Drive forward in manual mode
    Forward,

    /// Drive backward in manual mode
    Backward,

    /// Spin left in manual mode
    Left,

    /// Spin right in manual mode
    Right,

    /// Stop driving and return to idle
    Stop,

    /// Timed full rotation on the spot in manual mode
    Rotate360,

    /// Enter autonomous navigation
    AutonomousOn,

    /// Leave autonomous navigation and return to idle
    AutonomousOff,

    /// Operator requested emergency stop, latches like any other hazard
    EmergencyStop,

    /// Clear a latched emergency and return to idle
    ClearEmergency,

    /// Retune the approach controller gains
    TunePid(PidTuning),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0} is expected to have a payload but it doesn't")]
    MissingPayload(String),

    #[error("TC of type {0} has an invalid payload: {1}")]
    InvalidPayload(String, serde_json::Error),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains for the approach controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidTuning {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value
        let val: Value = match serde_json::from_str(json_str) {
            Ok(v) => v,
            Err(e) => return Err(TcParseError::InvalidJson(e))
        };

        let type_str = match val["type"].as_str() {
            Some(s) => s,
            None => return Err(TcParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };

        let tc = match type_str {
            "FORWARD" => Tc::Forward,
            "BACKWARD" => Tc::Backward,
            "LEFT" => Tc::Left,
            "RIGHT" => Tc::Right,
            "STOP" => Tc::Stop,
            "ROTATE_360" => Tc::Rotate360,
            "AUTO_ON" => Tc::AutonomousOn,
            "AUTO_OFF" => Tc::AutonomousOff,
            "ESTOP" => Tc::EmergencyStop,
            "CLEAR_ESTOP" => Tc::ClearEmergency,
            "TUNE_PID" => {
                if val["payload"].is_null() {
                    return Err(TcParseError::MissingPayload(type_str.into()))
                }

                let tuning = PidTuning::deserialize(&val["payload"])
                    .map_err(|e| TcParseError::InvalidPayload(
                        type_str.into(), e
                    ))?;

                Tc::TunePid(tuning)
            },
            _ => return Err(TcParseError::InvalidType(
                format!("{} is not a recognised TC type", type_str)
            ))
        };

        Ok(tc)
    }

    /// Returns true if this command directly drives the wheels while in
    /// manual mode.
    pub fn is_manual_motion(&self) -> bool {
        matches!(
            self,
            Tc::Forward | Tc::Backward | Tc::Left | Tc::Right | Tc::Rotate360
        )
    }
}

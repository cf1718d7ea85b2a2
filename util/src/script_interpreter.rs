//! # Rescue robot script interpreter module
//!
//! This module provides an interpreter for timed scripts, which stand in for
//! the live transport and sensor drivers. A script is a list of lines:
//!
//! ```text
//! 0.0: SENS {"front_distance_cm": 120.0, "rear_distance_cm": 80.0, "gas_level": 150};
//! 0.5: TC {"type": "AUTO_ON"};
//! ```
//!
//! `TC` lines carry a telecommand, `SENS` lines a sensor frame, both as JSON.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

// Internal
use comms_if::{eqpt::sens::SensorFrame, tc::{Tc, TcParseError}};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An entry which is scripted to occur at a specific time.
#[derive(Debug, Clone, PartialEq)]
struct TimedEntry {
    /// The time the entry is supposed to execute at
    exec_time_s: f64,

    entry: ScriptEntry,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending`
/// to acquire the entries that are now due.
#[derive(Debug)]
pub struct ScriptInterpreter {
    entries: VecDeque<TimedEntry>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError),

    #[error("Script contains an invalid sensor frame at {0} s: {1}")]
    InvalidSensorFrame(f64, serde_json::Error),

    #[error("Cannot build the script regex: {0}")]
    RegexError(regex::Error),

    #[error("Script entries must be in time order, found {0} s after {1} s")]
    OutOfOrder(f64, f64),
}

/// One scripted item.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEntry {
    Tc(Tc),
    Sensors(SensorFrame),
}

pub enum PendingEntries {
    None,
    Some(Vec<ScriptEntry>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref();

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(
                path.to_string_lossy().into_owned()
            ));
        }

        let script = fs::read_to_string(path)
            .map_err(ScriptError::ScriptLoadError)?;

        Self::from_str(&script)
    }

    /// Create a new interpreter from the script's contents.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut entries: VecDeque<TimedEntry> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*(TC|SENS)\s+([^;]*);")
            .multi_line(true)
            .build()
            .map_err(ScriptError::RegexError)?;

        for cap in re.captures_iter(script) {
            // Groups 1, 3 and 4 are not optional so always exist on a match
            let time_str = &cap[1];
            let kind = &cap[3];
            let payload = &cap[4];

            // Parse the exec time
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(last) = entries.back() {
                if exec_time_s < last.exec_time_s {
                    return Err(ScriptError::OutOfOrder(exec_time_s, last.exec_time_s));
                }
            }

            let entry = match kind {
                "TC" => ScriptEntry::Tc(
                    Tc::from_json(payload)
                        .map_err(|e| ScriptError::InvalidTc(exec_time_s, e))?
                ),
                _ => ScriptEntry::Sensors(
                    serde_json::from_str(payload)
                        .map_err(|e| ScriptError::InvalidSensorFrame(exec_time_s, e))?
                ),
            };

            entries.push_back(TimedEntry { exec_time_s, entry });
        }

        if entries.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter { entries })
    }

    /// Return the entries due at or before `current_time_s`, in script order.
    pub fn get_pending(&mut self, current_time_s: f64) -> PendingEntries {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.entries.is_empty() {
            return PendingEntries::EndOfScript
        }

        let mut due: Vec<ScriptEntry> = vec![];

        while let Some(head) = self.entries.front() {
            if head.exec_time_s > current_time_s {
                break;
            }
            if let Some(e) = self.entries.pop_front() {
                due.push(e.entry);
            }
        }

        if due.is_empty() {
            PendingEntries::None
        }
        else {
            PendingEntries::Some(due)
        }
    }

    /// Get the number of entries remaining in the script
    pub fn get_num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.entries.back() {
            Some(e) => e.exec_time_s,
            None => 0f64
        }
    }
}

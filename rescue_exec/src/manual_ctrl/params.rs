//! Parameters structure for manual control

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Manual driving speeds, the `[manual]` table of `rescue_exec.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    pub drive_speed: i16,
    pub turn_speed: i16,

    /// Time to spin in place for one full rotation.
    ///
    /// Units: milliseconds
    pub rotation_duration_ms: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            drive_speed: 180,
            turn_speed: 150,
            rotation_duration_ms: 2000,
        }
    }
}

//! # Communications interface crate.
//!
//! Provides the types that cross the boundary of the rescue control core: telecommands coming in
//! from the operator, sensor frames coming in from the sensor collaborators and motion commands
//! going out to the actuation collaborators, and the telemetry reported back.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;
pub mod tm;

/// Command and data definitions for equipment (drive motors, sensors)
pub mod eqpt;

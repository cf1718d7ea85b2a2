//! # Rescue robot control library.
//!
//! This library allows other crates in the workspace to access items defined inside the rescue
//! crate, and is where the control core lives so that it can be tested without the executable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Approach controller - PID used to slow down smoothly when closing on an obstacle
pub mod approach_ctrl;

/// Control loop - one cooperative cycle of the whole core
pub mod ctrl_loop;

/// Global data store of the control core
pub mod data_store;

/// Hazard manager - latches gas and collision hazards until cleared by the operator
pub mod hazard_mgr;

/// Manual control - converts operator motion commands into motion commands
pub mod manual_ctrl;

/// Mode manager - the operating mode state machine
pub mod mode_mgr;

/// Navigation control - reactive obstacle avoidance in autonomous mode
pub mod nav_ctrl;

/// Executable parameters
pub mod params;

/// Sensors - ranging, gas and odometry filters
pub mod sensors;

/// Telecommand processor
mod tc_processor;

/// Telemetry snapshot and archive records
pub mod tm;

/// Software watchdog
pub mod watchdog;

//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the equipment
//! collaborators (motor drivers and sensor front-ends).

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;
pub mod sens;

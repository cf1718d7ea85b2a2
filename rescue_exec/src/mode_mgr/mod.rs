//! # Mode manager
//!
//! Owns the top level operating mode. Every change of mode goes through here,
//! and while an emergency is latched the only way out is
//! [`ModeMgr::clear_emergency`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tm::OperatingMode;
use log::{debug, info, warn};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The operating mode state machine.
#[derive(Debug, Clone)]
pub struct ModeMgr {
    mode: OperatingMode,
}

/// A mode change which has been made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    pub from: OperatingMode,
    pub to: OperatingMode,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModeMgr {
    pub fn new() -> Self {
        Self {
            mode: OperatingMode::Init,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn is_emergency(&self) -> bool {
        self.mode == OperatingMode::Emergency
    }

    /// Leave `Init` once the modules are initialised.
    pub fn start(&mut self) -> Option<ModeChange> {
        match self.mode {
            OperatingMode::Init => self.change(OperatingMode::Idle),
            m => {
                debug!("Start requested in {:?}, ignored", m);
                None
            }
        }
    }

    pub fn set_idle(&mut self) -> Option<ModeChange> {
        self.request(OperatingMode::Idle)
    }

    pub fn set_manual(&mut self) -> Option<ModeChange> {
        self.request(OperatingMode::Manual)
    }

    pub fn set_autonomous(&mut self) -> Option<ModeChange> {
        self.request(OperatingMode::Autonomous)
    }

    /// Enter `Emergency` from any mode.
    pub fn trigger_emergency(&mut self) -> Option<ModeChange> {
        if self.is_emergency() {
            return None;
        }

        warn!("Entering emergency from {:?}", self.mode);
        self.change(OperatingMode::Emergency)
    }

    /// Leave `Emergency` for `Idle`. Does nothing outside of an emergency.
    pub fn clear_emergency(&mut self) -> Option<ModeChange> {
        if !self.is_emergency() {
            debug!("Clear emergency requested in {:?}, ignored", self.mode);
            return None;
        }

        self.change(OperatingMode::Idle)
    }

    /// A non-emergency mode request. Rejected while in `Init` or `Emergency`.
    fn request(&mut self, to: OperatingMode) -> Option<ModeChange> {
        match self.mode {
            OperatingMode::Emergency | OperatingMode::Init => {
                debug!("{:?} requested in {:?}, rejected", to, self.mode);
                None
            },
            m if m == to => None,
            _ => self.change(to),
        }
    }

    fn change(&mut self, to: OperatingMode) -> Option<ModeChange> {
        let from = self.mode;
        self.mode = to;

        info!("Mode {:?} -> {:?}", from, to);

        Some(ModeChange { from, to })
    }
}

impl Default for ModeMgr {
    fn default() -> Self {
        Self::new()
    }
}

//! # Hazard manager
//!
//! The hazard arbiter decides each cycle whether it is safe to move. Once a
//! hazard is seen it latches, and the robot stays stopped until the operator
//! explicitly clears it, whatever the sensors do afterwards.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::convert::Infallible;

use comms_if::tm::{HazardEvent, HazardKind};
use log::{error, info, warn};
use util::module::State;

pub use params::Params;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HazardMgrError {
    #[error("Invalid hazard parameters: {0}")]
    InvalidParams(String),
}

/// Latch state. The only way out of `Latched` is [`HazardArbiter::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardState {
    Clear,
    Latched(HazardKind),
}

/// Result of a hazard check.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Safe,

    /// Not safe to move. `event` is only set on the check that latched.
    Latched {
        kind: HazardKind,
        event: Option<HazardEvent>,
    },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HazardArbiter {
    params: Params,
    state: HazardState,
}

/// Input to the hazard arbiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Units: milliseconds
    pub now_ms: u64,

    /// Smoothed gas level, `None` if not yet sampled.
    pub gas_level: Option<f32>,

    /// Smoothed front range, `None` if no valid reading.
    ///
    /// Units: centimeters
    pub front_distance_cm: Option<f32>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }
}

impl HazardArbiter {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            state: HazardState::Clear,
        }
    }

    /// Check the current readings against the hazard conditions.
    ///
    /// Gas is evaluated before collision, so gas is the reported kind when
    /// both hold at once.
    pub fn check(
        &mut self,
        gas_level: Option<f32>,
        front_distance_cm: Option<f32>,
        now_ms: u64
    ) -> Verdict {
        if let HazardState::Latched(kind) = self.state {
            return Verdict::Latched { kind, event: None };
        }

        if let Some(gas) = gas_level {
            if gas >= self.params.gas_emergency_threshold {
                let desc = format!(
                    "Gas level {:.0} at or above emergency threshold {:.0}",
                    gas, self.params.gas_emergency_threshold
                );
                return self.latch_verdict(HazardKind::Gas, desc, now_ms);
            }
        }

        if let Some(front) = front_distance_cm {
            if front < self.params.critical_distance_cm {
                let desc = format!(
                    "Front obstacle at {:.1} cm, inside critical distance {:.1} cm",
                    front, self.params.critical_distance_cm
                );
                return self.latch_verdict(HazardKind::CollisionImminent, desc, now_ms);
            }
        }

        Verdict::Safe
    }

    fn latch_verdict(&mut self, kind: HazardKind, description: String, now_ms: u64) -> Verdict {
        let event = self.latch(kind, description, now_ms);
        Verdict::Latched { kind, event }
    }

    /// Latch a hazard raised outside the sensor checks, such as an operator
    /// stop.
    ///
    /// Returns the event if this call latched, or `None` if a hazard was
    /// already latched, in which case the first kind is kept.
    pub fn latch(
        &mut self,
        kind: HazardKind,
        description: String,
        now_ms: u64
    ) -> Option<HazardEvent> {
        if let HazardState::Latched(current) = self.state {
            warn!(
                "{:?} hazard ignored, {:?} hazard already latched",
                kind, current
            );
            return None;
        }

        let critical = match kind {
            HazardKind::OperatorStop | HazardKind::None => false,
            _ => true,
        };

        self.state = HazardState::Latched(kind);

        error!("Hazard latched: {:?} ({})", kind, description);

        Some(HazardEvent {
            kind,
            description,
            critical,
            timestamp_ms: now_ms,
        })
    }

    /// Clear the latch. Must only be called on an explicit operator request.
    pub fn clear(&mut self) {
        if let HazardState::Latched(kind) = self.state {
            info!("{:?} hazard cleared by operator", kind);
        }
        self.state = HazardState::Clear;
    }

    pub fn state(&self) -> HazardState {
        self.state
    }

    pub fn is_latched(&self) -> bool {
        matches!(self.state, HazardState::Latched(_))
    }

    /// Kind of the latched hazard, `HazardKind::None` when clear.
    pub fn kind(&self) -> HazardKind {
        match self.state {
            HazardState::Latched(k) => k,
            HazardState::Clear => HazardKind::None,
        }
    }
}

impl Default for HazardArbiter {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl State for HazardArbiter {
    type InitData = Params;
    type InitError = HazardMgrError;

    type InputData = InputData;
    type OutputData = Verdict;
    type StatusReport = HazardState;
    type ProcError = Infallible;

    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate().map_err(HazardMgrError::InvalidParams)?;
        *self = Self::new(init_data);
        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let verdict = self.check(
            input_data.gas_level,
            input_data.front_distance_cm,
            input_data.now_ms
        );

        Ok((verdict, self.state))
    }

    fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gas_latch() {
        let mut h = HazardArbiter::default();

        assert!(h.check(Some(100.0), Some(100.0), 0).is_safe());

        match h.check(Some(600.0), Some(100.0), 10) {
            Verdict::Latched { kind, event: Some(e) } => {
                assert_eq!(kind, HazardKind::Gas);
                assert_eq!(e.kind, HazardKind::Gas);
                assert!(e.critical);
                assert_eq!(e.timestamp_ms, 10);
            },
            v => panic!("Expected a new gas latch, got {:?}", v),
        }

        // Recovery of the sensor does not unlatch, and no further events
        assert_eq!(
            h.check(Some(0.0), Some(100.0), 20),
            Verdict::Latched { kind: HazardKind::Gas, event: None }
        );
        assert_eq!(
            h.check(None, None, 30),
            Verdict::Latched { kind: HazardKind::Gas, event: None }
        );

        h.clear();
        assert!(h.check(Some(0.0), Some(100.0), 40).is_safe());
        assert_eq!(h.kind(), HazardKind::None);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut h = HazardArbiter::default();
        assert!(h.check(Some(499.9), None, 0).is_safe());
        assert!(!h.check(Some(500.0), None, 0).is_safe());
    }

    #[test]
    fn test_collision() {
        let mut h = HazardArbiter::default();

        assert!(h.check(None, Some(10.0), 0).is_safe());
        assert!(h.check(None, None, 0).is_safe());

        let v = h.check(None, Some(9.5), 0);
        assert!(matches!(
            v,
            Verdict::Latched { kind: HazardKind::CollisionImminent, event: Some(_) }
        ));
        assert!(!h.check(None, Some(300.0), 0).is_safe());
    }

    #[test]
    fn test_gas_has_priority() {
        let mut h = HazardArbiter::default();
        h.check(Some(800.0), Some(5.0), 0);
        assert_eq!(h.state(), HazardState::Latched(HazardKind::Gas));
    }

    #[test]
    fn test_operator_stop() {
        let mut h = HazardArbiter::default();

        let e = h.latch(HazardKind::OperatorStop, "Operator stop".into(), 5).unwrap();
        assert!(!e.critical);
        assert!(!h.check(Some(0.0), Some(200.0), 10).is_safe());

        // First kind wins
        assert!(h.latch(HazardKind::Gas, "Gas".into(), 15).is_none());
        assert_eq!(h.kind(), HazardKind::OperatorStop);

        h.reset();
        assert!(!h.is_latched());
    }

    #[test]
    fn test_proc() {
        let mut h = HazardArbiter::default();
        h.init(Params::default()).unwrap();

        let (v, s) = h.proc(&InputData {
            now_ms: 0,
            gas_level: Some(700.0),
            front_distance_cm: None,
        }).unwrap();

        assert!(!v.is_safe());
        assert_eq!(s, HazardState::Latched(HazardKind::Gas));

        let bad = Params { critical_distance_cm: -1.0, ..Params::default() };
        assert!(h.init(bad).is_err());
    }
}

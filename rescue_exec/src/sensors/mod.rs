//! # Sensors module
//!
//! Filters the raw sensor frame supplied each cycle: front and rear ranging,
//! gas and, on the rear board, wheel odometry.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod distance;
pub mod gas;
pub mod odometry;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::convert::Infallible;

use comms_if::{eqpt::sens::SensorFrame, tm::BoardRole};
use log::{debug, trace};
use util::module::State;

pub use distance::{DistanceFilter, DistanceSample, RangingPhase};
pub use gas::GasFilter;
pub use odometry::{OdometryTracker, Wheel};
pub use params::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SensorsError {
    #[error("Invalid sensor parameters: {0}")]
    InvalidParams(String),
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// All sensor filters of one board.
#[derive(Debug, Clone, Default)]
pub struct Sensors {
    pub front: DistanceFilter,
    pub rear: DistanceFilter,
    pub gas: GasFilter,

    /// Only present on boards carrying wheel encoders.
    pub odometry: Option<OdometryTracker>,
}

/// Input to the sensors module.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Units: milliseconds
    pub now_ms: u64,

    /// Readings supplied this cycle, if any.
    pub frame: Option<SensorFrame>,
}

/// Filtered values used by the rest of the control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutputData {
    /// Units: centimeters
    pub front_distance_cm: Option<f32>,

    /// Unsmoothed front range received this cycle, `None` if there was no
    /// valid one.
    ///
    /// Units: centimeters
    pub front_raw_cm: Option<f32>,

    /// Units: centimeters
    pub rear_distance_cm: Option<f32>,

    pub gas_level: Option<f32>,
}

/// What happened to this cycle's readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub front_valid: bool,
    pub rear_valid: bool,
    pub gas_sampled: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Sensors {
    /// Current filtered values, without processing any new readings.
    pub fn output(&self) -> OutputData {
        OutputData {
            front_distance_cm: self.front.smoothed(),
            front_raw_cm: None,
            rear_distance_cm: self.rear.smoothed(),
            gas_level: self.gas.smoothed(),
        }
    }
}

impl State for Sensors {
    type InitData = (Params, BoardRole);
    type InitError = SensorsError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = Infallible;

    /// Build the filters for the given board. Only the rear board gets
    /// odometry.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let (params, role) = init_data;

        params.validate().map_err(SensorsError::InvalidParams)?;

        self.front = DistanceFilter::new(params.ranging.clone());
        self.rear = DistanceFilter::new(params.ranging.clone());
        self.gas = GasFilter::new(params.gas.clone());
        self.odometry = match role {
            BoardRole::Rear => Some(OdometryTracker::new(params.odometry.clone())),
            BoardRole::Front => None,
        };

        debug!(
            "Sensors initialised for the {:?} board (odometry: {})",
            role,
            self.odometry.is_some()
        );

        Ok(())
    }

    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let mut report = StatusReport::default();
        let now_ms = input_data.now_ms;
        let mut front_raw_cm = None;

        if let Some(frame) = input_data.frame {
            front_raw_cm = self.front
                .ingest_cm(frame.front_distance_cm, now_ms)
                .map(|s| s.value_cm);
            report.front_valid = front_raw_cm.is_some();
            report.rear_valid = self.rear
                .ingest_cm(frame.rear_distance_cm, now_ms)
                .is_some();
            report.gas_sampled = self.gas.update(now_ms, frame.gas_level);

            if let (Some(odom), Some(counts)) = (self.odometry.as_mut(), frame.wheel_counts) {
                odom.update(now_ms, counts);
            }
        }

        let output = OutputData {
            front_raw_cm,
            ..self.output()
        };

        trace!("Sensors output: {:?}", output);

        Ok((output, report))
    }

    fn reset(&mut self) {
        self.front.reset();
        self.rear.reset();
        self.gas.reset();
        if let Some(odom) = self.odometry.as_mut() {
            odom.reset();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn frame(front: f32, rear: f32, gas: i32) -> SensorFrame {
        SensorFrame {
            front_distance_cm: front,
            rear_distance_cm: rear,
            gas_level: gas,
            wheel_counts: Some([0, 0]),
        }
    }

    #[test]
    fn test_board_role_selects_odometry() {
        let mut s = Sensors::default();
        s.init((Params::default(), BoardRole::Front)).unwrap();
        assert!(s.odometry.is_none());

        s.init((Params::default(), BoardRole::Rear)).unwrap();
        assert!(s.odometry.is_some());
    }

    #[test]
    fn test_proc() {
        let mut s = Sensors::default();
        s.init((Params::default(), BoardRole::Rear)).unwrap();

        let (out, rpt) = s.proc(&InputData { now_ms: 0, frame: Some(frame(100.0, -1.0, 200)) })
            .unwrap();

        assert_eq!(out.front_distance_cm, Some(100.0));
        assert_eq!(out.front_raw_cm, Some(100.0));
        assert_eq!(out.rear_distance_cm, None);
        assert_eq!(out.gas_level, Some(200.0));
        assert!(rpt.front_valid);
        assert!(!rpt.rear_valid);
        assert!(rpt.gas_sampled);

        // No new frame, values are held
        let (out, rpt) = s.proc(&InputData { now_ms: 50, frame: None }).unwrap();
        assert_eq!(out.front_distance_cm, Some(100.0));
        assert_eq!(out.front_raw_cm, None);
        assert!(!rpt.front_valid);

        // Raw follows the reading while the smoothed value lags
        let (out, _) = s.proc(&InputData { now_ms: 100, frame: Some(frame(50.0, -1.0, 200)) })
            .unwrap();
        assert_eq!(out.front_raw_cm, Some(50.0));
        assert!((out.front_distance_cm.unwrap() - 85.0).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut p = Params::default();
        p.gas.window = 0;

        let mut s = Sensors::default();
        assert!(matches!(
            s.init((p, BoardRole::Front)),
            Err(SensorsError::InvalidParams(_))
        ));
    }
}

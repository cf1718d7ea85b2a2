//! # Sensor Equipment Data

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One set of raw readings supplied by the sensor front-ends.
///
/// Distances at or below zero mean the sensor had no valid reading this time around.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SensorFrame {
    /// Front ultrasonic range.
    ///
    /// Units: centimeters
    pub front_distance_cm: f32,

    /// Rear ultrasonic range.
    ///
    /// Units: centimeters
    pub rear_distance_cm: f32,

    /// Analog gas sensor reading, sensor specific range (0 to 4095 on a 12 bit ADC).
    pub gas_level: i32,

    /// Raw hardware pulse counter values for the rear left and rear right wheels, if the
    /// counters were read this cycle.
    #[serde(default)]
    pub wheel_counts: Option<[i16; 2]>,
}

impl Default for SensorFrame {
    fn default() -> Self {
        Self {
            front_distance_cm: -1.0,
            rear_distance_cm: -1.0,
            gas_level: 0,
            wheel_counts: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_frame_from_json_without_counts() {
        let frame: SensorFrame = serde_json::from_str(
            r#"{"front_distance_cm": 42.5, "rear_distance_cm": -1, "gas_level": 310}"#,
        )
        .unwrap();

        assert_eq!(frame.front_distance_cm, 42.5);
        assert_eq!(frame.rear_distance_cm, -1.0);
        assert_eq!(frame.gas_level, 310);
        assert_eq!(frame.wheel_counts, None);
    }
}

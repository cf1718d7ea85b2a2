//! Obstacle flag with hysteresis

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Flags an obstacle when the range drops below the trigger threshold, and
/// only unflags it once the range is back above the higher clearance
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleFlag {
    trigger_cm: f32,
    clear_cm: f32,
    detected: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ObstacleFlag {
    pub fn new(trigger_cm: f32, clear_cm: f32) -> Self {
        Self {
            trigger_cm,
            clear_cm,
            detected: false,
        }
    }

    /// Update with the latest range. With no valid range the flag keeps its
    /// value.
    pub fn update(&mut self, range_cm: Option<f32>) -> bool {
        if let Some(r) = range_cm {
            if self.detected {
                if r > self.clear_cm {
                    self.detected = false;
                }
            }
            else if r < self.trigger_cm {
                self.detected = true;
            }
        }

        self.detected
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    pub fn reset(&mut self) {
        self.detected = false;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hysteresis() {
        let mut f = ObstacleFlag::new(30.0, 40.0);

        assert!(!f.update(Some(35.0)));

        // Once below the trigger it stays flagged anywhere in the band
        for r in [25.0, 32.0, 38.0, 40.0].iter() {
            assert!(f.update(Some(*r)));
        }

        assert!(!f.update(Some(40.5)));

        // And back in the band from above does not flag
        assert!(!f.update(Some(35.0)));
    }

    #[test]
    fn test_invalid_range_holds() {
        let mut f = ObstacleFlag::new(30.0, 40.0);
        f.update(Some(20.0));
        assert!(f.update(None));

        f.reset();
        assert!(!f.is_detected());
        assert!(!f.update(None));
    }
}

//! # Gas filter
//!
//! Rate limited running average and trend classification of the analog gas
//! sensor.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tm::GasTrend;
use util::maths::MovingAverage;

use super::params::GasParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GasFilter {
    params: GasParams,

    last_sample_ms: Option<u64>,
    latest_raw: Option<i32>,
    average: MovingAverage<f32>,
    trend: GasTrend,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GasFilter {
    pub fn new(params: GasParams) -> Self {
        let average = MovingAverage::new(params.window);

        Self {
            params,
            last_sample_ms: None,
            latest_raw: None,
            average,
            trend: GasTrend::Stable,
        }
    }

    /// Offer a new raw reading. It is only taken if the sample interval has
    /// elapsed since the last one taken.
    ///
    /// Returns `true` if the reading was taken.
    pub fn update(&mut self, now_ms: u64, raw: i32) -> bool {
        if let Some(t) = self.last_sample_ms {
            if now_ms.saturating_sub(t) < self.params.sample_interval_ms {
                return false;
            }
        }
        self.last_sample_ms = Some(now_ms);

        // Trend is judged against the average before this sample joins it
        let raw_f = raw as f32;
        self.trend = match self.average.mean() {
            Some(avg) if raw_f > avg + self.params.trend_band => GasTrend::Rising,
            Some(avg) if raw_f < avg - self.params.trend_band => GasTrend::Falling,
            _ => GasTrend::Stable,
        };

        self.latest_raw = Some(raw);
        self.average.push(raw_f);

        true
    }

    /// Running average of the taken samples, `None` before the first one.
    pub fn smoothed(&self) -> Option<f32> {
        self.average.mean()
    }

    pub fn latest_raw(&self) -> Option<i32> {
        self.latest_raw
    }

    pub fn trend(&self) -> GasTrend {
        self.trend
    }

    /// True if the smoothed level is at or above `threshold`.
    ///
    /// This only reports, latching an emergency is up to the hazard arbiter.
    pub fn is_detected(&self, threshold: f32) -> bool {
        match self.smoothed() {
            Some(level) => level >= threshold,
            None => false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.params.clone());
    }
}

impl Default for GasFilter {
    fn default() -> Self {
        Self::new(GasParams::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rate_limit() {
        let mut g = GasFilter::default();

        assert!(g.update(0, 100));
        assert!(!g.update(499, 900));
        assert!(g.update(500, 200));

        assert_eq!(g.smoothed(), Some(150.0));
        assert_eq!(g.latest_raw(), Some(200));
    }

    #[test]
    fn test_window_and_trend() {
        let mut g = GasFilter::default();

        for (i, raw) in [100, 100, 100, 100, 100].iter().enumerate() {
            g.update(i as u64 * 500, *raw);
        }
        assert_eq!(g.smoothed(), Some(100.0));
        assert_eq!(g.trend(), GasTrend::Stable);

        // Inside the deadband
        g.update(2500, 115);
        assert_eq!(g.trend(), GasTrend::Stable);

        g.update(3000, 200);
        assert_eq!(g.trend(), GasTrend::Rising);

        // Average is now (100 + 100 + 100 + 115 + 200) / 5 = 123
        assert!((g.smoothed().unwrap() - 123.0).abs() < 1e-3);

        g.update(3500, 50);
        assert_eq!(g.trend(), GasTrend::Falling);
    }

    #[test]
    fn test_is_detected_is_pure() {
        let mut g = GasFilter::default();
        assert!(!g.is_detected(500.0));

        g.update(0, 500);
        assert!(g.is_detected(500.0));
        assert!(!g.is_detected(501.0));

        // Asking twice changes nothing
        assert!(g.is_detected(500.0));
        assert_eq!(g.smoothed(), Some(500.0));
    }
}

//! # Odometry tracker
//!
//! Decodes the rear wheel quadrature pulse counters into distance and RPM.
//!
//! The hardware counters are 16 bit and wrap, so only the difference between
//! two consecutive reads is trusted. Differences are accumulated into a 32 bit
//! total per wheel.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tm::WheelOdometry;
use util::maths::MovingAverage;

use super::params::OdometryParams;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of wheels carrying encoders.
pub const NUM_ODOM_WHEELS: usize = 2;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Wheels carrying encoders, used to index the counter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    RearLeft = 0,
    RearRight = 1,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct WheelState {
    /// Last raw counter value read
    last_count: Option<i16>,

    /// Reassembled total count
    total_counts: i32,

    /// Counts accumulated since the last RPM calculation
    pending_counts: i32,

    /// Time of the last RPM calculation, which is the last update of the wheel
    last_update_ms: Option<u64>,

    rpm: MovingAverage<f32>,
}

/// Odometry for the encoder equipped wheels.
#[derive(Debug, Clone)]
pub struct OdometryTracker {
    params: OdometryParams,
    wheels: [WheelState; NUM_ODOM_WHEELS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelState {
    fn new(rpm_window: usize) -> Self {
        Self {
            last_count: None,
            total_counts: 0,
            pending_counts: 0,
            last_update_ms: None,
            rpm: MovingAverage::new(rpm_window),
        }
    }
}

impl OdometryTracker {
    pub fn new(params: OdometryParams) -> Self {
        let wheels = [
            WheelState::new(params.rpm_window),
            WheelState::new(params.rpm_window),
        ];

        Self { params, wheels }
    }

    /// Process a new read of the raw counters, indexed by [`Wheel`].
    pub fn update(&mut self, now_ms: u64, counts: [i16; NUM_ODOM_WHEELS]) {
        for (i, count) in counts.iter().enumerate() {
            self.update_wheel(i, now_ms, *count);
        }
    }

    fn update_wheel(&mut self, idx: usize, now_ms: u64, count: i16) {
        let params = &self.params;
        let w = &mut self.wheels[idx];

        // The first read only establishes the counter origin
        let last = match w.last_count {
            Some(c) => c,
            None => {
                w.last_count = Some(count);
                w.last_update_ms = Some(now_ms);
                return;
            }
        };

        // Wrapping subtraction gives the right signed delta across a counter
        // wrap as long as fewer than 32768 counts passed between reads
        let delta = count.wrapping_sub(last) as i32;
        w.last_count = Some(count);
        w.total_counts = w.total_counts.wrapping_add(delta);
        w.pending_counts += delta;

        let dt_ms = match w.last_update_ms {
            Some(t) => now_ms.saturating_sub(t),
            None => 0,
        };

        if dt_ms > params.min_rpm_interval_ms {
            let dt_s = dt_ms as f32 / 1000.0;
            let rpm = (w.pending_counts as f32 / params.counts_per_rev)
                * (60.0 / dt_s)
                * params.gear_ratio;

            w.rpm.push(rpm);
            w.pending_counts = 0;
            w.last_update_ms = Some(now_ms);
        }
    }

    /// True if the wheel has not been updated for longer than the stale
    /// timeout, or has never been updated.
    pub fn is_stale(&self, wheel: Wheel, now_ms: u64) -> bool {
        match self.wheels[wheel as usize].last_update_ms {
            Some(t) => now_ms.saturating_sub(t) > self.params.stale_timeout_ms,
            None => true,
        }
    }

    /// Smoothed RPM of the wheel, or `None` if the wheel is stale or no speed
    /// has been computed yet.
    pub fn rpm(&self, wheel: Wheel, now_ms: u64) -> Option<f32> {
        if self.is_stale(wheel, now_ms) {
            None
        }
        else {
            self.last_rpm(wheel)
        }
    }

    /// Last smoothed RPM regardless of staleness.
    pub fn last_rpm(&self, wheel: Wheel) -> Option<f32> {
        self.wheels[wheel as usize].rpm.mean()
    }

    pub fn total_counts(&self, wheel: Wheel) -> i32 {
        self.wheels[wheel as usize].total_counts
    }

    /// Distance travelled by the wheel since start or the last reset.
    ///
    /// Units: centimeters
    pub fn distance_cm(&self, wheel: Wheel) -> f32 {
        let revs = self.total_counts(wheel) as f32
            / self.params.counts_per_rev
            * self.params.gear_ratio;

        revs * std::f32::consts::PI * self.params.wheel_diameter_cm
    }

    /// Telemetry view of the wheel.
    pub fn wheel_tm(&self, wheel: Wheel, now_ms: u64) -> WheelOdometry {
        WheelOdometry {
            rpm: self.rpm(wheel, now_ms),
            distance_cm: self.distance_cm(wheel),
            total_counts: self.total_counts(wheel),
        }
    }

    /// Zero the totals and speed history. The next counter read becomes the
    /// new origin.
    pub fn reset(&mut self) {
        *self = Self::new(self.params.clone());
    }
}

impl Default for OdometryTracker {
    fn default() -> Self {
        Self::new(OdometryParams::default())
    }
}

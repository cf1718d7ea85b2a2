//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed length circular buffer which reports the mean of the samples pushed
/// into it.
///
/// Until the buffer has been filled once the mean is taken over the filled
/// slots only, so the first few averages are not dragged towards zero.
#[derive(Debug, Clone)]
pub struct MovingAverage<T> {
    buffer: Vec<T>,
    next: usize,
    filled: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> MovingAverage<T>
where
    T: Float
{
    /// Create a new average over `window` samples. A window of zero is
    /// treated as a window of one.
    pub fn new(window: usize) -> Self {
        Self {
            buffer: vec![T::zero(); window.max(1)],
            next: 0,
            filled: 0,
        }
    }

    /// Push a new sample, overwriting the oldest one, and return the new mean.
    pub fn push(&mut self, sample: T) -> T {
        self.buffer[self.next] = sample;
        self.next = (self.next + 1) % self.buffer.len();
        if self.filled < self.buffer.len() {
            self.filled += 1;
        }

        self.mean().unwrap_or(sample)
    }

    /// Mean of the filled slots, or `None` if nothing has been pushed.
    pub fn mean(&self) -> Option<T> {
        if self.filled == 0 {
            return None;
        }

        // While filling, slots 0..filled are the ones written
        let sum = self.buffer[..self.filled]
            .iter()
            .fold(T::zero(), |acc, &x| acc + x);

        T::from(self.filled).map(|n| sum / n)
    }

    /// Number of samples currently contributing to the mean.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn clear(&mut self) {
        for s in self.buffer.iter_mut() {
            *s = T::zero();
        }
        self.next = 0;
        self.filled = 0;
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a value between a minimum and a maximum.
///
/// Unlike `f64::clamp` this does not panic when `min > max`, the minimum
/// wins in that case. A NaN value is returned unchanged.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: PartialOrd + Copy
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// One step of an exponential moving average.
///
/// Returns `alpha * sample + (1 - alpha) * old`.
pub fn ema_step<T>(alpha: T, sample: T, old: T) -> T
where
    T: Float
{
    alpha * sample + (T::one() - alpha) * old
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&5.0, &0.0, &1.0), 1.0);
        assert_eq!(clamp(&-5.0, &0.0, &1.0), 0.0);
        assert_eq!(clamp(&0.5, &0.0, &1.0), 0.5);
        assert_eq!(clamp(&300, &-255, &255), 255);
        assert!(clamp(&std::f64::NAN, &0.0, &1.0).is_nan());
    }

    #[test]
    fn test_moving_average_fills_then_wraps() {
        let mut avg = MovingAverage::<f64>::new(3);
        assert_eq!(avg.mean(), None);

        assert_eq!(avg.push(3.0), 3.0);
        assert_eq!(avg.push(6.0), 4.5);
        assert_eq!(avg.push(9.0), 6.0);

        // Oldest (3.0) is overwritten
        assert_eq!(avg.push(12.0), 9.0);
        assert_eq!(avg.len(), 3);

        avg.clear();
        assert!(avg.is_empty());
        assert_eq!(avg.push(1.0), 1.0);
    }

    #[test]
    fn test_ema_step() {
        assert!((ema_step(0.3f32, 100.0, 50.0) - 65.0).abs() < 1e-4);
        assert_eq!(ema_step(1.0f64, 7.0, 3.0), 7.0);
    }
}

/// Causal exponential smoothing for accelerometer magnitudes.
/// O(1) per sample, no lookback buffer; state persists until `reset`.
#[derive(Clone, Debug)]
pub struct ExponentialSmoother {
    alpha: f64,
    state: Option<f64>,
}

impl ExponentialSmoother {
    /// Create a new smoother with factor α (typically 0.1)
    pub fn new(alpha: f64) -> Self {
        ExponentialSmoother { alpha, state: None }
    }

    /// Feed one magnitude and return the smoothed value.
    /// First call seeds the state with the raw value.
    pub fn apply(&mut self, magnitude: f64) -> f64 {
        // α·m + (1−α)·s written as s + α·(m − s): a constant input stays exactly constant
        let next = match self.state {
            None => magnitude,
            Some(prev) => prev + self.alpha * (magnitude - prev),
        };
        self.state = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_value_seeds_state() {
        let mut smoother = ExponentialSmoother::new(0.1);
        assert_eq!(smoother.apply(9.0), 9.0);
        assert_relative_eq!(smoother.apply(19.0), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_recurrence() {
        let mut smoother = ExponentialSmoother::new(0.1);
        smoother.apply(10.0);
        let s1 = smoother.apply(20.0);
        // 0.1 * 20 + 0.9 * 10 = 11
        assert_relative_eq!(s1, 11.0, epsilon = 1e-12);
        let s2 = smoother.apply(0.0);
        // 0.1 * 0 + 0.9 * 11 = 9.9
        assert_relative_eq!(s2, 9.9, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_input_is_exact() {
        let mut smoother = ExponentialSmoother::new(0.1);
        for _ in 0..100 {
            assert_eq!(smoother.apply(9.8), 9.8);
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let mut smoother = ExponentialSmoother::new(0.5);
        smoother.apply(4.0);
        smoother.apply(8.0);
        smoother.reset();
        assert_eq!(smoother.apply(2.0), 2.0);
    }
}

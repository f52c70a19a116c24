use std::collections::VecDeque;

use crate::types::Moments;

/// Weight on the window standard deviation above the mean
const STD_WEIGHT: f64 = 0.5;
/// Upper bound on up-front allocation; larger windows grow on demand
const PREALLOC_LIMIT: usize = 64;

/// Adaptive detection threshold over a bounded window of smoothed magnitudes.
///
/// The window holds at most `2 * window_size` values. Until `window_size`
/// values are present the fixed fallback is returned.
#[derive(Clone, Debug)]
pub struct RollingThreshold {
    window: VecDeque<f64>,
    window_size: usize,
    fallback: f64,
}

impl RollingThreshold {
    pub fn new(window_size: usize, fallback: f64) -> Self {
        RollingThreshold {
            window: VecDeque::with_capacity(window_size.saturating_mul(2).min(PREALLOC_LIMIT)),
            window_size,
            fallback,
        }
    }

    pub fn push(&mut self, magnitude: f64) {
        self.window.push_back(magnitude);
        while self.window.len() > self.capacity() {
            self.window.pop_front();
        }
    }

    /// `mean + 0.5 * std` over the whole window, recomputed on every call
    pub fn threshold(&self) -> f64 {
        if self.window.len() < self.window_size {
            return self.fallback;
        }
        match Moments::of(&self.window) {
            Some(m) => m.mean + STD_WEIGHT * m.std_dev,
            None => self.fallback,
        }
    }

    pub fn capacity(&self) -> usize {
        self.window_size.saturating_mul(2)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

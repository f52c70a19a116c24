//! Descriptive statistics shared by the threshold estimator, the anomaly
//! strategies and the offline summary.
//!
//! Dispersion is always the population form (divide by `n`), which is what
//! the detection constants were tuned against.

/// Count, mean, population std and extremes of a set of values
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Moments {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Moments {
    /// Returns `None` for an empty input
    pub fn of<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a f64>,
        I::IntoIter: Clone,
    {
        let iter = values.into_iter();

        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in iter.clone() {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return None;
        }

        let mean = sum / count as f64;
        let variance = iter.map(|&v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(Moments {
            count,
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Upper median (`sorted[n / 2]`)
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}

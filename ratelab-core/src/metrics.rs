//! Numerically stable error aggregation.

use crate::domain::Outcome;
use crate::rating::OutcomeProbabilities;

/// Compensated (Neumaier) running sum with a term count.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NeumaierSum {
    sum: f64,
    compensation: f64,
    count: usize,
}

impl NeumaierSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
        self.count += 1;
    }

    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean of the added values, `None` when nothing was added.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total() / self.count as f64)
        }
    }
}

impl Extend<f64> for NeumaierSum {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl FromIterator<f64> for NeumaierSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut sum = Self::new();
        sum.extend(iter);
        sum
    }
}

/// Multi-class Brier score of a predicted triple against the real outcome.
/// Ranges over [0, 2].
pub fn brier(probabilities: &OutcomeProbabilities, outcome: Outcome) -> f64 {
    let [h, d, a] = outcome.indicator();
    (probabilities.home - h).powi(2)
        + (probabilities.draw - d).powi(2)
        + (probabilities.away - a).powi(2)
}

/// Root mean squared difference between paired values.
pub fn rmse(pairs: impl IntoIterator<Item = (f64, f64)>) -> Option<f64> {
    let sum: NeumaierSum = pairs.into_iter().map(|(a, b)| (a - b).powi(2)).collect();
    sum.mean().map(f64::sqrt)
}

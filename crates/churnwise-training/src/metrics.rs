use crate::error::{TrainingError, TrainingResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scoring rule used by model search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    Accuracy,
    F1,
}

impl Scoring {
    pub fn score(self, y_true: &[f64], y_pred: &[f64]) -> TrainingResult<f64> {
        let m = BinaryMetrics::compute(y_true, y_pred, 1.0)?;
        Ok(match self {
            Self::Accuracy => m.accuracy(),
            Self::F1 => m.f1(),
        })
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accuracy => "accuracy",
            Self::F1 => "f1",
        })
    }
}

/// Confusion counts relative to a positive label. Ratios with a zero
/// denominator are reported as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryMetrics {
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl BinaryMetrics {
    pub fn compute(y_true: &[f64], y_pred: &[f64], pos_label: f64) -> TrainingResult<Self> {
        if y_true.len() != y_pred.len() {
            return Err(TrainingError::Model(format!(
                "{} true labels but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        let mut m = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == pos_label, p == pos_label) {
                (true, true) => m.true_positive += 1,
                (false, true) => m.false_positive += 1,
                (true, false) => m.false_negative += 1,
                (false, false) => m.true_negative += 1,
            }
        }
        Ok(m)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    #[must_use]
    pub fn f1(&self) -> f64 {
        ratio(2 * self.true_positive, 2 * self.true_positive + self.false_positive + self.false_negative)
    }
}

/// F1 for the positive class `1`.
pub fn f1_score(y_true: &[f64], y_pred: &[f64]) -> TrainingResult<f64> {
    Ok(BinaryMetrics::compute(y_true, y_pred, 1.0)?.f1())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_against_hand_counts() {
        let y_true = [1.0, 1.0, 0.0, 0.0, 1.0];
        let y_pred = [1.0, 0.0, 1.0, 0.0, 1.0];
        let m = BinaryMetrics::compute(&y_true, &y_pred, 1.0).unwrap();
        assert_eq!((m.true_positive, m.false_positive, m.false_negative, m.true_negative), (2, 1, 1, 1));
        assert!((m.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1() - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.accuracy() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let m = BinaryMetrics::compute(&[0.0, 0.0], &[0.0, 0.0], 1.0).unwrap();
        assert_eq!(m.precision(), 0.0);
        assert_eq!(m.recall(), 0.0);
        assert_eq!(m.f1(), 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(f1_score(&[1.0], &[]).is_err());
    }
}

//! Per-column distribution drift between a reference and a current frame.

use crate::error::TrainingResult;
use crate::frame::{Cell, DataFrame};
use crate::persist;
use crate::stats::{self, TestResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Numeric columns with at most this many distinct values are tested as
/// categories.
const MAX_CATEGORICAL_UNIQUE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatTest {
    Ks,
    ChiSquare,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDrift {
    pub column: String,
    pub stattest: StatTest,
    pub statistic: f64,
    pub p_value: f64,
    pub threshold: f64,
    pub drift_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub dataset_drift: bool,
    pub drift_share: f64,
    pub number_of_columns: usize,
    pub number_of_drifted_columns: usize,
    pub share_of_drifted_columns: f64,
    pub features: Vec<FeatureDrift>,
}

impl DriftReport {
    pub fn write_yaml(&self, path: &Path) -> TrainingResult<()> {
        persist::write_yaml(path, self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DriftDetector {
    /// A feature drifts when its p-value is below this.
    pub p_threshold: f64,
    /// The dataset drifts when at least this share of features drift.
    pub drift_share: f64,
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self { p_threshold: 0.05, drift_share: 0.5 }
    }
}

fn numeric_values(cells: &[&Cell]) -> Option<Vec<f64>> {
    cells.iter().filter(|c| !c.is_null()).map(|c| c.as_f64()).collect()
}

fn categorical_values(cells: &[&Cell]) -> Vec<String> {
    cells.iter().filter_map(|c| c.category_key()).collect()
}

fn distinct(values: &[f64]) -> usize {
    values.iter().map(|v| v.to_bits()).collect::<BTreeSet<_>>().len()
}

/// Reference decides the column kind; current is read the same way.
fn test_column(reference: &[&Cell], current: &[&Cell]) -> (StatTest, TestResult) {
    if let (Some(r), Some(c)) = (numeric_values(reference), numeric_values(current)) {
        if distinct(&r) > MAX_CATEGORICAL_UNIQUE {
            return (StatTest::Ks, stats::ks_two_sample(&r, &c));
        }
    }
    let r = categorical_values(reference);
    let c = categorical_values(current);
    (StatTest::ChiSquare, stats::chi_square(&r, &c))
}

impl DriftDetector {
    /// Compare every column present in both frames, in reference order.
    pub fn detect(&self, reference: &DataFrame, current: &DataFrame) -> TrainingResult<DriftReport> {
        let mut features = Vec::new();
        for name in reference.columns() {
            if !current.has_column(name) {
                continue;
            }
            let (stattest, TestResult { statistic, p_value }) =
                test_column(&reference.column(name)?, &current.column(name)?);
            let drift_detected = p_value < self.p_threshold;
            tracing::debug!(column = %name, ?stattest, p_value, drift_detected, "drift test");
            features.push(FeatureDrift {
                column: name.clone(),
                stattest,
                statistic,
                p_value,
                threshold: self.p_threshold,
                drift_detected,
            });
        }

        let number_of_columns = features.len();
        let number_of_drifted_columns = features.iter().filter(|f| f.drift_detected).count();
        let share_of_drifted_columns = if number_of_columns == 0 {
            0.0
        } else {
            number_of_drifted_columns as f64 / number_of_columns as f64
        };
        Ok(DriftReport {
            dataset_drift: number_of_columns > 0 && share_of_drifted_columns >= self.drift_share,
            drift_share: self.drift_share,
            number_of_columns,
            number_of_drifted_columns,
            share_of_drifted_columns,
            features,
        })
    }
}

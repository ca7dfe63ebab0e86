//! Class rebalancing: SMOTE oversampling followed by edited-nearest-neighbours
//! cleaning.

use crate::error::{TrainingError, TrainingResult};
use crate::matrix::{Matrix, nearest_neighbors};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which splits get rebalanced after transformation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceScope {
    #[default]
    TrainOnly,
    TrainAndTest,
}

impl BalanceScope {
    #[must_use]
    pub fn balances_test(self) -> bool {
        matches!(self, Self::TrainAndTest)
    }
}

#[derive(Debug, Clone)]
pub struct Smoteenn {
    pub smote_k: usize,
    pub enn_k: usize,
    pub seed: u64,
}

impl Default for Smoteenn {
    fn default() -> Self {
        Self { smote_k: 5, enn_k: 3, seed: 42 }
    }
}

fn class_key(label: f64) -> i64 {
    label.round() as i64
}

fn class_counts(y: &[f64]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in y {
        *counts.entry(class_key(label)).or_insert(0) += 1;
    }
    counts
}

impl Smoteenn {
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { seed, ..Self::default() }
    }

    pub fn fit_resample(&self, x: &Matrix, y: &[f64]) -> TrainingResult<(Matrix, Vec<f64>)> {
        if x.n_rows() != y.len() {
            return Err(TrainingError::Dataset(format!("{} rows but {} labels", x.n_rows(), y.len())));
        }
        let before = class_counts(y);
        if before.len() < 2 {
            return Err(TrainingError::Dataset(
                "rebalancing needs at least two classes".to_string(),
            ));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let (x_over, y_over) = self.smote(x, y, &before, &mut rng)?;
        let (x_clean, y_clean) = self.enn(&x_over, &y_over);

        let after = class_counts(&y_clean);
        if after.len() < 2 {
            return Err(TrainingError::Dataset(
                "nearest-neighbour cleaning removed every sample of a class".to_string(),
            ));
        }
        tracing::info!(?before, ?after, "rebalanced classes with SMOTEENN");
        Ok((x_clean, y_clean))
    }

    fn smote(
        &self,
        x: &Matrix,
        y: &[f64],
        counts: &BTreeMap<i64, usize>,
        rng: &mut StdRng,
    ) -> TrainingResult<(Matrix, Vec<f64>)> {
        let majority = counts.values().copied().max().unwrap_or(0);
        let mut out_x = x.clone();
        let mut out_y = y.to_vec();

        for (&class, &count) in counts {
            let needed = majority - count;
            if needed == 0 {
                continue;
            }
            if count < 2 {
                return Err(TrainingError::Dataset(format!(
                    "class {class} has {count} sample(s); SMOTE needs at least 2"
                )));
            }
            let members: Vec<usize> = (0..y.len()).filter(|&i| class_key(y[i]) == class).collect();
            let class_x = x.take_rows(&members);
            let k = self.smote_k.min(count - 1);

            let mut synthetic = vec![0.0; x.n_cols()];
            for _ in 0..needed {
                let base = rng.random_range(0..count);
                let neighbors = nearest_neighbors(&class_x, class_x.row(base), k, Some(base));
                let (pick, _) = neighbors[rng.random_range(0..neighbors.len())];
                let gap: f64 = rng.random();
                for (j, slot) in synthetic.iter_mut().enumerate() {
                    let a = class_x.get(base, j);
                    *slot = a + gap * (class_x.get(pick, j) - a);
                }
                out_x.push_row(&synthetic)?;
                out_y.push(class as f64);
            }
        }
        Ok((out_x, out_y))
    }

    /// Drop every sample whose `enn_k` nearest neighbours do not all share its class.
    fn enn(&self, x: &Matrix, y: &[f64]) -> (Matrix, Vec<f64>) {
        let keep: Vec<usize> = (0..x.n_rows())
            .filter(|&i| {
                nearest_neighbors(x, x.row(i), self.enn_k, Some(i))
                    .iter()
                    .all(|&(j, _)| class_key(y[j]) == class_key(y[i]))
            })
            .collect();
        let labels = keep.iter().map(|&i| y[i]).collect();
        (x.take_rows(&keep), labels)
    }
}

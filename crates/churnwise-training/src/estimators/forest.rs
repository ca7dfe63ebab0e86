use super::tree::{DecisionTreeParams, MaxFeatures, Node, grow, leaf_distribution};
use super::{ParamReader, argmax, class_indices, distinct_classes};
use crate::error::{TrainingError, TrainingResult};
use crate::matrix::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub bootstrap: bool,
    pub tree: DecisionTreeParams,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            bootstrap: true,
            tree: DecisionTreeParams {
                max_features: MaxFeatures::Sqrt,
                random_state: 42,
                ..DecisionTreeParams::default()
            },
        }
    }
}

impl RandomForestParams {
    pub(crate) fn read(reader: &mut ParamReader<'_>) -> TrainingResult<Self> {
        let d = Self::default();
        let n_estimators = reader.usize_or("n_estimators", d.n_estimators)?;
        if n_estimators == 0 {
            return Err(TrainingError::InvalidSpec(
                "RandomForestClassifier: n_estimators must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            n_estimators,
            bootstrap: reader.bool_or("bootstrap", d.bootstrap)?,
            tree: DecisionTreeParams::read_with_default(reader, d.tree)?,
        })
    }

    pub(crate) fn fit(&self, x: &Matrix, y: &[f64]) -> TrainingResult<ForestModel> {
        let classes = distinct_classes(y);
        let labels = class_indices(&classes, y);
        let n = x.n_rows();
        let mut rng = StdRng::seed_from_u64(self.tree.random_state);

        let trees = (0..self.n_estimators)
            .map(|_| {
                let rows: Vec<usize> = if self.bootstrap {
                    (0..n).map(|_| rng.random_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                let mut tree_rng = StdRng::seed_from_u64(rng.random());
                grow(&self.tree, x, &labels, classes.len(), rows, &mut tree_rng)
            })
            .collect();
        tracing::debug!(n_estimators = self.n_estimators, "fitted random forest");
        Ok(ForestModel { classes, n_features: x.n_cols(), trees })
    }
}

/// Averages leaf class distributions across trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub classes: Vec<f64>,
    n_features: usize,
    trees: Vec<Vec<Node>>,
}

impl ForestModel {
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn predict(&self, x: &Matrix) -> Vec<f64> {
        x.iter_rows()
            .map(|row| {
                let mut mean = vec![0.0; self.classes.len()];
                for tree in &self.trees {
                    for (m, p) in mean.iter_mut().zip(leaf_distribution(tree, row)) {
                        *m += p;
                    }
                }
                self.classes[argmax(&mean)]
            })
            .collect()
    }
}

use super::{ParamReader, argmax, class_indices, distinct_classes};
use crate::error::{TrainingError, TrainingResult};
use crate::matrix::{Matrix, nearest_neighbors};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnnWeights {
    Uniform,
    Distance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnnParams {
    pub n_neighbors: usize,
    pub weights: KnnWeights,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self { n_neighbors: 5, weights: KnnWeights::Uniform }
    }
}

impl KnnParams {
    pub(crate) fn read(reader: &mut ParamReader<'_>) -> TrainingResult<Self> {
        let d = Self::default();
        let n_neighbors = reader.usize_or("n_neighbors", d.n_neighbors)?;
        let weights = match reader.text_or("weights", "uniform")? {
            "uniform" => KnnWeights::Uniform,
            "distance" => KnnWeights::Distance,
            other => {
                return Err(TrainingError::InvalidSpec(format!(
                    "KNeighborsClassifier: unknown weights {other:?}"
                )));
            }
        };
        if let Some(algorithm) = reader.value("algorithm") {
            tracing::debug!(%algorithm, "KNeighborsClassifier ignores algorithm; neighbours are searched exhaustively");
        }
        if n_neighbors == 0 {
            return Err(TrainingError::InvalidSpec(
                "KNeighborsClassifier: n_neighbors must be at least 1".to_string(),
            ));
        }
        Ok(Self { n_neighbors, weights })
    }

    pub(crate) fn fit(&self, x: &Matrix, y: &[f64]) -> TrainingResult<KnnModel> {
        let classes = distinct_classes(y);
        Ok(KnnModel {
            n_neighbors: self.n_neighbors,
            weights: self.weights,
            labels: class_indices(&classes, y),
            classes,
            train: x.clone(),
        })
    }
}

/// Stores the training set; prediction is a weighted neighbour vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnModel {
    pub n_neighbors: usize,
    pub weights: KnnWeights,
    pub classes: Vec<f64>,
    labels: Vec<usize>,
    train: Matrix,
}

impl KnnModel {
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.train.n_cols()
    }

    #[must_use]
    pub fn predict(&self, x: &Matrix) -> Vec<f64> {
        x.iter_rows().map(|row| self.classes[self.vote(row)]).collect()
    }

    fn vote(&self, row: &[f64]) -> usize {
        let neighbors = nearest_neighbors(&self.train, row, self.n_neighbors, None);
        let mut votes = vec![0.0; self.classes.len()];
        if self.weights == KnnWeights::Distance && neighbors.iter().any(|(_, d)| *d == 0.0) {
            // exact matches take the whole vote
            for (i, d) in &neighbors {
                if *d == 0.0 {
                    votes[self.labels[*i]] += 1.0;
                }
            }
            return argmax(&votes);
        }
        for (i, d) in &neighbors {
            let weight = match self.weights {
                KnnWeights::Uniform => 1.0,
                KnnWeights::Distance => 1.0 / d.sqrt(),
            };
            votes[self.labels[*i]] += weight;
        }
        argmax(&votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_weights_favour_close_points() {
        let x = Matrix::from_rows(vec![vec![0.0], vec![10.0], vec![11.0]]).unwrap();
        let y = [1.0, 0.0, 0.0];
        let probe = Matrix::from_rows(vec![vec![1.0]]).unwrap();

        let uniform = KnnParams { n_neighbors: 3, weights: KnnWeights::Uniform }.fit(&x, &y).unwrap();
        assert_eq!(uniform.predict(&probe), vec![0.0]);

        let distance = KnnParams { n_neighbors: 3, weights: KnnWeights::Distance }.fit(&x, &y).unwrap();
        assert_eq!(distance.predict(&probe), vec![1.0]);
    }

    #[test]
    fn test_algorithm_does_not_change_the_spec() {
        use crate::estimators::{EstimatorKind, EstimatorSpec, ParamValue, Params};

        let plain = Params::from([("n_neighbors".to_string(), ParamValue::Int(3))]);
        let mut with_algorithm = plain.clone();
        with_algorithm.insert("algorithm".to_string(), ParamValue::Text("kd_tree".to_string()));

        let kind = EstimatorKind::KNeighborsClassifier;
        assert_eq!(
            EstimatorSpec::from_params(kind, &with_algorithm).unwrap(),
            EstimatorSpec::from_params(kind, &plain).unwrap()
        );
    }

    #[test]
    fn test_ties_resolve_to_lowest_class() {
        let x = Matrix::from_rows(vec![vec![-1.0], vec![1.0]]).unwrap();
        let model = KnnParams { n_neighbors: 2, weights: KnnWeights::Uniform }.fit(&x, &[1.0, 0.0]).unwrap();
        let probe = Matrix::from_rows(vec![vec![0.0]]).unwrap();
        assert_eq!(model.predict(&probe), vec![0.0]);
    }
}

use super::ParamReader;
use crate::error::{TrainingError, TrainingResult};
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};

/// Binary logistic regression trained with full-batch gradient descent and an
/// L2 penalty of strength `1 / C`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticParams {
    pub c: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub fit_intercept: bool,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self { c: 1.0, learning_rate: 0.1, max_iter: 500, tol: 1e-6, fit_intercept: true }
    }
}

impl LogisticParams {
    pub(crate) fn read(reader: &mut ParamReader<'_>) -> TrainingResult<Self> {
        let d = Self::default();
        let params = Self {
            c: reader.f64_or("C", d.c)?,
            learning_rate: reader.f64_or("learning_rate", d.learning_rate)?,
            max_iter: reader.usize_or("max_iter", d.max_iter)?,
            tol: reader.f64_or("tol", d.tol)?,
            fit_intercept: reader.bool_or("fit_intercept", d.fit_intercept)?,
        };
        if params.c <= 0.0 || params.learning_rate <= 0.0 {
            return Err(TrainingError::InvalidSpec(
                "LogisticRegression: C and learning_rate must be positive".to_string(),
            ));
        }
        Ok(params)
    }

    pub(crate) fn fit(&self, x: &Matrix, y: &[f64]) -> TrainingResult<LogisticModel> {
        if y.iter().any(|&label| label != 0.0 && label != 1.0) {
            return Err(TrainingError::Model(
                "LogisticRegression expects labels 0 and 1".to_string(),
            ));
        }
        let n = x.n_rows() as f64;
        let d = x.n_cols();
        let mut weights = vec![0.0; d];
        let mut intercept = 0.0;
        let penalty = 1.0 / (self.c * n);

        let mut grad = vec![0.0; d];
        for iteration in 0..self.max_iter {
            grad.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;
            for (row, &label) in x.iter_rows().zip(y) {
                let err = sigmoid(dot(&weights, row) + intercept) - label;
                for (g, v) in grad.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_b += err;
            }

            let mut step = 0.0_f64;
            for (w, g) in weights.iter_mut().zip(&grad) {
                let update = self.learning_rate * (g / n + penalty * *w);
                *w -= update;
                step = step.max(update.abs());
            }
            if self.fit_intercept {
                let update = self.learning_rate * grad_b / n;
                intercept -= update;
                step = step.max(update.abs());
            }
            if step < self.tol {
                tracing::trace!(iteration, "logistic regression converged");
                break;
            }
        }
        Ok(LogisticModel { weights, intercept })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Probability of class 1 for each row.
    #[must_use]
    pub fn predict_proba(&self, x: &Matrix) -> Vec<f64> {
        x.iter_rows().map(|row| sigmoid(dot(&self.weights, row) + self.intercept)).collect()
    }

    #[must_use]
    pub fn predict(&self, x: &Matrix) -> Vec<f64> {
        self.predict_proba(x).into_iter().map(|p| if p >= 0.5 { 1.0 } else { 0.0 }).collect()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::tests::{blobs, probes};

    #[test]
    fn test_probabilities_follow_blobs() {
        let (x, y) = blobs();
        let model = LogisticParams::default().fit(&x, &y).unwrap();
        let p = model.predict_proba(&probes());
        assert!(p[0] < 0.5 && p[1] > 0.5);
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let (x, mut y) = blobs();
        y[0] = 2.0;
        assert!(LogisticParams::default().fit(&x, &y).is_err());
    }

    #[test]
    fn test_sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
    }
}

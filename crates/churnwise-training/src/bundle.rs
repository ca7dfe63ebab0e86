use crate::error::TrainingResult;
use crate::estimators::FittedEstimator;
use crate::frame::DataFrame;
use crate::persist;
use crate::preprocess::FittedColumnTransformer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deployable model: the fitted column transformer plus the classifier
/// trained on its output. Raw frames always pass through the transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnModel {
    transformer: FittedColumnTransformer,
    estimator: FittedEstimator,
    description: String,
    trained_at: DateTime<Utc>,
}

impl ChurnModel {
    #[must_use]
    pub fn new(transformer: FittedColumnTransformer, estimator: FittedEstimator, description: String) -> Self {
        Self { transformer, estimator, description, trained_at: Utc::now() }
    }

    /// Transform raw feature columns, then classify.
    pub fn predict(&self, frame: &DataFrame) -> TrainingResult<Vec<f64>> {
        let features = self.transformer.transform(frame)?;
        self.estimator.predict(&features)
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn to_bytes(&self) -> TrainingResult<Vec<u8>> {
        persist::encode(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> TrainingResult<Self> {
        persist::decode(bytes)
    }

    pub fn save(&self, path: &Path) -> TrainingResult<()> {
        persist::save_object(path, self)
    }

    pub fn load(path: &Path) -> TrainingResult<Self> {
        persist::load_object(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimators::{EstimatorKind, EstimatorSpec, Params};
    use crate::frame::Cell;
    use crate::preprocess::ColumnTransformer;
    use std::collections::BTreeMap;

    fn raw() -> DataFrame {
        let mut frame = DataFrame::new(vec!["Contract".into(), "tenure".into()]);
        for i in 0..10_i32 {
            let contract = if i < 5 { "Month-to-month" } else { "Two year" };
            frame.push_row(vec![contract.into(), Cell::Number(f64::from(i))]).unwrap();
        }
        frame
    }

    #[test]
    fn test_bundle_bytes_predict_identically() {
        let frame = raw();
        let labels: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 0.0 }).collect();
        let transformer = ColumnTransformer {
            nominal: vec![],
            ordinal: vec!["Contract".into()],
            numeric: vec!["tenure".into()],
            ordinal_categories: BTreeMap::new(),
        }
        .fit(&frame)
        .unwrap();
        let x = transformer.transform(&frame).unwrap();
        let estimator = EstimatorSpec::from_params(EstimatorKind::DecisionTreeClassifier, &Params::new())
            .unwrap()
            .fit(&x, &labels)
            .unwrap();
        let model = ChurnModel::new(transformer, estimator, "tree".to_string());

        let restored = ChurnModel::from_bytes(&model.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, model);
        assert_eq!(restored.predict(&frame).unwrap(), model.predict(&frame).unwrap());
        assert_eq!(model.predict(&frame).unwrap(), labels);
    }
}

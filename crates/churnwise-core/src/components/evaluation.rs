use crate::artifact::{DataIngestionArtifact, ModelEvaluationArtifact, ModelTrainerArtifact};
use crate::error::Result;
use crate::estimator::ProductionModel;
use churnwise_training::{DataFrame, TargetValueMapping, f1_score};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Outcome of comparing the new model with the production one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluateModelResponse {
    pub trained_model_f1_score: f64,
    pub best_model_f1_score: Option<f64>,
    pub is_model_accepted: bool,
    pub difference: f64,
}

/// Accept only a strict improvement over the production score, which counts
/// as zero when no production model exists.
pub fn decide_acceptance(trained_f1: f64, production_f1: Option<f64>) -> EvaluateModelResponse {
    let baseline = production_f1.unwrap_or(0.0);
    EvaluateModelResponse {
        trained_model_f1_score: trained_f1,
        best_model_f1_score: production_f1,
        is_model_accepted: trained_f1 > baseline,
        difference: trained_f1 - baseline,
    }
}

pub struct ModelEvaluation {
    ingestion: DataIngestionArtifact,
    trainer: ModelTrainerArtifact,
    production: Arc<ProductionModel>,
    target_column: String,
}

impl ModelEvaluation {
    pub fn new(
        ingestion: DataIngestionArtifact,
        trainer: ModelTrainerArtifact,
        production: Arc<ProductionModel>,
        target_column: impl Into<String>,
    ) -> Self {
        Self { ingestion, trainer, production, target_column: target_column.into() }
    }

    /// The production model, if the registry key exists.
    pub async fn get_best_model(&self) -> Result<Option<&ProductionModel>> {
        if self.production.is_model_present().await? {
            Ok(Some(self.production.as_ref()))
        } else {
            Ok(None)
        }
    }

    pub async fn evaluate_model(&self) -> Result<EvaluateModelResponse> {
        let test = DataFrame::read_csv(&self.ingestion.test_file_path)?;
        let (features, target) = test.split_target(&self.target_column)?;
        let y = TargetValueMapping.encode_all(&target)?;

        let trained_f1 = self.trainer.metric_artifact.f1_score;
        let production_f1 = match self.get_best_model().await? {
            Some(production) => {
                let model = production.load_model().await?;
                let y_hat = model.predict(&features)?;
                Some(f1_score(&y, &y_hat)?)
            }
            None => None,
        };

        let response = decide_acceptance(trained_f1, production_f1);
        info!(?response, "evaluated trained model against production");
        Ok(response)
    }

    pub async fn initiate_model_evaluation(&self) -> Result<ModelEvaluationArtifact> {
        let response = self.evaluate_model().await?;
        Ok(ModelEvaluationArtifact {
            is_model_accepted: response.is_model_accepted,
            changed_accuracy: response.difference,
            s3_model_path: self.production.model_path().to_string(),
            trained_model_path: self.trainer.trained_model_file_path.clone(),
            trained_model_f1_score: response.trained_model_f1_score,
            best_model_f1_score: response.best_model_f1_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_production_model_accepts_any_positive_score() {
        let response = decide_acceptance(0.42, None);
        assert!(response.is_model_accepted);
        assert!((response.difference - 0.42).abs() < 1e-12);
        assert!(!decide_acceptance(0.0, None).is_model_accepted);
    }

    #[test]
    fn test_acceptance_is_strict() {
        assert!(decide_acceptance(0.81, Some(0.80)).is_model_accepted);
        assert!(!decide_acceptance(0.80, Some(0.80)).is_model_accepted);
        let worse = decide_acceptance(0.70, Some(0.80));
        assert!(!worse.is_model_accepted);
        assert!(worse.difference < 0.0);
    }
}

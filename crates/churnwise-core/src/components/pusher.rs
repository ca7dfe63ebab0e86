use crate::artifact::{ModelEvaluationArtifact, ModelPusherArtifact};
use crate::error::{PipelineError, Result};
use crate::estimator::ProductionModel;
use std::sync::Arc;
use tracing::info;

/// Publishes an accepted bundle to the registry key.
pub struct ModelPusher {
    evaluation: ModelEvaluationArtifact,
    production: Arc<ProductionModel>,
}

impl ModelPusher {
    pub fn new(evaluation: ModelEvaluationArtifact, production: Arc<ProductionModel>) -> Self {
        Self { evaluation, production }
    }

    pub async fn initiate_model_pusher(&self) -> Result<ModelPusherArtifact> {
        if !self.evaluation.is_model_accepted {
            return Err(PipelineError::Validation(
                "refusing to publish a model that was not accepted".to_string(),
            ));
        }

        self.production.save_model(&self.evaluation.trained_model_path).await?;
        info!(
            bucket = self.production.bucket(),
            key = self.production.model_path(),
            "published model bundle"
        );
        Ok(ModelPusherArtifact {
            bucket_name: self.production.bucket().to_string(),
            s3_model_path: self.production.model_path().to_string(),
        })
    }
}

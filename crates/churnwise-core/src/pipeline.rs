//! The training pipeline driver.
//!
//! Runs every stage in order inside one task, stops at the first failure and
//! writes a manifest of the produced files at the end of every run.

use crate::artifact::{ModelEvaluationArtifact, ModelPusherArtifact};
use crate::components::{
    DataIngestion, DataTransformation, DataValidation, ModelEvaluation, ModelPusher, ModelTrainer,
};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, StageContext};
use crate::estimator::ProductionModel;
use crate::storage::{DocumentStore, ObjectStore};
use chrono::Utc;
use churnwise_training::{
    ArtifactFile, ArtifactKind, ArtifactLayout, ProgressEvent, ProgressSink, RunManifest, RunOutcome, SchemaDescriptor,
    Stage, TracingProgressSink, make_artifact,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Published(ModelPusherArtifact),
    NotAccepted(ModelEvaluationArtifact),
}

pub struct TrainPipeline {
    config: PipelineConfig,
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    progress: Arc<dyn ProgressSink>,
}

impl TrainPipeline {
    pub fn new(config: PipelineConfig, documents: Arc<dyn DocumentStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { config, documents, objects, progress: Arc::new(TracingProgressSink) }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage into a fresh timestamped directory.
    pub async fn run_pipeline(&self) -> Result<PipelineOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let layout = ArtifactLayout::for_run(&self.config.artifact_dir, started_at, &run_id)
            .with_feature_store_file_name(self.config.ingestion.feature_store_file.clone());
        layout.ensure_run_dir()?;
        info!(%run_id, run_dir = %layout.run_dir().display(), "starting training pipeline");

        let result = self.run_stages(&run_id, &layout).await;

        let (outcome, message) = match &result {
            Ok(PipelineOutcome::Published(_)) => (RunOutcome::Published, None),
            Ok(PipelineOutcome::NotAccepted(evaluation)) => (
                RunOutcome::NotAccepted,
                Some(format!(
                    "trained model f1 {:.4} did not improve on the production model",
                    evaluation.trained_model_f1_score
                )),
            ),
            Err(err) => (RunOutcome::Failed, Some(err.chain())),
        };
        let manifest = RunManifest {
            run_id: run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            outcome,
            message,
            artifacts: collect_artifacts(&layout),
        };
        if let Err(err) = manifest.write(&layout.manifest_file()) {
            warn!(%run_id, error = %err, "failed to write run manifest");
        }

        match &result {
            Ok(_) => info!(%run_id, ?outcome, "training pipeline finished"),
            Err(err) => warn!(%run_id, error = %err.chain(), "training pipeline failed"),
        }
        result
    }

    async fn run_stages(&self, run_id: &str, layout: &ArtifactLayout) -> Result<PipelineOutcome> {
        let config = &self.config;

        self.started(run_id, Stage::Ingestion);
        let ingestion = DataIngestion::new(
            Arc::clone(&self.documents),
            config.source.collection.clone(),
            config.ingestion.clone(),
            layout.clone(),
        )
        .initiate_data_ingestion()
        .await
        .in_stage(Stage::Ingestion)?;
        self.finished(run_id, Stage::Ingestion);

        self.started(run_id, Stage::Validation);
        let validation = DataValidation::new(ingestion.clone(), &config.schema_file, layout.clone())
            .and_then(|stage| stage.initiate_data_validation())
            .in_stage(Stage::Validation)?;
        if !validation.validation_status {
            return Err(PipelineError::Validation(validation.message)).in_stage(Stage::Validation);
        }
        self.message(run_id, &validation.message);
        self.finished(run_id, Stage::Validation);

        self.started(run_id, Stage::Transformation);
        let transformation = DataTransformation::new(
            ingestion.clone(),
            validation,
            &config.schema_file,
            config.transformation.clone(),
            layout.clone(),
        )
        .and_then(|stage| stage.initiate_data_transformation())
        .in_stage(Stage::Transformation)?;
        self.finished(run_id, Stage::Transformation);

        self.started(run_id, Stage::Training);
        let trainer = ModelTrainer::new(
            transformation,
            &config.model_config_file,
            config.trainer.clone(),
            layout.clone(),
        )
        .and_then(|stage| stage.initiate_model_trainer())
        .in_stage(Stage::Training)?;
        self.finished(run_id, Stage::Training);

        self.started(run_id, Stage::Evaluation);
        let production = Arc::new(ProductionModel::new(
            Arc::clone(&self.objects),
            config.registry.bucket.clone(),
            config.registry.model_key.clone(),
        ));
        let target_column = SchemaDescriptor::load(&config.schema_file)
            .in_stage(Stage::Evaluation)?
            .target_column;
        let evaluation = ModelEvaluation::new(ingestion, trainer, Arc::clone(&production), target_column)
            .initiate_model_evaluation()
            .await
            .in_stage(Stage::Evaluation)?;
        self.finished(run_id, Stage::Evaluation);

        if !evaluation.is_model_accepted {
            info!(
                trained_f1 = evaluation.trained_model_f1_score,
                production_f1 = ?evaluation.best_model_f1_score,
                "trained model is not better than the production model"
            );
            self.progress.on_event(ProgressEvent::Skipped {
                run_id: run_id.to_string(),
                stage: Stage::Publishing,
                reason: "trained model not accepted".to_string(),
            });
            return Ok(PipelineOutcome::NotAccepted(evaluation));
        }

        self.started(run_id, Stage::Publishing);
        let pushed = ModelPusher::new(evaluation, production)
            .initiate_model_pusher()
            .await
            .in_stage(Stage::Publishing)?;
        self.finished(run_id, Stage::Publishing);
        Ok(PipelineOutcome::Published(pushed))
    }

    fn started(&self, run_id: &str, stage: Stage) {
        self.progress.on_event(ProgressEvent::Started { run_id: run_id.to_string(), stage });
    }

    fn finished(&self, run_id: &str, stage: Stage) {
        self.progress.on_event(ProgressEvent::Finished { run_id: run_id.to_string(), stage });
    }

    fn message(&self, run_id: &str, message: &str) {
        self.progress.on_event(ProgressEvent::Message { run_id: run_id.to_string(), message: message.to_string() });
    }
}

/// Every stage output that exists on disk, with its digest.
fn collect_artifacts(layout: &ArtifactLayout) -> Vec<ArtifactFile> {
    [
        (ArtifactKind::FeatureStore, layout.feature_store_file()),
        (ArtifactKind::TrainSplit, layout.train_file()),
        (ArtifactKind::TestSplit, layout.test_file()),
        (ArtifactKind::DriftReport, layout.drift_report_file()),
        (ArtifactKind::Transformer, layout.transformer_file()),
        (ArtifactKind::TransformedTrain, layout.transformed_train_file()),
        (ArtifactKind::TransformedTest, layout.transformed_test_file()),
        (ArtifactKind::ModelBundle, layout.trained_model_file()),
    ]
    .into_iter()
    .filter(|(_, path)| path.exists())
    .filter_map(|(kind, path)| make_artifact(kind, path).ok())
    .collect()
}

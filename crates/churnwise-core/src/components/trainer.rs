use crate::artifact::{ClassificationMetricArtifact, DataTransformationArtifact, ModelTrainerArtifact};
use crate::config::TrainerConfig;
use crate::error::{PipelineError, Result};
use churnwise_training::persist;
use churnwise_training::{
    ArtifactLayout, BestModelDetail, BinaryMetrics, ChurnModel, FittedColumnTransformer, Matrix, ModelFactory,
};
use std::path::Path;
use tracing::info;

/// Searches the candidate models and packages the winner with the transformer.
pub struct ModelTrainer {
    transformation: DataTransformationArtifact,
    factory: ModelFactory,
    config: TrainerConfig,
    layout: ArtifactLayout,
}

impl ModelTrainer {
    pub fn new(
        transformation: DataTransformationArtifact,
        model_config_file: &Path,
        config: TrainerConfig,
        layout: ArtifactLayout,
    ) -> Result<Self> {
        let factory = ModelFactory::from_file(model_config_file)?;
        Ok(Self::with_factory(transformation, factory, config, layout))
    }

    pub fn with_factory(
        transformation: DataTransformationArtifact,
        factory: ModelFactory,
        config: TrainerConfig,
        layout: ArtifactLayout,
    ) -> Self {
        Self { transformation, factory, config, layout }
    }

    /// Best model from the search plus its metrics on the held-out split.
    pub fn get_model_object_and_report(
        &self,
        train: &Matrix,
        test: &Matrix,
    ) -> Result<(BestModelDetail, ClassificationMetricArtifact)> {
        let (x_train, y_train) = train.split_label_column()?;
        let (x_test, y_test) = test.split_label_column()?;

        let best = self.factory.get_best_model(&x_train, &y_train, self.config.expected_score)?;
        let y_pred = best.best_model.predict(&x_test)?;
        let metrics = BinaryMetrics::compute(&y_test, &y_pred, 1.0)?;
        let metric_artifact = ClassificationMetricArtifact {
            f1_score: metrics.f1(),
            precision_score: metrics.precision(),
            recall_score: metrics.recall(),
        };
        info!(
            model = %best.describe(),
            cv_score = best.best_score,
            f1 = metric_artifact.f1_score,
            precision = metric_artifact.precision_score,
            recall = metric_artifact.recall_score,
            "selected best model"
        );
        Ok((best, metric_artifact))
    }

    pub fn initiate_model_trainer(&self) -> Result<ModelTrainerArtifact> {
        let train: Matrix = persist::load_object(&self.transformation.transformed_train_file_path)?;
        let test: Matrix = persist::load_object(&self.transformation.transformed_test_file_path)?;
        let (best, metric_artifact) = self.get_model_object_and_report(&train, &test)?;

        if best.best_score < self.config.expected_score {
            return Err(PipelineError::Threshold {
                score: best.best_score,
                expected: self.config.expected_score,
            });
        }

        let transformer: FittedColumnTransformer =
            persist::load_object(&self.transformation.transformed_object_file_path)?;
        let best_estimator = best.describe();
        let bundle = ChurnModel::new(transformer, best.best_model, best_estimator.clone());
        let path = self.layout.trained_model_file();
        bundle.save(&path)?;
        info!(path = %path.display(), "saved model bundle");

        Ok(ModelTrainerArtifact {
            trained_model_file_path: path,
            metric_artifact,
            best_score: best.best_score,
            best_estimator,
        })
    }
}

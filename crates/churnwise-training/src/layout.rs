use crate::error::TrainingResult;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Filesystem layout for one pipeline run.
///
/// Every run writes under `<artifact_root>/<MM_DD_YYYY_HH_MM_SS>_<run_id>/`,
/// one subdirectory per stage.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    run_dir: PathBuf,
    feature_store_file_name: String,
}

pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

impl ArtifactLayout {
    #[must_use]
    pub fn new(run_dir: PathBuf) -> Self {
        Self { run_dir, feature_store_file_name: "customers.csv".to_string() }
    }

    /// Layout for the run `run_id` started at `started_at`.
    #[must_use]
    pub fn for_run(artifact_root: &Path, started_at: DateTime<Utc>, run_id: &str) -> Self {
        let name = format!("{}_{run_id}", started_at.format(TIMESTAMP_FORMAT));
        Self::new(artifact_root.join(name))
    }

    #[must_use]
    pub fn with_feature_store_file_name(mut self, name: impl Into<String>) -> Self {
        self.feature_store_file_name = name.into();
        self
    }

    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn ingestion_dir(&self) -> PathBuf {
        self.run_dir.join("data_ingestion")
    }

    #[must_use]
    pub fn feature_store_file(&self) -> PathBuf {
        self.ingestion_dir().join("feature_store").join(&self.feature_store_file_name)
    }

    #[must_use]
    pub fn train_file(&self) -> PathBuf {
        self.ingestion_dir().join("ingested").join("train.csv")
    }

    #[must_use]
    pub fn test_file(&self) -> PathBuf {
        self.ingestion_dir().join("ingested").join("test.csv")
    }

    #[must_use]
    pub fn drift_report_file(&self) -> PathBuf {
        self.run_dir.join("data_validation").join("drift_report").join("report.yaml")
    }

    fn transformation_dir(&self) -> PathBuf {
        self.run_dir.join("data_transformation")
    }

    #[must_use]
    pub fn transformer_file(&self) -> PathBuf {
        self.transformation_dir().join("transformed_object").join("preprocessing.bin")
    }

    #[must_use]
    pub fn transformed_train_file(&self) -> PathBuf {
        self.transformation_dir().join("transformed").join("train.bin")
    }

    #[must_use]
    pub fn transformed_test_file(&self) -> PathBuf {
        self.transformation_dir().join("transformed").join("test.bin")
    }

    #[must_use]
    pub fn trained_model_file(&self) -> PathBuf {
        self.run_dir.join("model_trainer").join("trained_model").join("model.bin")
    }

    #[must_use]
    pub fn manifest_file(&self) -> PathBuf {
        self.run_dir.join("run_manifest.json")
    }

    /// Create the run directory. Fails if it already exists.
    pub fn ensure_run_dir(&self) -> TrainingResult<()> {
        if let Some(parent) = self.run_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir(&self.run_dir)?;
        Ok(())
    }
}

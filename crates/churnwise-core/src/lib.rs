//! Churnwise Core - the churn pipeline and its HTTP front end.
//!
//! This crate provides:
//! - The staged training pipeline (ingestion to publishing)
//! - Document and object store backends
//! - Online prediction against the registry model
//! - An axum server for the form and the training trigger
//! - Configuration management and error handling
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use churnwise_core::{config::PipelineConfig, server};
//!
//! #[tokio::main]
//! async fn main() -> churnwise_core::error::Result<()> {
//!     let config = PipelineConfig::load(Path::new("churnwise.toml"))?;
//!     server::run(config).await
//! }
//! ```

pub mod artifact;
pub mod components;
pub mod config;
pub mod error;
pub mod estimator;
pub mod pipeline;
pub mod prediction;
pub mod server;
pub mod storage;

pub use artifact::{
    ClassificationMetricArtifact, DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact,
};
pub use config::{ConfigError, PipelineConfig};
pub use error::{PipelineError, Result, StageContext};
pub use estimator::ProductionModel;
pub use pipeline::{PipelineOutcome, TrainPipeline};
pub use prediction::{ChurnClassifier, CustomerData};
pub use storage::{DocumentStore, ObjectStore};

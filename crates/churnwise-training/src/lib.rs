//! Churnwise Training
//!
//! Tabular learning primitives for the churn pipeline:
//! - Loosely typed frames and dense matrices
//! - Column encoders, class rebalancing and classifiers
//! - Grid-searched model selection and metrics
//! - Drift statistics, artifact layout and run manifests

pub mod artifacts;
pub mod balance;
pub mod bundle;
pub mod drift;
pub mod error;
pub mod estimators;
pub mod factory;
pub mod frame;
pub mod layout;
pub mod matrix;
pub mod metrics;
pub mod persist;
pub mod preprocess;
pub mod progress;
pub mod schema;
pub mod stats;
pub mod target;

pub use artifacts::{ArtifactFile, ArtifactKind, RunManifest, RunOutcome, make_artifact, sha256_file};
pub use balance::{BalanceScope, Smoteenn};
pub use bundle::ChurnModel;
pub use drift::{DriftDetector, DriftReport, FeatureDrift, StatTest};
pub use error::{TrainingError, TrainingResult};
pub use estimators::{EstimatorKind, EstimatorSpec, FittedEstimator, ParamValue, Params};
pub use factory::{BestModelDetail, GridSearchedModel, ModelFactory, ModelSearchConfig};
pub use frame::{Cell, DataFrame, Record};
pub use layout::ArtifactLayout;
pub use matrix::Matrix;
pub use metrics::{BinaryMetrics, Scoring, f1_score};
pub use preprocess::{ColumnTransformer, FittedColumnTransformer};
pub use progress::{ProgressEvent, ProgressSink, RecordingProgressSink, Stage, TracingProgressSink};
pub use schema::SchemaDescriptor;
pub use target::TargetValueMapping;

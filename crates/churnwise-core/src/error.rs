//! Error types for the churn pipeline.

use churnwise_training::{Stage, TrainingError};
use std::panic::Location;
use thiserror::Error;

/// Errors raised while running the pipeline or serving predictions.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required file, object or collection does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The ingested splits do not match the declared schema.
    #[error("data validation failed: {0}")]
    Validation(String),

    /// The source collection returned no records.
    #[error("no records found in collection {0}")]
    EmptyDataset(String),

    /// The best candidate did not reach the configured minimum score.
    #[error("no model reached the expected score: best {score:.4}, expected {expected:.4}")]
    Threshold { score: f64, expected: f64 },

    /// Document store failure.
    #[error("document store error: {0}")]
    DocumentStore(String),

    /// Object store failure.
    #[error("object store error: {0}")]
    ObjectStore(String),

    /// Failure inside the learning primitives.
    #[error(transparent)]
    Training(#[from] TrainingError),

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wraps another error with the stage that failed and where it was wrapped.
    #[error("{stage} stage failed at {location}")]
    Stage {
        stage: Stage,
        location: &'static Location<'static>,
        #[source]
        source: Box<PipelineError>,
    },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// The error beneath any stage wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// The outermost failing stage, if the error was wrapped.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Every message in the source chain joined with `": "`.
    #[must_use]
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut current: Option<&dyn std::error::Error> = std::error::Error::source(self);
        while let Some(err) = current {
            // skip sources a wrapper already formats inline
            let text = err.to_string();
            if !message.ends_with(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            current = err.source();
        }
        message
    }
}

/// Attach stage and caller location to a failing result.
pub trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> Result<T>;
}

impl<T, E> StageContext<T> for std::result::Result<T, E>
where
    E: Into<PipelineError>,
{
    #[track_caller]
    fn in_stage(self, stage: Stage) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(PipelineError::Stage {
                stage,
                location: Location::caller(),
                source: Box::new(err.into()),
            }),
        }
    }
}

use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid model spec: {0}")]
    InvalidSpec(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("artifact error: {0}")]
    Artifact(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("failed to encode binary artifact: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode binary artifact: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

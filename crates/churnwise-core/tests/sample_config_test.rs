//! The configuration files shipped at the repository root stay loadable.

use churnwise_core::config::PipelineConfig;
use churnwise_training::{ModelSearchConfig, SchemaDescriptor};
use std::path::PathBuf;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

#[test]
fn test_sample_pipeline_config_matches_defaults() {
    let config = PipelineConfig::load_from_file(&repo_root().join("churnwise.toml")).unwrap();
    assert_eq!(config, PipelineConfig::default());
}

#[test]
fn test_sample_schema_covers_form_fields() {
    let schema = SchemaDescriptor::load(&repo_root().join("config/schema.yaml")).unwrap();
    assert_eq!(schema.columns.len(), 21);
    assert_eq!(schema.target_column, "Churn");

    let features: Vec<&String> = schema
        .numeric_features
        .iter()
        .chain(&schema.nominal_features)
        .chain(&schema.ordinal_features)
        .collect();
    for column in churnwise_core::CustomerData::COLUMNS {
        assert!(features.iter().any(|f| f.as_str() == column), "{column} is not a feature");
    }
}

#[test]
fn test_sample_model_config_parses() {
    let models = ModelSearchConfig::load(&repo_root().join("config/model.yaml")).unwrap();
    assert_eq!(models.model_selection.len(), 4);
}

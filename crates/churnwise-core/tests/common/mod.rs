//! Shared fixtures for churnwise-core integration tests.

#![allow(dead_code)]

use churnwise_core::config::PipelineConfig;
use churnwise_core::storage::InMemoryDocumentStore;
use churnwise_training::{Cell, Record};
use std::path::Path;
use std::sync::Arc;

pub const BUCKET: &str = "test-models";
pub const MODEL_KEY: &str = "model-registry/model.bin";

pub const SCHEMA: &str = r"
columns:
  - customerID: object
  - tenure: int
  - Contract: category
  - InternetService: category
  - MonthlyCharges: float
  - Churn: category
numerical_columns: [tenure, MonthlyCharges]
categorical_columns: [Contract, InternetService, Churn]
drop_columns: [customerID]
numeric_features: [tenure, MonthlyCharges]
nominal_features: [InternetService]
ordinal_features: [Contract]
ordinal_categories:
  Contract: [Month-to-month, One year, Two year]
target_column: Churn
";

pub const MODELS: &str = r"
grid_search:
  cv: 3
  scoring: accuracy
model_selection:
  module_0:
    class: DecisionTreeClassifier
    params:
      criterion: gini
    search_param_grid:
      max_depth: [2, 4]
  module_1:
    class: LogisticRegression
    search_param_grid:
      C: [1.0]
";

/// A customer record. Month-to-month customers churn, everyone else stays.
pub fn customer(i: usize) -> Record {
    let contract = ["Month-to-month", "One year", "Two year"][i % 3];
    let churn = if i % 3 == 0 { "Yes" } else { "No" };
    vec![
        ("_id".to_string(), Cell::Text(format!("65f0{i:08}"))),
        ("customerID".to_string(), Cell::Text(format!("C-{i:04}"))),
        ("tenure".to_string(), Cell::Number(((i * 7) % 72) as f64)),
        ("Contract".to_string(), Cell::from(contract)),
        (
            "InternetService".to_string(),
            Cell::from(if i % 2 == 0 { "DSL" } else { "Fiber optic" }),
        ),
        ("MonthlyCharges".to_string(), Cell::Number(20.0 + ((i * 13) % 80) as f64)),
        ("Churn".to_string(), Cell::from(churn)),
    ]
}

pub async fn seeded_documents(rows: usize) -> Arc<InMemoryDocumentStore> {
    let store = Arc::new(InMemoryDocumentStore::new());
    let config = PipelineConfig::default();
    store.insert_many(&config.source.collection, (0..rows).map(customer).collect()).await;
    store
}

/// Config pointing every path into `root`, with schema and model files written there.
pub fn config_in(root: &Path) -> PipelineConfig {
    let schema_file = root.join("schema.yaml");
    let model_config_file = root.join("model.yaml");
    std::fs::write(&schema_file, SCHEMA).unwrap();
    std::fs::write(&model_config_file, MODELS).unwrap();

    let mut config = PipelineConfig::default();
    config.artifact_dir = root.join("artifact");
    config.schema_file = schema_file;
    config.model_config_file = model_config_file;
    config.registry.bucket = BUCKET.to_string();
    config.registry.model_key = MODEL_KEY.to_string();
    config
}

/// Every file under `dir` whose name is `name`.
pub fn find_files(dir: &Path, name: &str) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else { return found };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(find_files(&path, name));
        } else if path.file_name().is_some_and(|n| n == name) {
            found.push(path);
        }
    }
    found
}

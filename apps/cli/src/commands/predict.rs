//! Predict command implementation.

use anyhow::Context;
use churnwise_core::config::PipelineConfig;
use churnwise_core::storage::object_store_from_config;
use churnwise_core::{ChurnClassifier, CustomerData};
use std::collections::HashMap;
use std::path::Path;

/// Execute the predict command against the registry model and print the label.
pub async fn execute(config: PipelineConfig, input: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let fields = parse_fields(&raw)?;
    let customer = CustomerData::from_fields(&fields)?;

    let objects = object_store_from_config(&config).await?;
    let label = ChurnClassifier::from_config(&config, objects).predict_label(&customer).await?;
    println!("{label}");
    Ok(())
}

/// Flatten a JSON object into form-style string fields.
fn parse_fields(raw: &str) -> anyhow::Result<HashMap<String, String>> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(raw).context("customer input must be a JSON object")?;
    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_and_strings_become_fields() {
        let fields = parse_fields(r#"{"tenure": 12, "Contract": "One year", "SeniorCitizen": 0}"#).unwrap();
        assert_eq!(fields["tenure"], "12");
        assert_eq!(fields["Contract"], "One year");
        assert_eq!(fields["SeniorCitizen"], "0");
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(parse_fields("[1, 2]").is_err());
    }
}

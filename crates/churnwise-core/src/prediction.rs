//! Online inference on a single customer.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::estimator::ProductionModel;
use crate::storage::ObjectStore;
use churnwise_training::{Cell, DataFrame, TargetValueMapping};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// The fields collected by the web form, named as in the training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerData {
    pub senior_citizen: String,
    pub dependents: String,
    #[serde(rename = "tenure")]
    pub tenure: f64,
    pub multiple_lines: String,
    pub internet_service: String,
    pub online_security: String,
    pub tech_support: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    pub streaming_movies: String,
    pub contract: String,
    pub paperless_billing: String,
    pub payment_method: String,
    pub monthly_charges: f64,
    pub total_charges: f64,
}

impl CustomerData {
    pub const COLUMNS: [&'static str; 14] = [
        "SeniorCitizen",
        "Dependents",
        "tenure",
        "MultipleLines",
        "InternetService",
        "OnlineSecurity",
        "TechSupport",
        "StreamingTV",
        "StreamingMovies",
        "Contract",
        "PaperlessBilling",
        "PaymentMethod",
        "MonthlyCharges",
        "TotalCharges",
    ];

    /// Build from raw form fields. Every field is required and the three
    /// numeric fields must parse.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let text = |name: &str| -> Result<String> {
            fields
                .get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| PipelineError::Validation(format!("missing field {name}")))
        };
        let number = |name: &str| -> Result<f64> {
            let raw = text(name)?;
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PipelineError::Validation(format!("field {name} must be numeric, got {raw:?}")))
        };

        Ok(Self {
            senior_citizen: text("SeniorCitizen")?,
            dependents: text("Dependents")?,
            tenure: number("tenure")?,
            multiple_lines: text("MultipleLines")?,
            internet_service: text("InternetService")?,
            online_security: text("OnlineSecurity")?,
            tech_support: text("TechSupport")?,
            streaming_tv: text("StreamingTV")?,
            streaming_movies: text("StreamingMovies")?,
            contract: text("Contract")?,
            paperless_billing: text("PaperlessBilling")?,
            payment_method: text("PaymentMethod")?,
            monthly_charges: number("MonthlyCharges")?,
            total_charges: number("TotalCharges")?,
        })
    }

    /// One-row frame in `COLUMNS` order. Text fields are parsed like CSV cells.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let row = vec![
            Cell::parse(&self.senior_citizen),
            Cell::parse(&self.dependents),
            Cell::Number(self.tenure),
            Cell::parse(&self.multiple_lines),
            Cell::parse(&self.internet_service),
            Cell::parse(&self.online_security),
            Cell::parse(&self.tech_support),
            Cell::parse(&self.streaming_tv),
            Cell::parse(&self.streaming_movies),
            Cell::parse(&self.contract),
            Cell::parse(&self.paperless_billing),
            Cell::parse(&self.payment_method),
            Cell::Number(self.monthly_charges),
            Cell::Number(self.total_charges),
        ];
        let columns = Self::COLUMNS.iter().map(ToString::to_string).collect();
        Ok(DataFrame::from_rows(columns, vec![row])?)
    }
}

/// Predicts churn with the production model from the registry.
pub struct ChurnClassifier {
    model: ProductionModel,
}

impl ChurnClassifier {
    pub fn new(model: ProductionModel) -> Self {
        Self { model }
    }

    pub fn from_config(config: &PipelineConfig, objects: Arc<dyn ObjectStore>) -> Self {
        Self::new(ProductionModel::new(
            objects,
            config.registry.bucket.clone(),
            config.registry.model_key.clone(),
        ))
    }

    pub async fn predict(&self, frame: &DataFrame) -> Result<Vec<f64>> {
        self.model.predict(frame).await
    }

    /// Class of one customer, `1.0` for churn.
    pub async fn predict_customer(&self, customer: &CustomerData) -> Result<f64> {
        let predictions = self.predict(&customer.to_frame()?).await?;
        predictions
            .first()
            .copied()
            .ok_or_else(|| PipelineError::Validation("model returned no prediction".to_string()))
    }

    /// `"Churned"` or `"Not Churned"`.
    pub async fn predict_label(&self, customer: &CustomerData) -> Result<&'static str> {
        Ok(TargetValueMapping.label(self.predict_customer(customer).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> HashMap<String, String> {
        [
            ("SeniorCitizen", "0"),
            ("Dependents", "No"),
            ("tenure", "12"),
            ("MultipleLines", "No"),
            ("InternetService", "Fiber optic"),
            ("OnlineSecurity", "No"),
            ("TechSupport", "No"),
            ("StreamingTV", "Yes"),
            ("StreamingMovies", "No"),
            ("Contract", "Month-to-month"),
            ("PaperlessBilling", "Yes"),
            ("PaymentMethod", "Electronic check"),
            ("MonthlyCharges", "70.35"),
            ("TotalCharges", "844.2"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_form_to_single_row_frame() {
        let customer = CustomerData::from_fields(&form()).unwrap();
        let frame = customer.to_frame().unwrap();

        assert_eq!(frame.shape(), (1, 14));
        assert_eq!(frame.column("tenure").unwrap()[0], &Cell::Number(12.0));
        assert_eq!(frame.column("SeniorCitizen").unwrap()[0], &Cell::Number(0.0));
        assert_eq!(frame.column("Contract").unwrap()[0], &Cell::from("Month-to-month"));
    }

    #[test]
    fn test_non_numeric_charge_rejected() {
        let mut fields = form();
        fields.insert("MonthlyCharges".to_string(), "lots".to_string());
        let err = CustomerData::from_fields(&fields).unwrap_err();
        assert!(err.to_string().contains("MonthlyCharges"));

        fields.remove("Dependents");
        fields.insert("MonthlyCharges".to_string(), "70".to_string());
        assert!(CustomerData::from_fields(&fields).unwrap_err().to_string().contains("Dependents"));
    }

    #[test]
    fn test_json_field_names_match_columns() {
        let customer = CustomerData::from_fields(&form()).unwrap();
        let json = serde_json::to_value(&customer).unwrap();
        for column in CustomerData::COLUMNS {
            assert!(json.get(column).is_some(), "missing {column}");
        }
    }
}

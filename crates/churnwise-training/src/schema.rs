use crate::error::{TrainingError, TrainingResult};
use crate::frame::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Declared shape of the customer dataset and how each feature is encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema", into = "RawSchema")]
pub struct SchemaDescriptor {
    /// Declared columns in file order, `(name, dtype)`.
    pub columns: Vec<(String, String)>,
    pub numerical_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub drop_columns: Vec<String>,
    pub numeric_features: Vec<String>,
    pub nominal_features: Vec<String>,
    pub ordinal_features: Vec<String>,
    /// Explicit category order per ordinal feature. Missing entries fall back
    /// to sorted order.
    pub ordinal_categories: BTreeMap<String, Vec<String>>,
    pub target_column: String,
}

/// On-disk form: `columns` is a list of single-entry maps so order survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSchema {
    columns: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    numerical_columns: Vec<String>,
    #[serde(default)]
    categorical_columns: Vec<String>,
    #[serde(default)]
    drop_columns: Vec<String>,
    #[serde(default)]
    numeric_features: Vec<String>,
    #[serde(default)]
    nominal_features: Vec<String>,
    #[serde(default)]
    ordinal_features: Vec<String>,
    #[serde(default)]
    ordinal_categories: BTreeMap<String, Vec<String>>,
    target_column: String,
}

impl TryFrom<RawSchema> for SchemaDescriptor {
    type Error = TrainingError;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        let mut columns = Vec::with_capacity(raw.columns.len());
        for entry in raw.columns {
            if entry.len() != 1 {
                return Err(TrainingError::Schema(format!(
                    "each columns entry must map one name to one dtype, got {} keys",
                    entry.len()
                )));
            }
            columns.extend(entry);
        }
        let schema = Self {
            columns,
            numerical_columns: raw.numerical_columns,
            categorical_columns: raw.categorical_columns,
            drop_columns: raw.drop_columns,
            numeric_features: raw.numeric_features,
            nominal_features: raw.nominal_features,
            ordinal_features: raw.ordinal_features,
            ordinal_categories: raw.ordinal_categories,
            target_column: raw.target_column,
        };
        schema.check()?;
        Ok(schema)
    }
}

impl From<SchemaDescriptor> for RawSchema {
    fn from(schema: SchemaDescriptor) -> Self {
        Self {
            columns: schema
                .columns
                .into_iter()
                .map(|(name, dtype)| BTreeMap::from([(name, dtype)]))
                .collect(),
            numerical_columns: schema.numerical_columns,
            categorical_columns: schema.categorical_columns,
            drop_columns: schema.drop_columns,
            numeric_features: schema.numeric_features,
            nominal_features: schema.nominal_features,
            ordinal_features: schema.ordinal_features,
            ordinal_categories: schema.ordinal_categories,
            target_column: schema.target_column,
        }
    }
}

impl SchemaDescriptor {
    pub fn from_yaml_str(raw: &str) -> TrainingResult<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Read the schema from disk. Stages call this each time they need it.
    pub fn load(path: &Path) -> TrainingResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    #[must_use]
    pub fn declared_column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Names from `numerical_columns` absent in `frame`.
    #[must_use]
    pub fn missing_numerical(&self, frame: &DataFrame) -> Vec<String> {
        missing_in(&self.numerical_columns, frame)
    }

    /// Names from `categorical_columns` absent in `frame`.
    #[must_use]
    pub fn missing_categorical(&self, frame: &DataFrame) -> Vec<String> {
        missing_in(&self.categorical_columns, frame)
    }

    fn check(&self) -> TrainingResult<()> {
        if self.target_column.trim().is_empty() {
            return Err(TrainingError::Schema("target_column must not be empty".to_string()));
        }
        let features = self
            .numeric_features
            .iter()
            .chain(&self.nominal_features)
            .chain(&self.ordinal_features);
        for feature in features {
            if feature == &self.target_column {
                return Err(TrainingError::Schema(format!(
                    "target column {feature} cannot also be a feature"
                )));
            }
            if self.drop_columns.contains(feature) {
                return Err(TrainingError::Schema(format!(
                    "feature {feature} is also listed in drop_columns"
                )));
            }
        }
        for name in self.ordinal_categories.keys() {
            if !self.ordinal_features.contains(name) {
                return Err(TrainingError::Schema(format!(
                    "ordinal_categories names {name}, which is not an ordinal feature"
                )));
            }
        }
        Ok(())
    }
}

fn missing_in(names: &[String], frame: &DataFrame) -> Vec<String> {
    names.iter().filter(|name| !frame.has_column(name)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
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

    #[test]
    fn test_schema_keeps_column_order() {
        let schema = SchemaDescriptor::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(
            schema.column_names(),
            vec!["customerID", "tenure", "Contract", "InternetService", "MonthlyCharges", "Churn"]
        );
        assert_eq!(schema.declared_column_count(), 6);
        assert_eq!(schema.target_column, "Churn");
    }

    #[test]
    fn test_schema_reports_missing_columns() {
        let schema = SchemaDescriptor::from_yaml_str(SAMPLE).unwrap();
        let frame = DataFrame::new(vec!["tenure".to_string(), "Contract".to_string()]);
        assert_eq!(schema.missing_numerical(&frame), vec!["MonthlyCharges".to_string()]);
        assert_eq!(
            schema.missing_categorical(&frame),
            vec!["InternetService".to_string(), "Churn".to_string()]
        );
    }

    #[test]
    fn test_target_as_feature_rejected() {
        let raw = SAMPLE.replace("nominal_features: [InternetService]", "nominal_features: [Churn]");
        assert!(SchemaDescriptor::from_yaml_str(&raw).is_err());
    }
}

use crate::artifact::{DataIngestionArtifact, DataValidationArtifact};
use crate::error::Result;
use churnwise_training::{ArtifactLayout, DataFrame, DriftDetector, SchemaDescriptor};
use std::path::Path;
use tracing::{info, warn};

/// Checks both splits against the schema, then measures train/test drift.
pub struct DataValidation {
    ingestion: DataIngestionArtifact,
    schema: SchemaDescriptor,
    detector: DriftDetector,
    layout: ArtifactLayout,
}

impl DataValidation {
    pub fn new(ingestion: DataIngestionArtifact, schema_file: &Path, layout: ArtifactLayout) -> Result<Self> {
        let schema = SchemaDescriptor::load(schema_file)?;
        Ok(Self::with_schema(ingestion, schema, layout))
    }

    pub fn with_schema(ingestion: DataIngestionArtifact, schema: SchemaDescriptor, layout: ArtifactLayout) -> Self {
        Self { ingestion, schema, detector: DriftDetector::default(), layout }
    }

    pub fn validate_number_of_columns(&self, frame: &DataFrame) -> bool {
        let status = frame.n_cols() == self.schema.declared_column_count();
        info!(
            actual = frame.n_cols(),
            declared = self.schema.declared_column_count(),
            status,
            "checked column count"
        );
        status
    }

    pub fn is_column_exist(&self, frame: &DataFrame) -> bool {
        let missing_numerical = self.schema.missing_numerical(frame);
        let missing_categorical = self.schema.missing_categorical(frame);
        if !missing_numerical.is_empty() {
            warn!(columns = ?missing_numerical, "missing numerical columns");
        }
        if !missing_categorical.is_empty() {
            warn!(columns = ?missing_categorical, "missing categorical columns");
        }
        missing_numerical.is_empty() && missing_categorical.is_empty()
    }

    /// Write the per-feature drift report and return the dataset verdict.
    pub fn detect_dataset_drift(&self, reference: &DataFrame, current: &DataFrame) -> Result<bool> {
        let report = self.detector.detect(reference, current)?;
        report.write_yaml(&self.layout.drift_report_file())?;
        info!(
            drifted = report.number_of_drifted_columns,
            columns = report.number_of_columns,
            "{}/{} features drifted",
            report.number_of_drifted_columns,
            report.number_of_columns
        );
        Ok(report.dataset_drift)
    }

    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact> {
        let train = DataFrame::read_csv(&self.ingestion.trained_file_path)?;
        let test = DataFrame::read_csv(&self.ingestion.test_file_path)?;

        let mut message = String::new();
        if !self.validate_number_of_columns(&train) {
            message.push_str("Columns are missing in training dataframe. ");
        }
        if !self.validate_number_of_columns(&test) {
            message.push_str("Columns are missing in test dataframe. ");
        }
        if !self.is_column_exist(&train) {
            message.push_str("Required columns are missing in training dataframe. ");
        }
        if !self.is_column_exist(&test) {
            message.push_str("Required columns are missing in test dataframe. ");
        }

        let validation_status = message.is_empty();
        let message = if validation_status {
            if self.detect_dataset_drift(&train, &test)? {
                "Drift detected".to_string()
            } else {
                "Drift not detected".to_string()
            }
        } else {
            let message = message.trim_end().to_string();
            warn!(%message, "data validation failed");
            message
        };

        Ok(DataValidationArtifact {
            validation_status,
            message,
            drift_report_file_path: self.layout.drift_report_file(),
        })
    }
}

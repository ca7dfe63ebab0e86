use crate::artifact::{DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact};
use crate::config::TransformationConfig;
use crate::error::{PipelineError, Result};
use churnwise_training::persist;
use churnwise_training::{
    ArtifactLayout, ColumnTransformer, DataFrame, FittedColumnTransformer, Matrix, SchemaDescriptor, Smoteenn,
    TargetValueMapping,
};
use std::path::Path;
use tracing::info;

/// Fits the column transformer on train, encodes both splits and rebalances.
pub struct DataTransformation {
    ingestion: DataIngestionArtifact,
    validation: DataValidationArtifact,
    schema: SchemaDescriptor,
    config: TransformationConfig,
    layout: ArtifactLayout,
}

impl DataTransformation {
    pub fn new(
        ingestion: DataIngestionArtifact,
        validation: DataValidationArtifact,
        schema_file: &Path,
        config: TransformationConfig,
        layout: ArtifactLayout,
    ) -> Result<Self> {
        let schema = SchemaDescriptor::load(schema_file)?;
        Ok(Self::with_schema(ingestion, validation, schema, config, layout))
    }

    pub fn with_schema(
        ingestion: DataIngestionArtifact,
        validation: DataValidationArtifact,
        schema: SchemaDescriptor,
        config: TransformationConfig,
        layout: ArtifactLayout,
    ) -> Self {
        Self { ingestion, validation, schema, config, layout }
    }

    pub fn get_data_transformer_object(&self) -> ColumnTransformer {
        ColumnTransformer::from_schema(&self.schema)
    }

    /// Drop configured columns, split off the target and encode it.
    fn features_and_labels(&self, frame: &DataFrame) -> Result<(DataFrame, Vec<f64>)> {
        let present: Vec<&String> = self.schema.drop_columns.iter().filter(|c| frame.has_column(c)).collect();
        let frame = frame.drop_columns(&present)?;
        let (features, target) = frame.split_target(&self.schema.target_column)?;
        let labels = TargetValueMapping.encode_all(&target)?;
        Ok((features, labels))
    }

    pub fn initiate_data_transformation(&self) -> Result<DataTransformationArtifact> {
        if !self.validation.validation_status {
            return Err(PipelineError::Validation(self.validation.message.clone()));
        }

        let train = DataFrame::read_csv(&self.ingestion.trained_file_path)?;
        let test = DataFrame::read_csv(&self.ingestion.test_file_path)?;
        let (train_features, train_labels) = self.features_and_labels(&train)?;
        let (test_features, test_labels) = self.features_and_labels(&test)?;

        let transformer: FittedColumnTransformer = self.get_data_transformer_object().fit(&train_features)?;
        let train_x = transformer.transform(&train_features)?;
        let test_x = transformer.transform(&test_features)?;
        info!(
            features = transformer.n_features_out(),
            train_rows = train_x.n_rows(),
            test_rows = test_x.n_rows(),
            "transformed splits"
        );

        let balancer = Smoteenn::with_seed(self.config.seed);
        let (train_x, train_labels) = balancer.fit_resample(&train_x, &train_labels)?;
        let (test_x, test_labels) = if self.config.balance_scope.balances_test() {
            balancer.fit_resample(&test_x, &test_labels)?
        } else {
            (test_x, test_labels)
        };

        let train_arr: Matrix = train_x.with_label_column(&train_labels)?;
        let test_arr: Matrix = test_x.with_label_column(&test_labels)?;

        persist::save_object(&self.layout.transformer_file(), &transformer)?;
        persist::save_object(&self.layout.transformed_train_file(), &train_arr)?;
        persist::save_object(&self.layout.transformed_test_file(), &test_arr)?;
        info!(
            balance_scope = ?self.config.balance_scope,
            train_rows = train_arr.n_rows(),
            test_rows = test_arr.n_rows(),
            "saved transformer and transformed arrays"
        );

        Ok(DataTransformationArtifact {
            transformed_object_file_path: self.layout.transformer_file(),
            transformed_train_file_path: self.layout.transformed_train_file(),
            transformed_test_file_path: self.layout.transformed_test_file(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use churnwise_training::BalanceScope;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SCHEMA: &str = "columns:\n  - x: float\n  - Churn: category\nnumeric_features: [x]\ntarget_column: Churn\n";

    /// Twelve stayers near zero and four churners near 100 in train, a 6/2
    /// split in test.
    fn write_imbalanced_splits(temp: &TempDir) {
        let mut train = String::from("x,Churn\n");
        for i in 0..12 {
            train.push_str(&format!("{i},No\n"));
        }
        for i in 100..104 {
            train.push_str(&format!("{i},Yes\n"));
        }
        std::fs::write(temp.path().join("train.csv"), train).unwrap();

        let test = "x,Churn\n2.5,No\n3.5,No\n4.5,No\n5.5,No\n6.5,No\n7.5,No\n100.5,Yes\n101.5,Yes\n";
        std::fs::write(temp.path().join("test.csv"), test).unwrap();
    }

    fn run_stage(temp: &TempDir, balance_scope: BalanceScope) -> DataTransformationArtifact {
        write_imbalanced_splits(temp);
        let (ingestion, validation) = artifacts(temp, true);
        let config = TransformationConfig { balance_scope, seed: 7 };
        DataTransformation::with_schema(
            ingestion,
            validation,
            SchemaDescriptor::from_yaml_str(SCHEMA).unwrap(),
            config,
            ArtifactLayout::new(temp.path().join("run")),
        )
        .initiate_data_transformation()
        .unwrap()
    }

    fn label_counts(labels: &[f64]) -> (usize, usize) {
        let churned = labels.iter().filter(|&&l| l == 1.0).count();
        (labels.len() - churned, churned)
    }

    fn artifacts(temp: &TempDir, status: bool) -> (DataIngestionArtifact, DataValidationArtifact) {
        (
            DataIngestionArtifact {
                trained_file_path: temp.path().join("train.csv"),
                test_file_path: temp.path().join("test.csv"),
            },
            DataValidationArtifact {
                validation_status: status,
                message: "Columns are missing in test dataframe.".to_string(),
                drift_report_file_path: temp.path().join("report.yaml"),
            },
        )
    }

    #[test]
    fn test_refuses_invalid_validation() {
        let temp = TempDir::new().unwrap();
        let (ingestion, validation) = artifacts(&temp, false);
        let schema = SchemaDescriptor::from_yaml_str(
            "columns:\n  - a: int\n  - Churn: category\nnumeric_features: [a]\ntarget_column: Churn\n",
        )
        .unwrap();
        let stage = DataTransformation::with_schema(
            ingestion,
            validation,
            schema,
            TransformationConfig::default(),
            ArtifactLayout::new(temp.path().join("run")),
        );

        let err = stage.initiate_data_transformation().unwrap_err();
        assert!(matches!(err, PipelineError::Validation(ref m) if m.contains("missing")));
    }

    #[test]
    fn test_scaler_is_fit_on_train_only() {
        let temp = TempDir::new().unwrap();
        let artifact = run_stage(&temp, BalanceScope::TrainOnly);

        let transformer: FittedColumnTransformer =
            persist::load_object(&artifact.transformed_object_file_path).unwrap();
        let scaler = &transformer.scalers[0];
        let train_mean = (66.0 + 406.0) / 16.0;
        assert!((scaler.mean - train_mean).abs() < 1e-12, "mean {}", scaler.mean);

        let test: Matrix = persist::load_object(&artifact.transformed_test_file_path).unwrap();
        let expected = (2.5 - train_mean) / scaler.scale;
        assert!((test.get(0, 0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_train_only_scope_leaves_test_split_untouched() {
        let temp = TempDir::new().unwrap();
        let artifact = run_stage(&temp, BalanceScope::TrainOnly);

        let train: Matrix = persist::load_object(&artifact.transformed_train_file_path).unwrap();
        let (_, train_labels) = train.split_label_column().unwrap();
        assert_eq!(label_counts(&train_labels), (12, 12));

        let test: Matrix = persist::load_object(&artifact.transformed_test_file_path).unwrap();
        let (test_x, test_labels) = test.split_label_column().unwrap();
        assert_eq!(test_x.n_rows(), 8);
        assert_eq!(label_counts(&test_labels), (6, 2));
    }

    #[test]
    fn test_train_and_test_scope_rebalances_test_split() {
        let temp = TempDir::new().unwrap();
        let artifact = run_stage(&temp, BalanceScope::TrainAndTest);

        let test: Matrix = persist::load_object(&artifact.transformed_test_file_path).unwrap();
        let (test_x, test_labels) = test.split_label_column().unwrap();
        assert_eq!(test_x.n_rows(), 12);
        assert_eq!(label_counts(&test_labels), (6, 6));
    }
}

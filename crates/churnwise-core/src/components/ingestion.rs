use crate::artifact::DataIngestionArtifact;
use crate::config::IngestionConfig;
use crate::error::{PipelineError, Result};
use crate::storage::DocumentStore;
use churnwise_training::{ArtifactLayout, DataFrame};
use std::sync::Arc;
use tracing::info;

/// Identity field added by the document store.
const ID_FIELD: &str = "_id";

/// Exports the customer collection into the feature store and splits it.
pub struct DataIngestion {
    store: Arc<dyn DocumentStore>,
    collection: String,
    config: IngestionConfig,
    layout: ArtifactLayout,
}

impl DataIngestion {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        config: IngestionConfig,
        layout: ArtifactLayout,
    ) -> Self {
        Self { store, collection: collection.into(), config, layout }
    }

    /// Read the whole collection, drop `_id`, null out the missing-value
    /// token and write the feature store CSV.
    pub async fn export_data_into_feature_store(&self) -> Result<DataFrame> {
        let records = self.store.find_all(&self.collection).await?;
        info!(
            store = self.store.name(),
            collection = %self.collection,
            records = records.len(),
            "exporting collection to feature store"
        );
        if records.is_empty() {
            return Err(PipelineError::EmptyDataset(self.collection.clone()));
        }

        let mut frame = DataFrame::from_records(records);
        if frame.has_column(ID_FIELD) {
            frame = frame.drop_columns(&[ID_FIELD])?;
        }
        let replaced = frame.normalize_missing(&self.config.missing_token);
        let (rows, cols) = frame.shape();
        info!(rows, cols, replaced, "normalized feature store frame");

        frame.write_csv(&self.layout.feature_store_file())?;
        Ok(frame)
    }

    /// Shuffle with the configured seed and write the train and test CSVs.
    pub fn split_data_as_train_test(&self, frame: &DataFrame) -> Result<()> {
        if frame.is_empty() {
            return Err(PipelineError::EmptyDataset(self.collection.clone()));
        }
        let (train, test) = frame.train_test_split(self.config.test_ratio, self.config.seed)?;
        train.write_csv(&self.layout.train_file())?;
        test.write_csv(&self.layout.test_file())?;
        info!(train_rows = train.n_rows(), test_rows = test.n_rows(), "wrote train and test splits");
        Ok(())
    }

    pub async fn initiate_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        let frame = self.export_data_into_feature_store().await?;
        self.split_data_as_train_test(&frame)?;
        Ok(DataIngestionArtifact {
            trained_file_path: self.layout.train_file(),
            test_file_path: self.layout.test_file(),
        })
    }
}

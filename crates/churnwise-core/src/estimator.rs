use crate::error::Result;
use crate::storage::ObjectStore;
use churnwise_training::{ChurnModel, DataFrame};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// The model bundle stored at the registry key.
///
/// The bundle is downloaded on first use and cached for the lifetime of the
/// handle. Saving does not refresh the cache.
pub struct ProductionModel {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    model_path: String,
    loaded: OnceCell<Arc<ChurnModel>>,
}

impl ProductionModel {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>, model_path: impl Into<String>) -> Self {
        Self { store, bucket: bucket.into(), model_path: model_path.into(), loaded: OnceCell::new() }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub async fn is_model_present(&self) -> Result<bool> {
        self.store.key_exists(&self.bucket, &self.model_path).await
    }

    /// Download and decode the bundle, bypassing the cache.
    pub async fn load_model(&self) -> Result<ChurnModel> {
        let bytes = self.store.get_object(&self.bucket, &self.model_path).await?;
        let model = ChurnModel::from_bytes(&bytes)?;
        info!(
            bucket = %self.bucket,
            key = %self.model_path,
            description = model.description(),
            "loaded production model"
        );
        Ok(model)
    }

    /// Upload a bundle file to the registry key, overwriting it.
    pub async fn save_model(&self, from_file: &Path) -> Result<()> {
        self.store.upload_file(&self.bucket, &self.model_path, from_file).await
    }

    /// The cached bundle, loading it on first call.
    pub async fn model(&self) -> Result<Arc<ChurnModel>> {
        let model = self
            .loaded
            .get_or_try_init(|| async { self.load_model().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(model))
    }

    pub async fn predict(&self, frame: &DataFrame) -> Result<Vec<f64>> {
        Ok(self.model().await?.predict(frame)?)
    }
}

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use churnwise_training::{DataFrame, Record};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Read access to the customer record collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in `collection`, unprojected, in store order.
    async fn find_all(&self, collection: &str) -> Result<Vec<Record>>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// One `<collection>.csv` per collection under `dir`.
#[derive(Debug, Clone)]
pub struct CsvDocumentStore {
    dir: PathBuf,
}

impl CsvDocumentStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl DocumentStore for CsvDocumentStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Record>> {
        let path = self.dir.join(format!("{collection}.csv"));
        if !path.exists() {
            return Err(PipelineError::NotFound(path.display().to_string()));
        }
        let frame = tokio::task::spawn_blocking(move || DataFrame::read_csv(&path))
            .await
            .map_err(|e| PipelineError::DocumentStore(e.to_string()))??;

        let columns = frame.columns().to_vec();
        Ok(frame
            .rows()
            .iter()
            .map(|row| columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect())
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Collections held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_many(&self, collection: &str, records: Vec<Record>) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .extend(records);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Record>> {
        Ok(self.collections.read().await.get(collection).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

//! Storage backends for customer records and the model registry.
//!
//! Both stores are traits so the pipeline and server hold
//! `Arc<dyn DocumentStore>` / `Arc<dyn ObjectStore>` built once by the caller.

pub mod document;
pub mod object;

#[cfg(feature = "mongo")]
pub mod mongo;
#[cfg(feature = "s3")]
pub mod s3;

pub use document::{CsvDocumentStore, DocumentStore, InMemoryDocumentStore};
pub use object::{InMemoryObjectStore, LocalObjectStore, ObjectStore};

#[cfg(feature = "mongo")]
pub use mongo::MongoDocumentStore;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

use crate::config::{PipelineConfig, RegistryKind, SourceKind};
use crate::error::Result;
use std::sync::Arc;

/// Build the document store named by `config.source`.
pub async fn document_store_from_config(config: &PipelineConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.source.kind {
        SourceKind::Csv => Ok(Arc::new(CsvDocumentStore::new(config.source.csv_dir.clone()))),
        #[cfg(feature = "mongo")]
        SourceKind::Mongo => {
            let store = MongoDocumentStore::connect(&config.source.mongodb_url, &config.source.database).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongo"))]
        SourceKind::Mongo => Err(crate::error::PipelineError::Config(
            "source.kind = \"mongo\" requires the mongo feature".to_string(),
        )),
    }
}

/// Build the object store named by `config.registry`.
pub async fn object_store_from_config(config: &PipelineConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.registry.kind {
        RegistryKind::Local => Ok(Arc::new(LocalObjectStore::new(config.registry.local_dir.clone()))),
        #[cfg(feature = "s3")]
        RegistryKind::S3 => Ok(Arc::new(S3ObjectStore::new(&config.registry.region).await)),
        #[cfg(not(feature = "s3"))]
        RegistryKind::S3 => Err(crate::error::PipelineError::Config(
            "registry.kind = \"s3\" requires the s3 feature".to_string(),
        )),
    }
}

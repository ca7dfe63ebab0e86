use super::DocumentStore;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use churnwise_training::{Cell, Record};
use futures::TryStreamExt;
use mongodb::Client;
use mongodb::bson::{Bson, Document, doc};
use tracing::info;

/// MongoDB-backed record source. The client is built once and reused.
#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    client: Client,
    database: String,
}

impl MongoDocumentStore {
    pub async fn connect(url: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(url)
            .await
            .map_err(|e| PipelineError::DocumentStore(format!("failed to connect: {e}")))?;
        info!(database, "connected to MongoDB");
        Ok(Self { client, database: database.to_string() })
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn find_all(&self, collection: &str) -> Result<Vec<Record>> {
        let handle = self.client.database(&self.database).collection::<Document>(collection);
        let mut cursor = handle
            .find(doc! {})
            .await
            .map_err(|e| PipelineError::DocumentStore(e.to_string()))?;

        let mut records = Vec::new();
        while let Some(document) = cursor
            .try_next()
            .await
            .map_err(|e| PipelineError::DocumentStore(e.to_string()))?
        {
            records.push(document.into_iter().map(|(key, value)| (key, bson_to_cell(value))).collect());
        }
        Ok(records)
    }

    fn name(&self) -> &str {
        "mongodb"
    }
}

/// Strings go through the same parsing as CSV fields so numeric text
/// becomes a number.
fn bson_to_cell(value: Bson) -> Cell {
    match value {
        Bson::Null | Bson::Undefined => Cell::Null,
        Bson::Double(v) => Cell::Number(v),
        Bson::Int32(v) => Cell::Number(f64::from(v)),
        Bson::Int64(v) => Cell::Number(v as f64),
        Bson::Boolean(v) => Cell::Number(if v { 1.0 } else { 0.0 }),
        Bson::String(s) => Cell::parse(&s),
        Bson::ObjectId(id) => Cell::Text(id.to_hex()),
        other => Cell::Text(other.to_string()),
    }
}

//! HTTP front end: the prediction form and the training trigger.

pub mod logging;
mod routes;

pub use routes::{AppState, router};

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::storage::{document_store_from_config, object_store_from_config};

/// Start the HTTP server on `config.server`.
///
/// Stores are built once here and shared by every request.
///
/// # Errors
///
/// Returns an error if a store cannot be built or the address cannot be bound.
pub async fn run(config: PipelineConfig) -> Result<()> {
    let addr = config.server_addr();
    let documents = document_store_from_config(&config).await?;
    let objects = object_store_from_config(&config).await?;
    let state = Arc::new(AppState::new(config, documents, objects)?);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Starting churnwise HTTP server");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

//! Serve command implementation.

use churnwise_core::config::PipelineConfig;
use churnwise_core::server;

/// Execute the serve command. Runs until the process is stopped.
pub async fn execute(mut config: PipelineConfig, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    server::run(config).await?;
    Ok(())
}

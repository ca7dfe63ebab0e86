//! Churnwise CLI - train, serve and query the churn model.

mod commands;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use churnwise_core::config::PipelineConfig;
use commands::{predict, serve, train};

/// Churnwise - customer churn prediction pipeline
#[derive(Parser, Debug)]
#[command(
    name = "churnwise",
    author,
    version,
    about = "Churnwise - customer churn prediction pipeline",
    long_about = "Ingests customer records, trains and evaluates churn classifiers, publishes accepted models\nand serves predictions over HTTP."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Pipeline configuration file
    #[arg(short, long, default_value = "churnwise.toml", global = true)]
    config: PathBuf,

    /// Directory receiving one timestamped log file per invocation
    #[arg(long, default_value = "logs", global = true)]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full training pipeline once
    Train,

    /// Serve the prediction form and the training route
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Predict churn for one customer described in a JSON file
    Predict {
        /// JSON object with the 14 customer fields
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _log_guard = logging::init(logging::log_level(&args.log_level), &args.log_dir)?;

    let config = PipelineConfig::load(&args.config)?;

    match args.command {
        Command::Train => train::execute(config).await?,
        Command::Serve { port } => serve::execute(config, port).await?,
        Command::Predict { input } => predict::execute(config, &input).await?,
    }

    Ok(())
}

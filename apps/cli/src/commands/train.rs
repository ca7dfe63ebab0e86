//! Train command implementation.

use churnwise_core::config::PipelineConfig;
use churnwise_core::storage::{document_store_from_config, object_store_from_config};
use churnwise_core::{PipelineOutcome, TrainPipeline};
use colored::Colorize;

/// Execute the train command.
pub async fn execute(config: PipelineConfig) -> anyhow::Result<()> {
    let documents = document_store_from_config(&config).await?;
    let objects = object_store_from_config(&config).await?;

    println!("{}", "Running training pipeline...".bold().cyan());
    let outcome = TrainPipeline::new(config, documents, objects).run_pipeline().await?;

    match outcome {
        PipelineOutcome::Published(pushed) => {
            println!(
                "{}",
                format!("✓ Model published to {}/{}", pushed.bucket_name, pushed.s3_model_path)
                    .green()
                    .bold()
            );
        }
        PipelineOutcome::NotAccepted(evaluation) => {
            let production = evaluation
                .best_model_f1_score
                .map_or_else(|| "none".to_string(), |score| format!("{score:.4}"));
            println!(
                "{}",
                format!(
                    "Model not accepted: f1 {:.4} vs production {}",
                    evaluation.trained_model_f1_score, production
                )
                .yellow()
            );
        }
    }
    Ok(())
}

//! End-to-end runs of the training pipeline against in-memory stores.

mod common;

use churnwise_core::storage::{InMemoryDocumentStore, InMemoryObjectStore};
use churnwise_core::{PipelineError, PipelineOutcome, ProductionModel, TrainPipeline};
use churnwise_training::{
    ArtifactKind, ChurnModel, DataFrame, ProgressEvent, RecordingProgressSink, RunManifest, RunOutcome, Stage,
};
use common::{BUCKET, MODEL_KEY, config_in, find_files, seeded_documents};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

fn manifests(root: &std::path::Path) -> Vec<RunManifest> {
    find_files(&root.join("artifact"), "run_manifest.json")
        .iter()
        .map(|path| RunManifest::read(path).unwrap())
        .collect()
}

#[tokio::test]
async fn test_first_run_publishes_and_identical_rerun_is_rejected() {
    let temp = TempDir::new().unwrap();
    let config = config_in(temp.path());
    let documents = seeded_documents(120).await;
    let objects = Arc::new(InMemoryObjectStore::new());
    let progress = Arc::new(RecordingProgressSink::default());

    let pipeline = TrainPipeline::new(config, documents, objects.clone()).with_progress(progress.clone());

    let first = pipeline.run_pipeline().await.unwrap();
    match &first {
        PipelineOutcome::Published(pushed) => {
            assert_eq!(pushed.bucket_name, BUCKET);
            assert_eq!(pushed.s3_model_path, MODEL_KEY);
        }
        other => panic!("expected a published model, got {other:?}"),
    }
    assert_eq!(objects.writes(), vec![format!("{BUCKET}/{MODEL_KEY}")]);

    let stages: Vec<Stage> = progress
        .events()
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Finished { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            Stage::Ingestion,
            Stage::Validation,
            Stage::Transformation,
            Stage::Training,
            Stage::Evaluation,
            Stage::Publishing,
        ]
    );

    // Same data and seeds: the new model only ties the production model.
    let second = pipeline.run_pipeline().await.unwrap();
    match &second {
        PipelineOutcome::NotAccepted(evaluation) => {
            assert!(!evaluation.is_model_accepted);
            let production = evaluation.best_model_f1_score.unwrap();
            assert!((evaluation.trained_model_f1_score - production).abs() < 1e-12);
        }
        other => panic!("expected the rerun to be rejected, got {other:?}"),
    }
    assert_eq!(objects.writes().len(), 1, "rejected model must not be published");
    assert!(progress.events().iter().any(|event| matches!(
        event,
        ProgressEvent::Skipped { stage: Stage::Publishing, .. }
    )));
}

#[tokio::test]
async fn test_manifest_lists_digested_artifacts() {
    let temp = TempDir::new().unwrap();
    let pipeline = TrainPipeline::new(
        config_in(temp.path()),
        seeded_documents(90).await,
        Arc::new(InMemoryObjectStore::new()),
    );
    pipeline.run_pipeline().await.unwrap();

    let manifests = manifests(temp.path());
    assert_eq!(manifests.len(), 1);
    let manifest = &manifests[0];
    assert_eq!(manifest.outcome, RunOutcome::Published);
    assert_eq!(manifest.artifacts.len(), 8);
    for artifact in &manifest.artifacts {
        assert!(artifact.path.exists());
        assert_eq!(artifact.sha256.len(), 64);
    }
    assert!(manifest.artifacts.iter().any(|a| a.kind == ArtifactKind::ModelBundle));
}

#[tokio::test]
async fn test_empty_collection_fails_in_ingestion_before_any_split() {
    let temp = TempDir::new().unwrap();
    let objects = Arc::new(InMemoryObjectStore::new());
    let pipeline =
        TrainPipeline::new(config_in(temp.path()), Arc::new(InMemoryDocumentStore::new()), objects.clone());

    let err = pipeline.run_pipeline().await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Ingestion));
    assert!(matches!(err.root(), PipelineError::EmptyDataset(_)));

    let artifact_root = temp.path().join("artifact");
    assert!(find_files(&artifact_root, "train.csv").is_empty());
    assert!(find_files(&artifact_root, "preprocessing.bin").is_empty());
    assert!(objects.writes().is_empty());

    let manifests = manifests(temp.path());
    assert_eq!(manifests[0].outcome, RunOutcome::Failed);
    assert!(manifests[0].message.as_deref().unwrap_or_default().contains("no records found"));
}

#[tokio::test]
async fn test_schema_mismatch_stops_in_validation() {
    let temp = TempDir::new().unwrap();
    let config = config_in(temp.path());
    let schema = common::SCHEMA.replace("  - Churn: category", "  - Churn: category\n  - gender: category");
    std::fs::write(&config.schema_file, schema).unwrap();

    let pipeline = TrainPipeline::new(config, seeded_documents(60).await, Arc::new(InMemoryObjectStore::new()));
    let err = pipeline.run_pipeline().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Validation));
    match err.root() {
        PipelineError::Validation(message) => assert!(message.contains("training dataframe")),
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert!(find_files(&temp.path().join("artifact"), "preprocessing.bin").is_empty());
}

#[tokio::test]
async fn test_registry_bundle_predicts_like_local_bundle() {
    let temp = TempDir::new().unwrap();
    let objects = Arc::new(InMemoryObjectStore::new());
    let pipeline = TrainPipeline::new(config_in(temp.path()), seeded_documents(90).await, objects.clone());
    pipeline.run_pipeline().await.unwrap();

    let bundle_path = find_files(&temp.path().join("artifact"), "model.bin").pop().unwrap();
    let local = ChurnModel::load(&bundle_path).unwrap();
    let production = ProductionModel::new(objects, BUCKET, MODEL_KEY);
    assert!(production.is_model_present().await.unwrap());

    let test_file = find_files(&temp.path().join("artifact"), "test.csv").pop().unwrap();
    let (features, _) = DataFrame::read_csv(&test_file).unwrap().split_target("Churn").unwrap();
    let expected = local.predict(&features).unwrap();
    assert_eq!(production.predict(&features).await.unwrap(), expected);
    assert_eq!(production.model().await.unwrap().description(), local.description());
}

#[tokio::test]
async fn test_back_to_back_runs_keep_separate_manifests() {
    let temp = TempDir::new().unwrap();
    let config = config_in(temp.path());
    let objects = Arc::new(InMemoryObjectStore::new());

    TrainPipeline::new(config.clone(), seeded_documents(90).await, objects.clone())
        .run_pipeline()
        .await
        .unwrap();
    TrainPipeline::new(config, Arc::new(InMemoryDocumentStore::new()), objects)
        .run_pipeline()
        .await
        .unwrap_err();

    let manifests = manifests(temp.path());
    assert_eq!(manifests.len(), 2);
    assert_ne!(manifests[0].run_id, manifests[1].run_id);

    let published = manifests.iter().find(|m| m.outcome == RunOutcome::Published).unwrap();
    assert_eq!(published.artifacts.len(), 8);
    let failed = manifests.iter().find(|m| m.outcome == RunOutcome::Failed).unwrap();
    assert!(failed.artifacts.is_empty(), "failed run lists {} artifacts", failed.artifacts.len());
}

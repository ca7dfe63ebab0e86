//! Router tests driven through `tower::ServiceExt::oneshot`.

mod common;

use axum::body::Body;
use churnwise_core::server::logging::REQUEST_ID_HEADER;
use churnwise_core::server::{AppState, router};
use churnwise_core::storage::{InMemoryDocumentStore, InMemoryObjectStore};
use common::{config_in, seeded_documents};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const FORM: &str = "SeniorCitizen=0&Dependents=No&tenure=5&MultipleLines=No&InternetService=DSL\
&OnlineSecurity=No&TechSupport=No&StreamingTV=No&StreamingMovies=No&PaperlessBilling=Yes\
&PaymentMethod=Electronic+check&MonthlyCharges=45.5&TotalCharges=227.5";

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post_form(contract: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(format!("{FORM}&Contract={contract}")))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_index_renders_form_with_request_id() {
    let temp = TempDir::new().unwrap();
    let state = AppState::new(
        config_in(temp.path()),
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryObjectStore::new()),
    )
    .unwrap();

    let response = router(Arc::new(state)).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body = body_text(response).await;
    assert!(body.contains("<form method=\"post\""));
    assert!(body.contains("Rendering"));
}

#[tokio::test]
async fn test_predict_without_model_returns_json_error() {
    let temp = TempDir::new().unwrap();
    let state = AppState::new(
        config_in(temp.path()),
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryObjectStore::new()),
    )
    .unwrap();

    let response = router(Arc::new(state)).oneshot(post_form("Month-to-month")).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], false);
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_train_then_predict() {
    let temp = TempDir::new().unwrap();
    let state = AppState::new(
        config_in(temp.path()),
        seeded_documents(90).await,
        Arc::new(InMemoryObjectStore::new()),
    )
    .unwrap();
    let app = router(Arc::new(state));

    let response = app.clone().oneshot(get("/train")).await.unwrap();
    assert_eq!(body_text(response).await, "Training successful !!");

    let churned = body_text(app.clone().oneshot(post_form("Month-to-month")).await.unwrap()).await;
    assert!(churned.contains("<div class=\"result\">Churned</div>"), "{churned}");

    let stays = body_text(app.oneshot(post_form("Two+year")).await.unwrap()).await;
    assert!(stays.contains("<div class=\"result\">Not Churned</div>"), "{stays}");
}

#[tokio::test]
async fn test_train_failure_is_reported_as_text() {
    let temp = TempDir::new().unwrap();
    let state = AppState::new(
        config_in(temp.path()),
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryObjectStore::new()),
    )
    .unwrap();

    let response = router(Arc::new(state)).oneshot(get("/train")).await.unwrap();
    let body = body_text(response).await;
    assert!(body.starts_with("Error Occurred! data ingestion stage failed"), "{body}");
    assert!(body.contains("no records found"));
}

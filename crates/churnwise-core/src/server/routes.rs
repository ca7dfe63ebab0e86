use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Form, State};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use handlebars::Handlebars;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::logging::RequestLoggerLayer;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::{PipelineOutcome, TrainPipeline};
use crate::prediction::{ChurnClassifier, CustomerData};
use crate::storage::{DocumentStore, ObjectStore};

const TEMPLATE_NAME: &str = "churn";
const TEMPLATE: &str = include_str!("../../templates/churn.html");

/// Shared by every handler.
pub struct AppState {
    config: PipelineConfig,
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    templates: Handlebars<'static>,
    /// Replaced after a run publishes a new model so the next prediction reloads it.
    classifier: RwLock<Arc<ChurnClassifier>>,
    /// Held for the whole of a training run.
    training: Mutex<()>,
}

impl AppState {
    pub fn new(config: PipelineConfig, documents: Arc<dyn DocumentStore>, objects: Arc<dyn ObjectStore>) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string(TEMPLATE_NAME, TEMPLATE)
            .map_err(|e| PipelineError::Config(format!("invalid page template: {e}")))?;
        let classifier = Arc::new(ChurnClassifier::from_config(&config, Arc::clone(&objects)));
        Ok(Self {
            config,
            documents,
            objects,
            templates,
            classifier: RwLock::new(classifier),
            training: Mutex::new(()),
        })
    }

    fn render(&self, context: &str) -> Result<Html<String>> {
        self.templates
            .render(TEMPLATE_NAME, &json!({ "context": context }))
            .map(Html)
            .map_err(|e| PipelineError::Config(format!("failed to render page: {e}")))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).post(predict))
        .route("/train", get(train))
        .layer(
            ServiceBuilder::new()
                .layer(RequestLoggerLayer)
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn error_json(err: &PipelineError) -> Response {
    Json(json!({ "status": false, "error": err.chain() })).into_response()
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    match state.render("Rendering") {
        Ok(page) => page.into_response(),
        Err(err) => error_json(&err),
    }
}

async fn predict(State(state): State<Arc<AppState>>, Form(fields): Form<HashMap<String, String>>) -> Response {
    let result = async {
        let customer = CustomerData::from_fields(&fields)?;
        let classifier = Arc::clone(&*state.classifier.read().await);
        let label = classifier.predict_label(&customer).await?;
        info!(label, "served prediction");
        state.render(label)
    }
    .await;

    match result {
        Ok(page) => page.into_response(),
        Err(err) => {
            warn!(error = %err.chain(), "prediction failed");
            error_json(&err)
        }
    }
}

async fn train(State(state): State<Arc<AppState>>) -> String {
    let _guard = state.training.lock().await;
    let pipeline = TrainPipeline::new(state.config.clone(), Arc::clone(&state.documents), Arc::clone(&state.objects));
    match pipeline.run_pipeline().await {
        Ok(outcome) => {
            if matches!(outcome, PipelineOutcome::Published(_)) {
                let fresh = Arc::new(ChurnClassifier::from_config(&state.config, Arc::clone(&state.objects)));
                *state.classifier.write().await = fresh;
            }
            "Training successful !!".to_string()
        }
        Err(err) => format!("Error Occurred! {}", err.chain()),
    }
}

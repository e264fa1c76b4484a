//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use serving_lib::{
    observability, DispatchError, Dispatcher, ErrorClass, HealthRegistry, ComponentStatus,
    ModelOption, PredictRequest,
};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, health_registry: HealthRegistry) -> Self {
        Self {
            dispatcher,
            health_registry,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct OptionInfo {
    id: u64,
    name: &'static str,
    description: &'static str,
}

fn error_response(err: &DispatchError) -> Response {
    let status = match err.class() {
        ErrorClass::Client => StatusCode::BAD_REQUEST,
        ErrorClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

async fn root() -> impl IntoResponse {
    Json(json!({ "status": "loaded" }))
}

/// Run one dispatch on the blocking pool and map the outcome to a status
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Response {
    let dispatcher = Arc::clone(&state.dispatcher);
    let outcome = tokio::task::spawn_blocking(move || dispatcher.dispatch_request(&request)).await;

    match outcome {
        Ok(Ok(result)) => {
            state.health_registry.record_success(result.option).await;
            (StatusCode::OK, Json(result)).into_response()
        }
        Ok(Err(err)) => {
            state.health_registry.record_failure(&err).await;
            error_response(&err)
        }
        Err(join_error) => {
            error!(error = %join_error, "Dispatch task failed");
            error_response(&DispatchError::Internal(join_error.to_string()))
        }
    }
}

async fn options() -> impl IntoResponse {
    let options: Vec<OptionInfo> = ModelOption::ALL
        .iter()
        .map(|option| OptionInfo {
            id: option.id(),
            name: option.name(),
            description: option.description(),
        })
        .collect();
    Json(options)
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // other options still served
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        observability::gather_text(),
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", post(predict))
        .route("/options", get(options))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

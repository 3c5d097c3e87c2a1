//! Axum route handlers.
//!
//! # Routes
//!
//! - `POST /run`    - `{status, message, outcomes}`; non-2xx with the failing stage on error
//! - `GET  /read`   - plain-text file contents, confined to the data root
//! - `GET  /health` - `{status: "ok", service, version, capabilities}`

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::confine::PathConfinement;
use crate::error::{InferenceError, RouterError};
use crate::TaskRouter;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<TaskRouter>,
    /// Confinement for `/read`; should match the capabilities' root.
    pub confine: PathConfinement,
    /// Cancelled on shutdown; each request runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(router: TaskRouter, confine: PathConfinement) -> Self {
        Self {
            router: Arc::new(router),
            confine,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/run", post(run_handler))
        .route("/read", get(read_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - liveness check.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "task-router",
        "version": crate::VERSION,
        "capabilities": state.router.registry().names(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RunParams {
    pub task: String,
}

/// POST /run - parse the task into selections and dispatch them.
///
/// 200 only when every selection succeeded (or there were none). Dispatch
/// failures return 500 and name each failed capability.
async fn run_handler(State(state): State<AppState>, Query(params): Query<RunParams>) -> Response {
    info!(task_len = params.task.len(), "run requested");
    let cancel = state.shutdown.child_token();

    match state.router.run_with_cancel(&params.task, cancel).await {
        Ok(report) if report.is_success() => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "message": "Task executed successfully",
                "outcomes": report.outcomes,
            })),
        )
            .into_response(),
        Ok(report) => {
            let failures: Vec<Value> = report
                .failures()
                .map(|o| {
                    json!({
                        "capability": o.selection.capability,
                        "status": o.status,
                        "detail": o.detail,
                    })
                })
                .collect();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "stage": "dispatch",
                    "message": report.failure_summary(),
                    "failures": failures,
                    "outcomes": report.outcomes,
                })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(stage = e.stage(), error = %e, "run failed");
            (
                status_for(&e),
                Json(json!({
                    "status": "error",
                    "stage": e.stage(),
                    "message": e.public_message(),
                })),
            )
                .into_response()
        }
    }
}

fn status_for(e: &RouterError) -> StatusCode {
    match e {
        RouterError::EmptyTask => StatusCode::BAD_REQUEST,
        RouterError::TaskParsing(InferenceError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        RouterError::TaskParsing(_) => StatusCode::BAD_GATEWAY,
        RouterError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        RouterError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Debug, Deserialize)]
pub struct ReadParams {
    pub path: String,
}

/// GET /read - return a file's contents as plain text.
async fn read_handler(
    State(state): State<AppState>,
    Query(params): Query<ReadParams>,
) -> Result<String, (StatusCode, String)> {
    let path = state.confine.resolve(&params.path).map_err(|e| {
        warn!(path = %params.path, error = %e, "read rejected");
        (StatusCode::FORBIDDEN, e.to_string())
    })?;

    tokio::fs::read_to_string(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            (StatusCode::NOT_FOUND, format!("{} not found", params.path))
        } else {
            warn!(path = %path.display(), error = %e, "read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("could not read {}", params.path))
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

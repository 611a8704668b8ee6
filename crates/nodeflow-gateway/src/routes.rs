use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use nodeflow_core::error::NodeflowError;
use nodeflow_engine::{Graph, RunReport};

use crate::middleware::Authenticated;
use crate::state::AppState;

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

// GET /api/health: no auth required
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// POST /api/run: body is a serialized graph
pub async fn run_workflow(
    _auth: Authenticated,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RunReport>, ApiError> {
    let graph = Graph::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Rejected workflow");
        api_error(StatusCode::BAD_REQUEST, e.to_string())
    })?;

    info!(nodes = graph.nodes.len(), edges = graph.edges.len(), "Workflow run requested");

    match state.engine.run(&graph).await {
        Ok(report) => Ok(Json(report)),
        Err(e @ (NodeflowError::NoTrigger | NodeflowError::InvalidGraph(_))) => {
            warn!(error = %e, "Workflow not runnable");
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e) => {
            error!(error = %e, "Error running workflow");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to run workflow",
            ))
        }
    }
}

use std::sync::Arc;

use nodeflow_core::config::GatewayConfig;
use nodeflow_engine::WorkflowEngine;

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub engine: Arc<WorkflowEngine>,
}

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use nodeflow_core::config::{AppConfig, GatewayConfig};
use nodeflow_engine::{Services, WorkflowEngine};
use nodeflow_gateway::GatewayServer;
use nodeflow_test_utils::{
    edge, graph, linear_chain, node, MockLlm, MockMailbox, RecordingMailer, RecordingSheets,
    RecordingWebhook,
};

fn services() -> Services {
    Services {
        llm: MockLlm::replying("summary"),
        chat: RecordingWebhook::new(),
        mailbox: MockMailbox::empty(),
        mailer: RecordingMailer::new(),
        sheets: RecordingSheets::new(),
    }
}

fn app(token: Option<&str>) -> Router {
    let engine = WorkflowEngine::with_services(services(), &AppConfig::default());
    let config = GatewayConfig {
        token: token.map(str::to_string),
        ..GatewayConfig::default()
    };
    GatewayServer::new(config, Arc::new(engine)).router()
}

fn run_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/run")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app(None)
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn run_returns_report() {
    let response = app(None)
        .oneshot(run_request(linear_chain().to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Workflow execution complete");
    assert_eq!(body["logs"][0], "Executed Webhook Listener");
    assert_eq!(body["steps"].as_array().unwrap().len(), 4);
    assert_eq!(body["steps"][1]["nodeId"], "a");
    assert!(body["finalData"]["body"].is_string());
    assert!(body["executionId"].as_str().unwrap().parse::<i64>().is_ok());
}

#[tokio::test]
async fn run_accepts_editor_shaped_nodes() {
    let payload = json!({
        "nodes": [
            { "id": "1", "type": "input", "data": { "label": "Webhook Listener", "status": "Ready" } },
            { "id": "2", "type": "default", "data": { "label": "Tag Ticket" } }
        ],
        "edges": [{ "id": "e1-2", "source": "1", "target": "2" }]
    });

    let response = app(None).oneshot(run_request(payload.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["logs"][2], "Executed Tag Ticket (No logic defined)");
}

#[tokio::test]
async fn missing_trigger_is_bad_request() {
    let payload = graph(vec![node("a", "ai_summarize")], vec![edge("a", "b")]);

    let response = app(None).oneshot(run_request(payload.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "No trigger node found" }));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let response = app(None).oneshot(run_request("{ not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid workflow:"));
}

#[tokio::test]
async fn token_is_enforced_when_configured() {
    let denied = app(Some("s3cret"))
        .oneshot(run_request(linear_chain().to_string()))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let mut request = run_request(linear_chain().to_string());
    request
        .headers_mut()
        .insert("authorization", "Bearer s3cret".parse().unwrap());
    let allowed = app(Some("s3cret")).oneshot(request).await.unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_needs_no_token() {
    let response = app(Some("s3cret"))
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

use futures::future::BoxFuture;

use nodeflow_core::error::Result;

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::graph::Node;
use crate::log::RunLog;

/// Body seeded by the webhook trigger. There is no inbound payload capture.
pub const SAMPLE_PAYLOAD: &str = "This is a sample email from a client complaining about a bug.";

pub struct WebhookHandler;

impl NodeHandler for WebhookHandler {
    fn name(&self) -> &str {
        "Webhook"
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a mut ExecutionContext,
        log: &'a mut RunLog,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Some(path) = node.setting("routePath") {
                tracing::debug!(node_id = %node.id, route = path, "Webhook route (display only)");
            }
            // The trigger starts the data flow over, even when re-entered.
            *ctx = ExecutionContext::new();
            ctx.body = Some(SAMPLE_PAYLOAD.to_string());
            log.push("Executed Webhook Listener");
            log.push(format!("Received payload: \"{}\"", SAMPLE_PAYLOAD));
            Ok(())
        })
    }
}

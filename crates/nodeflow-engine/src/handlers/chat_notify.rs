use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tracing::info;

use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::ChatWebhook;

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::graph::Node;
use crate::log::RunLog;

pub const NO_CONTENT: &str = "No content provided";

/// Sink that posts a message to a chat webhook.
pub struct ChatNotifyHandler {
    chat: Arc<dyn ChatWebhook>,
}

impl ChatNotifyHandler {
    pub fn new(chat: Arc<dyn ChatWebhook>) -> Self {
        Self { chat }
    }
}

/// Build the request body for a message.
///
/// Text that looks like a JSON object carrying `embeds` or `content` is sent
/// as-is; anything else is wrapped as `{"content": text}`.
pub fn build_payload(content: &str) -> Value {
    if content.trim_start().starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<Value>(content.trim()) {
            if is_truthy(parsed.get("embeds")) || is_truthy(parsed.get("content")) {
                return parsed;
            }
        }
    }
    json!({ "content": content })
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

impl NodeHandler for ChatNotifyHandler {
    fn name(&self) -> &str {
        "Discord"
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a mut ExecutionContext,
        log: &'a mut RunLog,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log.push("Executing Discord Node");

            let url = node
                .setting("webhookUrl")
                .ok_or_else(|| NodeflowError::missing("Discord Webhook URL is missing"))?;
            let content = node
                .setting("messageContent")
                .or_else(|| ctx.text("summary"))
                .unwrap_or(NO_CONTENT);

            let payload = build_payload(content);
            log.push("Sending to Discord Webhook...");
            self.chat.deliver(url, payload).await?;

            info!(node_id = %node.id, "Chat message delivered");
            log.push("Discord Message Sent Successfully");
            Ok(())
        })
    }
}

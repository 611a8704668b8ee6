pub mod gemini;
pub mod retry;
pub mod streaming;

use std::sync::Arc;

use futures::StreamExt;
use tracing::debug;

use nodeflow_core::config::ModelConfig;
use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::LlmClient;
use nodeflow_core::types::{ChatMessage, StreamDelta};

pub use gemini::GeminiClient;
pub use retry::RetryingClient;

/// Create an LLM client for the configured provider, wrapped in a
/// [`RetryingClient`] when `[ai.retry]` is set.
pub fn create_client(config: &ModelConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Box<dyn LlmClient> = match config.provider.as_str() {
        "gemini" | "google" => Box::new(GeminiClient::new()),
        other => return Err(NodeflowError::UnsupportedProvider(other.to_string())),
    };

    Ok(match &config.retry {
        Some(retry) => Arc::new(RetryingClient::new(client, retry.clone())),
        None => Arc::from(client),
    })
}

/// Run one generation request and concatenate the streamed text.
pub async fn generate_text(
    client: &dyn LlmClient,
    config: &ModelConfig,
    messages: Vec<ChatMessage>,
) -> Result<String> {
    let mut stream = client.chat_stream(config, messages).await?;
    let mut text = String::new();

    while let Some(delta) = stream.next().await {
        match delta? {
            StreamDelta::TextDelta(chunk) => text.push_str(&chunk),
            StreamDelta::Stop(reason) => debug!(?reason, "Generation stopped"),
            StreamDelta::Usage {
                input_tokens,
                output_tokens,
            } => debug!(input_tokens, output_tokens, "Generation usage"),
        }
    }

    if text.is_empty() {
        return Err(NodeflowError::EmptyResponse);
    }
    Ok(text)
}

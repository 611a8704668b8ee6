use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use nodeflow_core::config::ModelConfig;
use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::LlmClient;
use nodeflow_core::types::*;

use crate::streaming::{SseEvent, SseStream};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini native API client.
pub struct GeminiClient {
    http: Client,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    /// List the models the configured key may call, with whether each
    /// supports `generateContent`.
    pub async fn list_models(&self, config: &ModelConfig) -> Result<Vec<ModelInfo>> {
        let api_key = config
            .api_key()
            .ok_or_else(|| NodeflowError::Config("Gemini: api_key is required".into()))?;

        let url = format!("{}/models", base_url(config));
        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(request_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(NodeflowError::LlmRequest(format!("HTTP {}: {}", status, body)));
        }

        let listing: ModelListing = response.json().await.map_err(request_err)?;

        Ok(listing.models.into_iter().map(ModelInfo::from).collect())
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

fn base_url(config: &ModelConfig) -> &str {
    config
        .base_url
        .as_deref()
        .unwrap_or(DEFAULT_BASE_URL)
        .trim_end_matches('/')
}

/// Transport errors carry the request URL in their text; drop it so the
/// message is safe to surface in run reports.
fn request_err(e: reqwest::Error) -> NodeflowError {
    NodeflowError::LlmRequest(e.without_url().to_string())
}

// ── Request types ────────────────────────────────────────────────

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Debug)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Debug)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// ── Response types ───────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct GeminiStreamChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiUsage {
    #[serde(default, rename = "promptTokenCount")]
    prompt_token_count: u64,
    #[serde(default, rename = "candidatesTokenCount")]
    candidates_token_count: u64,
}

#[derive(Deserialize, Debug)]
struct ModelListing {
    #[serde(default)]
    models: Vec<ListedModel>,
}

#[derive(Deserialize, Debug)]
struct ListedModel {
    name: String,
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
    #[serde(default, rename = "supportedGenerationMethods")]
    supported_generation_methods: Vec<String>,
}

impl From<ListedModel> for ModelInfo {
    fn from(m: ListedModel) -> Self {
        Self {
            name: m
                .name
                .strip_prefix("models/")
                .unwrap_or(&m.name)
                .to_string(),
            display_name: m.display_name,
            supports_generate: m
                .supported_generation_methods
                .iter()
                .any(|g| g == "generateContent"),
        }
    }
}

// ── Conversion ───────────────────────────────────────────────────

fn convert_messages(messages: Vec<ChatMessage>) -> (Option<GeminiContent>, Vec<GeminiContent>) {
    let mut system = None;
    let mut contents = Vec::new();

    for msg in messages {
        let part = GeminiPart { text: msg.text };
        match msg.role {
            Role::System => {
                system = Some(GeminiContent {
                    role: None,
                    parts: vec![part],
                });
            }
            Role::User => contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: vec![part],
            }),
            Role::Assistant => contents.push(GeminiContent {
                role: Some("model".to_string()),
                parts: vec![part],
            }),
        }
    }

    (system, contents)
}

fn parse_gemini_chunk(event: SseEvent) -> Option<Result<StreamDelta>> {
    if event.data.trim() == "[DONE]" {
        return None;
    }

    let parsed: std::result::Result<GeminiStreamChunk, _> = serde_json::from_str(&event.data);
    match parsed {
        Ok(chunk) => {
            let candidate = chunk.candidates.into_iter().next();

            // Text and the finish reason may share the final chunk; text wins
            // and the stream simply ends afterwards.
            if let Some(content) = candidate.as_ref().and_then(|c| c.content.as_ref()) {
                let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
                if !text.is_empty() {
                    return Some(Ok(StreamDelta::TextDelta(text)));
                }
            }

            if let Some(reason) = candidate.and_then(|c| c.finish_reason) {
                let stop = match reason.as_str() {
                    "MAX_TOKENS" => StopReason::MaxTokens,
                    "SAFETY" => StopReason::Safety,
                    _ => StopReason::EndTurn,
                };
                return Some(Ok(StreamDelta::Stop(stop)));
            }

            chunk.usage_metadata.map(|usage| {
                Ok(StreamDelta::Usage {
                    input_tokens: usage.prompt_token_count,
                    output_tokens: usage.candidates_token_count,
                })
            })
        }
        Err(e) => {
            warn!(data = %event.data, error = %e, "Failed to parse Gemini SSE chunk");
            None
        }
    }
}

impl LlmClient for GeminiClient {
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        let config = config.clone();

        Box::pin(async move {
            let api_key = config
                .api_key()
                .ok_or_else(|| NodeflowError::Config("Gemini: api_key is required".into()))?;

            let url = format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                base_url(&config),
                config.model_id
            );

            let (system_instruction, contents) = convert_messages(messages);

            let body = GeminiRequest {
                contents,
                system_instruction,
                generation_config: Some(GenerationConfig {
                    max_output_tokens: Some(config.max_tokens),
                    temperature: if config.temperature > 0.0 {
                        Some(config.temperature)
                    } else {
                        None
                    },
                }),
            };

            let response = self
                .http
                .post(&url)
                .header(API_KEY_HEADER, api_key)
                .json(&body)
                .send()
                .await
                .map_err(request_err)?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());
                return Err(NodeflowError::LlmRequest(format!("HTTP {}: {}", status, body)));
            }

            let byte_stream = response.bytes_stream();
            let sse_stream = SseStream::new(byte_stream);

            let delta_stream =
                sse_stream.filter_map(|event| async move { parse_gemini_chunk(event) });

            Ok(Box::pin(delta_stream) as BoxStream<'_, Result<StreamDelta>>)
        })
    }
}

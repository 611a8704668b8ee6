use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use nodeflow_core::config::ModelConfig;
use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::LlmClient;
use nodeflow_core::types::ChatMessage;

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::graph::Node;
use crate::log::RunLog;

pub const DEFAULT_INSTRUCTION: &str = "Summarize this text.";
const NO_INPUT: &str = "No input data provided.";
const PREVIEW_CHARS: usize = 100;

/// Transform that writes generated text to `summary`.
pub struct AiSummarizeHandler {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
}

impl AiSummarizeHandler {
    pub fn new(llm: Arc<dyn LlmClient>, config: ModelConfig) -> Self {
        Self { llm, config }
    }
}

/// Instruction followed by whichever of `from`, `subject` and `body` are set.
pub fn build_prompt(instruction: &str, ctx: &ExecutionContext) -> String {
    let fields = [("From", &ctx.from), ("Subject", &ctx.subject), ("Body", &ctx.body)];
    let input: Vec<String> = fields
        .iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}: {}", label, v))
        })
        .collect();

    let input = if input.is_empty() {
        NO_INPUT.to_string()
    } else {
        input.join("\n")
    };
    format!("{}\n\nInput Data:\n{}", instruction, input)
}

/// First `max` characters, with `...` appended only when something was cut.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl NodeHandler for AiSummarizeHandler {
    fn name(&self) -> &str {
        "AI"
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a mut ExecutionContext,
        log: &'a mut RunLog,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log.push(format!("Processing with AI Model: {}", self.config.model_id));

            if self.config.api_key().is_none() {
                return Err(NodeflowError::missing(
                    "Missing GEMINI_API_KEY environment variable",
                ));
            }

            let instruction = node.setting("systemPrompt").unwrap_or(DEFAULT_INSTRUCTION);
            let prompt = build_prompt(instruction, ctx);
            let response = nodeflow_llm::generate_text(
                self.llm.as_ref(),
                &self.config,
                vec![ChatMessage::user(prompt)],
            )
            .await?;

            info!(node_id = %node.id, chars = response.chars().count(), "AI response received");
            log.push("Executed AI Agent");
            log.push(format!("AI Response: \"{}\"", preview(&response, PREVIEW_CHARS)));
            ctx.summary = Some(response);
            Ok(())
        })
    }
}

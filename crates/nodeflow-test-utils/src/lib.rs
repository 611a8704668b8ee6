//! Mocks for every outbound collaborator plus graph fixtures.
//!
//! Each mock records what it was asked to do behind a `Mutex` so tests can
//! assert on the exact payloads a handler produced.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use serde_json::{json, Value};

use nodeflow_core::config::ModelConfig;
use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::{ChatWebhook, LlmClient, MailTransport, MailboxReader, SheetsClient};
use nodeflow_core::types::*;

// ── LLM ─────────────────────────────────────────────────────────

/// Replies with a fixed text (streamed in two chunks) or a fixed error.
pub struct MockLlm {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn replying(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Every user prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LlmClient for MockLlm {
    fn chat_stream(
        &self,
        _config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>> {
        let prompt = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.text.clone())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt);

        let reply = self.reply.clone();
        Box::pin(async move {
            let text = reply.map_err(NodeflowError::LlmRequest)?;
            let mid = text
                .char_indices()
                .nth(text.chars().count() / 2)
                .map(|(i, _)| i)
                .unwrap_or(0);
            let (a, b) = text.split_at(mid);
            let deltas = vec![
                Ok(StreamDelta::TextDelta(a.to_string())),
                Ok(StreamDelta::TextDelta(b.to_string())),
                Ok(StreamDelta::Stop(StopReason::EndTurn)),
            ];
            Ok(Box::pin(stream::iter(deltas)) as BoxStream<'_, Result<StreamDelta>>)
        })
    }
}

// ── Chat webhook ────────────────────────────────────────────────

/// Records `(url, payload)` pairs; optionally answers with an HTTP error.
#[derive(Default)]
pub struct RecordingWebhook {
    fail_status: Option<u16>,
    sent: Mutex<Vec<(String, Value)>>,
}

impl RecordingWebhook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_with(status: u16) -> Arc<Self> {
        Arc::new(Self {
            fail_status: Some(status),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }
}

impl ChatWebhook for RecordingWebhook {
    fn deliver(&self, url: &str, payload: Value) -> BoxFuture<'_, Result<()>> {
        self.sent.lock().unwrap().push((url.to_string(), payload));
        let fail = self.fail_status;
        Box::pin(async move {
            match fail {
                Some(status) => Err(NodeflowError::channel(
                    "webhook",
                    format!("responded with {}", status),
                )),
                None => Ok(()),
            }
        })
    }
}

// ── Mailbox ─────────────────────────────────────────────────────

/// Hands out queued messages newest-first; an empty queue means no unseen mail.
#[derive(Default)]
pub struct MockMailbox {
    unseen: Mutex<VecDeque<FetchedEmail>>,
    error: Option<String>,
    polls: Mutex<Vec<String>>,
}

impl MockMailbox {
    pub fn with_messages(messages: Vec<FetchedEmail>) -> Arc<Self> {
        Arc::new(Self {
            unseen: Mutex::new(messages.into()),
            ..Self::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn unreachable(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            error: Some(message.into()),
            ..Self::default()
        })
    }

    /// Mailbox names polled, in order.
    pub fn polls(&self) -> Vec<String> {
        self.polls.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.unseen.lock().unwrap().len()
    }
}

impl MailboxReader for MockMailbox {
    fn fetch_latest_unseen(&self, mailbox: &str) -> BoxFuture<'_, Result<Option<FetchedEmail>>> {
        self.polls.lock().unwrap().push(mailbox.to_string());
        let result = match &self.error {
            Some(msg) => Err(NodeflowError::Mailbox(msg.clone())),
            // Taking the message marks it seen.
            None => Ok(self.unseen.lock().unwrap().pop_front()),
        };
        Box::pin(async move { result })
    }
}

pub fn email(subject: &str, from: &str, body: &str) -> FetchedEmail {
    FetchedEmail {
        subject: subject.to_string(),
        from: from.to_string(),
        body: body.to_string(),
    }
}

// ── Mail transport ──────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingMailer {
    fail: Option<String>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            fail: Some(message.into()),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl MailTransport for RecordingMailer {
    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, Result<String>> {
        let result = match &self.fail {
            Some(msg) => Err(NodeflowError::MailTransport(msg.clone())),
            None => {
                let mut sent = self.sent.lock().unwrap();
                sent.push(email);
                Ok(format!("<mock-{}@nodeflow.test>", sent.len()))
            }
        };
        Box::pin(async move { result })
    }
}

// ── Spreadsheet ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSheets {
    fail: Option<String>,
    requests: Mutex<Vec<AppendRequest>>,
}

impl RecordingSheets {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            fail: Some(message.into()),
            ..Self::default()
        })
    }

    pub fn requests(&self) -> Vec<AppendRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SheetsClient for RecordingSheets {
    fn append_rows(&self, request: AppendRequest) -> BoxFuture<'_, Result<AppendOutcome>> {
        let outcome = AppendOutcome {
            updated_range: Some(format!("{} (appended)", request.range)),
            updated_rows: request.rows.len() as u64,
        };
        self.requests.lock().unwrap().push(request);
        let result = match &self.fail {
            Some(msg) => Err(NodeflowError::Spreadsheet(msg.clone())),
            None => Ok(outcome),
        };
        Box::pin(async move { result })
    }
}

// ── Graph fixtures ──────────────────────────────────────────────

/// A node in the inbound wire format.
pub fn node(id: &str, kind: &str) -> Value {
    json!({ "id": id, "kind": kind })
}

/// A node with configuration fields.
pub fn node_with(id: &str, kind: &str, config: Value) -> Value {
    json!({ "id": id, "kind": kind, "config": config })
}

pub fn edge(source: &str, target: &str) -> Value {
    json!({ "source": source, "target": target })
}

pub fn graph(nodes: Vec<Value>, edges: Vec<Value>) -> Value {
    json!({ "nodes": nodes, "edges": edges })
}

/// trigger → a → b → c, where a/b/c carry an unhandled kind.
pub fn linear_chain() -> Value {
    graph(
        vec![
            node("t", "webhook"),
            node("a", "step_a"),
            node("b", "step_b"),
            node("c", "step_c"),
        ],
        vec![edge("t", "a"), edge("a", "b"), edge("b", "c")],
    )
}

/// trigger → a → b → a ... (never terminates on its own).
pub fn cyclic() -> Value {
    graph(
        vec![node("t", "webhook"), node("a", "loop_a"), node("b", "loop_b")],
        vec![edge("t", "a"), edge("a", "b"), edge("b", "a")],
    )
}

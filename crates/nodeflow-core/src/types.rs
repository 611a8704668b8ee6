use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role in a text-generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message sent to the text-generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// Stop reason from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Safety,
}

/// A streaming delta from the LLM.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// A chunk of text content.
    TextDelta(String),

    /// The response is complete.
    Stop(StopReason),

    /// Usage information.
    Usage {
        input_tokens: u64,
        output_tokens: u64,
    },
}

/// A model advertised by the text-generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supports_generate: bool,
}

/// The newest unread message pulled from a mailbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedEmail {
    pub subject: String,
    pub from: String,
    pub body: String,
}

/// A message handed to the mail transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// A row append against a spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendRequest {
    pub sheet_id: String,
    pub range: String,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Service-account key file, if one was resolved.
    pub credentials: Option<PathBuf>,
}

/// What the spreadsheet service reported after an append.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppendOutcome {
    pub updated_range: Option<String>,
    pub updated_rows: u64,
}

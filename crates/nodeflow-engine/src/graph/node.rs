use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The semantic kind of a node.
///
/// Closed set of handled kinds; anything else is carried as `Other` and
/// dispatched to the pass-through handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    /// Trigger: seeds a fixed sample payload.
    Webhook,
    /// Trigger: pulls the newest unread email.
    EmailPoll,
    /// Transform: text generation into `summary`.
    AiSummarize,
    /// Sink: chat webhook message.
    ChatNotify,
    /// Sink: spreadsheet row append.
    SheetAppend,
    /// Sink: outgoing email.
    EmailSend,
    /// Anything unrecognised.
    Other(String),
}

impl NodeKind {
    /// Canonical wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Webhook => "webhook",
            Self::EmailPoll => "email_poll",
            Self::AiSummarize => "ai_summarize",
            Self::ChatNotify => "chat_notify",
            Self::SheetAppend => "sheet_append",
            Self::EmailSend => "email_send",
            Self::Other(name) => name,
        }
    }

    /// Default human-readable label.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Webhook => "Webhook Listener",
            Self::EmailPoll => "Email Trigger",
            Self::AiSummarize => "AI Summarizer",
            Self::ChatNotify => "Discord Node",
            Self::SheetAppend => "Sheet Append",
            Self::EmailSend => "Email Sender",
            Self::Other(name) => name,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Webhook | Self::EmailPoll)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Resolve a canonical name or an editor label/type through the one
    /// alias table. Matching ignores case and surrounding whitespace.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "webhook" | "webhook listener" | "webhook trigger" => Self::Webhook,
            "email_poll" | "email poll" | "email trigger" | "gmail trigger" | "gmailtrigger"
            | "inbox poll" => Self::EmailPoll,
            "ai_summarize" | "ai agent" | "ai summarizer" | "ai" => Self::AiSummarize,
            "chat_notify" | "discord" | "discord node" | "chat notify" => Self::ChatNotify,
            "sheet_append" | "google sheets" | "googlesheets" | "sheet append" | "sheets" => {
                Self::SheetAppend
            }
            "email_send" | "email" | "email sender" | "send email" => Self::EmailSend,
            _ => Self::Other(label.trim().to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        Self::from_label(&s)
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct Node {
    /// Unique identifier for this node.
    pub id: String,
    pub kind: NodeKind,
    /// Human-readable name, used in log lines.
    pub label: String,
    /// Free-form settings from the editor.
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
}

/// Accepted inbound shapes: `{id, kind?, label?, config?}` or the editor's
/// `{id, type, data: {label, ...settings}}`.
#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default, rename = "type")]
    node_type: Option<String>,
    #[serde(default)]
    config: BTreeMap<String, Value>,
    #[serde(default)]
    data: BTreeMap<String, Value>,
}

impl TryFrom<RawNode> for Node {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err("node id must not be empty".to_string());
        }

        let mut config = raw.data;
        let data_label = config
            .remove("label")
            .and_then(|v| v.as_str().map(str::to_string));
        // Editor display state, not configuration.
        config.remove("status");
        config.extend(raw.config);

        let label = raw.label.or(data_label).filter(|l| !l.trim().is_empty());

        let kind = if let Some(kind) = raw.kind.filter(|k| !k.trim().is_empty()) {
            NodeKind::from_label(&kind)
        } else {
            let by_label = label.as_deref().map(NodeKind::from_label);
            let by_type = raw.node_type.as_deref().map(NodeKind::from_label);
            match (by_label, by_type) {
                (Some(k), _) if k.is_known() => k,
                (_, Some(k)) if k.is_known() => k,
                (Some(k), _) => k,
                (None, Some(k)) => k,
                (None, None) => {
                    return Err(format!("node '{}' has neither a kind nor a label", raw.id))
                }
            }
        };

        let label = label.unwrap_or_else(|| kind.display_name().to_string());

        Ok(Node {
            id: raw.id,
            kind,
            label,
            config,
        })
    }
}

impl Node {
    /// Create a node with no configuration.
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let label = kind.display_name().to_string();
        Self {
            id: id.into(),
            kind,
            label,
            config: BTreeMap::new(),
        }
    }

    /// Set a string setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), Value::String(value.into()));
        self
    }

    /// A string setting; empty strings count as unset.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_kinds_roundtrip_names() {
        for kind in [
            NodeKind::Webhook,
            NodeKind::EmailPoll,
            NodeKind::AiSummarize,
            NodeKind::ChatNotify,
            NodeKind::SheetAppend,
            NodeKind::EmailSend,
        ] {
            assert_eq!(NodeKind::from_label(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_editor_aliases() {
        assert_eq!(NodeKind::from_label("Webhook Listener"), NodeKind::Webhook);
        assert_eq!(NodeKind::from_label("AI Agent"), NodeKind::AiSummarize);
        assert_eq!(NodeKind::from_label("Discord Node"), NodeKind::ChatNotify);
        assert_eq!(NodeKind::from_label("googleSheets"), NodeKind::SheetAppend);
        assert_eq!(NodeKind::from_label("gmailTrigger"), NodeKind::EmailPoll);
        assert_eq!(
            NodeKind::from_label("  Custom Step "),
            NodeKind::Other("Custom Step".into())
        );
    }

    #[test]
    fn test_trigger_kinds() {
        assert!(NodeKind::Webhook.is_trigger());
        assert!(NodeKind::EmailPoll.is_trigger());
        assert!(!NodeKind::AiSummarize.is_trigger());
        assert!(!NodeKind::Other("webhooks".into()).is_trigger());
    }

    #[test]
    fn test_deserialize_canonical_shape() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1",
            "kind": "chat_notify",
            "config": { "webhookUrl": "https://chat.example/hook", "silent": true }
        }))
        .unwrap();
        assert_eq!(node.kind, NodeKind::ChatNotify);
        assert_eq!(node.label, "Discord Node");
        assert_eq!(node.setting("webhookUrl"), Some("https://chat.example/hook"));
        assert_eq!(node.setting("silent"), None);
    }

    #[test]
    fn test_deserialize_editor_shape() {
        let node: Node = serde_json::from_value(json!({
            "id": "2",
            "type": "process",
            "data": { "label": "AI Summarizer", "status": "Ready", "systemPrompt": "Be terse." }
        }))
        .unwrap();
        assert_eq!(node.kind, NodeKind::AiSummarize);
        assert_eq!(node.label, "AI Summarizer");
        assert_eq!(node.setting("systemPrompt"), Some("Be terse."));
        assert!(!node.config.contains_key("status"));
        assert!(!node.config.contains_key("label"));
    }

    #[test]
    fn test_editor_type_used_when_label_is_free_text() {
        let node: Node = serde_json::from_value(json!({
            "id": "3",
            "type": "discord",
            "data": { "label": "Ping the team" }
        }))
        .unwrap();
        assert_eq!(node.kind, NodeKind::ChatNotify);
        assert_eq!(node.label, "Ping the team");
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let node: Node = serde_json::from_value(json!({ "id": "x", "kind": "translate" })).unwrap();
        assert_eq!(node.kind, NodeKind::Other("translate".into()));
        assert_eq!(node.label, "translate");
    }

    #[test]
    fn test_node_without_kind_or_label_rejected() {
        let err = serde_json::from_value::<Node>(json!({ "id": "x" })).unwrap_err();
        assert!(err.to_string().contains("neither a kind nor a label"));
    }

    #[test]
    fn test_empty_setting_counts_as_unset() {
        let node = Node::new("n", NodeKind::EmailSend).with_setting("emailBody", "");
        assert_eq!(node.setting("emailBody"), None);
    }
}

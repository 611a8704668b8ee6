use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shared state threaded through every node of one run.
///
/// The conventional fields are typed; anything else a handler wants to pass
/// downstream goes in `extra`. Serializes as one flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn named(&self, key: &str) -> Option<&Option<String>> {
        match key {
            "body" => Some(&self.body),
            "subject" => Some(&self.subject),
            "from" => Some(&self.from),
            "summary" => Some(&self.summary),
            "error" => Some(&self.error),
            _ => None,
        }
    }

    fn named_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "body" => Some(&mut self.body),
            "subject" => Some(&mut self.subject),
            "from" => Some(&mut self.from),
            "summary" => Some(&mut self.summary),
            "error" => Some(&mut self.error),
            _ => None,
        }
    }

    /// Get a value by key, typed field or extension.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.named(key) {
            Some(field) => field.clone().map(Value::String),
            None => self.extra.get(key).cloned(),
        }
    }

    /// Get a value as a string, if it's a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.named(key) {
            Some(field) => field.as_deref(),
            None => self.extra.get(key).and_then(Value::as_str),
        }
    }

    /// A non-empty string value.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get_str(key).filter(|s| !s.is_empty())
    }

    /// Set a value. Non-string values under a typed key are stored as their
    /// JSON text.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(field) = self.named_mut(&key) {
            *field = match value {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            };
        } else {
            self.extra.insert(key, value);
        }
    }

    /// Set a string value.
    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, Value::String(value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_none()
            && self.subject.is_none()
            && self.from.is_none()
            && self.summary.is_none()
            && self.error.is_none()
            && self.extra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_operations() {
        let mut ctx = ExecutionContext::new();
        ctx.set_str("body", "hello");
        ctx.set("ticket", json!(42));

        assert_eq!(ctx.body.as_deref(), Some("hello"));
        assert_eq!(ctx.get_str("body"), Some("hello"));
        assert_eq!(ctx.get("ticket"), Some(json!(42)));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_overwrite_and_clear_typed_field() {
        let mut ctx = ExecutionContext::new();
        ctx.set_str("summary", "first");
        ctx.set_str("summary", "second");
        assert_eq!(ctx.summary.as_deref(), Some("second"));

        ctx.set("summary", Value::Null);
        assert!(ctx.summary.is_none());
    }

    #[test]
    fn test_text_skips_empty() {
        let mut ctx = ExecutionContext::new();
        ctx.set_str("summary", "");
        assert_eq!(ctx.get_str("summary"), Some(""));
        assert_eq!(ctx.text("summary"), None);
    }

    #[test]
    fn test_serializes_flat() {
        let mut ctx = ExecutionContext::new();
        ctx.body = Some("payload".into());
        ctx.set("priority", json!("high"));

        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value, json!({ "body": "payload", "priority": "high" }));
    }

    #[test]
    fn test_new_is_empty() {
        assert!(ExecutionContext::new().is_empty());
        assert_eq!(serde_json::to_value(ExecutionContext::new()).unwrap(), json!({}));
    }
}

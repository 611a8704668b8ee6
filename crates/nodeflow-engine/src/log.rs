use serde::{Deserialize, Serialize};
use tracing::debug;

/// Append-only, user-facing audit trail of one run.
///
/// Handlers only ever write to it. Each line is mirrored to `tracing` at
/// debug level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLog(Vec<String>);

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!(target: "nodeflow::run_log", "{}", line);
        self.0.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|l| l.contains(needle))
    }

    pub fn into_lines(self) -> Vec<String> {
        self.0
    }
}

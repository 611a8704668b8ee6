use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::*;

/// Text-generation client: streaming.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a generation request and receive a stream of deltas.
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;
}

/// Chat webhook: delivers a JSON payload to a URL.
pub trait ChatWebhook: Send + Sync + 'static {
    /// POST `payload` to `url`. Any non-2xx status is an error.
    fn deliver(&self, url: &str, payload: serde_json::Value) -> BoxFuture<'_, Result<()>>;
}

/// Mailbox reader: IMAP-like access to unread mail.
pub trait MailboxReader: Send + Sync + 'static {
    /// Fetch the newest unseen message in `mailbox` and mark it seen.
    /// `Ok(None)` means the mailbox had no unseen messages.
    fn fetch_latest_unseen(&self, mailbox: &str) -> BoxFuture<'_, Result<Option<FetchedEmail>>>;
}

/// Mail transport: sends one message, returns its message id.
pub trait MailTransport: Send + Sync + 'static {
    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, Result<String>>;
}

/// Spreadsheet service: appends rows, never overwrites.
pub trait SheetsClient: Send + Sync + 'static {
    fn append_rows(&self, request: AppendRequest) -> BoxFuture<'_, Result<AppendOutcome>>;
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeflowError {
    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM streaming error: {0}")]
    LlmStream(String),

    #[error("LLM provider not supported: {0}")]
    UnsupportedProvider(String),

    #[error("LLM returned an empty response")]
    EmptyResponse,

    // Outbound service errors
    #[error("Channel error: {channel}: {message}")]
    Channel { channel: String, message: String },

    #[error("Mailbox error: {0}")]
    Mailbox(String),

    #[error("Mail transport error: {0}")]
    MailTransport(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Credential error: {0}")]
    Credentials(String),

    // Node configuration errors
    #[error("{0}")]
    MissingSetting(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Engine errors
    #[error("No trigger node found")]
    NoTrigger,

    #[error("Invalid workflow: {0}")]
    InvalidGraph(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NodeflowError {
    /// Shorthand for a required node setting or credential that is absent.
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingSetting(what.into())
    }

    pub fn channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel {
            channel: channel.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NodeflowError>;

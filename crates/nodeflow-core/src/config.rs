use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NodeflowError, Result};

/// Top-level Nodeflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub ai: ModelConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
}

/// Runner limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Step ceiling; the only guard against cycles.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Pause inserted between node executions.
    #[serde(default)]
    pub node_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            node_delay_ms: 0,
        }
    }
}

fn default_max_steps() -> usize { 50 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: default_model_id(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            retry: None,
        }
    }
}

impl ModelConfig {
    /// The API key, if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

fn default_provider() -> String { "gemini".to_string() }
fn default_model_id() -> String { "gemini-2.5-flash-lite".to_string() }
fn default_max_tokens() -> u32 { 2048 }
fn default_temperature() -> f32 { 0.0 }

/// Retry configuration for LLM requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

/// Mail credentials shared by the inbox poller and the sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_imap_host")]
    pub imap_host: String,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            imap_host: default_imap_host(),
            imap_port: default_imap_port(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            mailbox: default_mailbox(),
        }
    }
}

impl MailConfig {
    /// `(user, password)` when both are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.user.as_deref().filter(|s| !s.trim().is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        Some((user, password))
    }
}

fn default_imap_host() -> String { "imap.gmail.com".to_string() }
fn default_imap_port() -> u16 { 993 }
fn default_smtp_host() -> String { "smtp.gmail.com".to_string() }
fn default_smtp_port() -> u16 { 465 }
fn default_mailbox() -> String { "INBOX".to_string() }

/// Spreadsheet credential lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Local service-account key, checked first.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    /// Environment variable naming a key file, checked second.
    #[serde(default = "default_credentials_env")]
    pub credentials_env: String,
    #[serde(default = "default_range")]
    pub default_range: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
            credentials_env: default_credentials_env(),
            default_range: default_range(),
        }
    }
}

fn default_credentials_file() -> PathBuf { PathBuf::from("service-account.json") }
fn default_credentials_env() -> String { "GOOGLE_APPLICATION_CREDENTIALS".to_string() }
fn default_range() -> String { "Sheet1!A:A".to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            token: None,
        }
    }
}

fn default_bind() -> String { "127.0.0.1:3000".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| NodeflowError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| NodeflowError::Config(e.to_string()))
    }

    /// Build a config purely from the process environment.
    ///
    /// Reads `GEMINI_API_KEY`, `EMAIL_USER` and `EMAIL_PASS`; everything else
    /// keeps its default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.ai.api_key = env_non_empty("GEMINI_API_KEY");
        config.mail.user = env_non_empty("EMAIL_USER");
        config.mail.password = env_non_empty("EMAIL_PASS");
        config
    }

    /// Fill credentials left unset in the file from the environment.
    pub fn with_env_fallbacks(mut self) -> Self {
        if self.ai.api_key().is_none() {
            self.ai.api_key = env_non_empty("GEMINI_API_KEY");
        }
        if self.mail.user.is_none() {
            self.mail.user = env_non_empty("EMAIL_USER");
        }
        if self.mail.password.is_none() {
            self.mail.password = env_non_empty("EMAIL_PASS");
        }
        self
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Keep original if env var not set
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}

pub fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

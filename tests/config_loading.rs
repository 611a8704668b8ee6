use std::io::Write;

use nodeflow_core::config::AppConfig;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[engine]
max_steps = 20
node_delay_ms = 500

[ai]
provider = "gemini"
model_id = "gemini-2.5-flash"
api_key = "test-gemini-key"
max_tokens = 1024
temperature = 0.3

[ai.retry]
max_retries = 2
initial_backoff_ms = 250

[mail]
user = "bot@example.com"
password = "app-password"
imap_host = "imap.example.com"
smtp_host = "smtp.example.com"
smtp_port = 587
mailbox = "Support"

[sheets]
credentials_file = "/etc/nodeflow/sa.json"
default_range = "Tickets!A:D"

[gateway]
bind = "0.0.0.0:9999"
token = "test-token"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.engine.max_steps, 20);
    assert_eq!(config.engine.node_delay_ms, 500);
    assert_eq!(config.ai.model_id, "gemini-2.5-flash");
    assert_eq!(config.ai.api_key(), Some("test-gemini-key"));
    assert_eq!(config.ai.max_tokens, 1024);
    let retry = config.ai.retry.expect("retry present");
    assert_eq!(retry.max_retries, 2);
    assert_eq!(retry.initial_backoff_ms, 250);
    assert_eq!(retry.max_backoff_ms, 30000);

    assert_eq!(config.mail.credentials(), Some(("bot@example.com", "app-password")));
    assert_eq!(config.mail.imap_host, "imap.example.com");
    assert_eq!(config.mail.imap_port, 993);
    assert_eq!(config.mail.smtp_port, 587);
    assert_eq!(config.mail.mailbox, "Support");

    assert_eq!(
        config.sheets.credentials_file,
        std::path::PathBuf::from("/etc/nodeflow/sa.json")
    );
    assert_eq!(config.sheets.credentials_env, "GOOGLE_APPLICATION_CREDENTIALS");
    assert_eq!(config.sheets.default_range, "Tickets!A:D");

    let gw = config.gateway.expect("gateway present");
    assert_eq!(gw.bind, "0.0.0.0:9999");
    assert_eq!(gw.token.as_deref(), Some("test-token"));
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("NODEFLOW_TEST_SMTP_PASS", "expanded-secret");

    let toml_content = r#"
[mail]
user = "bot@example.com"
password = "${NODEFLOW_TEST_SMTP_PASS}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.mail.password, Some("expanded-secret".to_string()));

    std::env::remove_var("NODEFLOW_TEST_SMTP_PASS");
}

#[test]
fn test_unset_env_var_is_left_verbatim() {
    let toml_content = r#"
[gateway]
token = "${NODEFLOW_TEST_NEVER_SET_TOKEN}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(
        config.gateway.unwrap().token.as_deref(),
        Some("${NODEFLOW_TEST_NEVER_SET_TOKEN}")
    );
}

#[test]
fn test_empty_config_uses_defaults() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"").expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.engine.max_steps, 50);
    assert_eq!(config.engine.node_delay_ms, 0);
    assert_eq!(config.ai.provider, "gemini");
    assert_eq!(config.ai.model_id, "gemini-2.5-flash-lite");
    assert!(config.ai.retry.is_none());
    assert_eq!(config.mail.imap_host, "imap.gmail.com");
    assert_eq!(config.mail.smtp_host, "smtp.gmail.com");
    assert_eq!(config.mail.smtp_port, 465);
    assert_eq!(config.mail.mailbox, "INBOX");
    assert_eq!(config.sheets.default_range, "Sheet1!A:A");
    assert!(config.gateway.is_none());
}

#[test]
fn test_missing_file_is_reported() {
    let err = AppConfig::load(std::path::Path::new("/nonexistent/nodeflow.toml")).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn test_malformed_toml_is_a_config_error() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[engine\nmax_steps = ").expect("write toml");

    let err = AppConfig::load(tmp.path()).unwrap_err();
    assert!(err.to_string().starts_with("Config error"));
}

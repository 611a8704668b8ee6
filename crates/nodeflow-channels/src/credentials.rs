use std::path::{Path, PathBuf};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use nodeflow_core::config::SheetsConfig;
use nodeflow_core::error::{NodeflowError, Result};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Where a service-account key was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    LocalFile(PathBuf),
    Environment(PathBuf),
}

impl CredentialSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::LocalFile(p) | Self::Environment(p) => p,
        }
    }
}

/// Resolve the service-account key: the local file first, then the path
/// named by the configured environment variable.
pub fn resolve_service_account(config: &SheetsConfig) -> Option<CredentialSource> {
    if config.credentials_file.is_file() {
        return Some(CredentialSource::LocalFile(config.credentials_file.clone()));
    }
    std::env::var(&config.credentials_env)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| CredentialSource::Environment(PathBuf::from(v)))
}

/// The parts of a service-account key file we use.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NodeflowError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            NodeflowError::Credentials(format!("invalid key file {}: {}", path.display(), e))
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Sign the JWT assertion for the OAuth2 jwt-bearer grant.
fn signed_assertion(key: &ServiceAccountKey, scope: &str, now: i64) -> Result<String> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| NodeflowError::Credentials(format!("invalid private key: {}", e)))?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| NodeflowError::Credentials(e.to_string()))
}

/// Exchange a service-account key for a short-lived access token.
pub async fn fetch_access_token(http: &Client, key_path: &Path, scope: &str) -> Result<String> {
    let key = ServiceAccountKey::load(key_path)?;
    let assertion = signed_assertion(&key, scope, chrono::Utc::now().timestamp())?;

    let response = http
        .post(&key.token_uri)
        .form(&[
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ])
        .send()
        .await
        .map_err(|e| NodeflowError::Credentials(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(NodeflowError::Credentials(format!(
            "token exchange failed with {}: {}",
            status, body
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| NodeflowError::Credentials(e.to_string()))?;
    debug!(account = %key.client_email, "Obtained access token");
    Ok(token.access_token)
}

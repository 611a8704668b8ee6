use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::SheetsClient;
use nodeflow_core::types::{AppendOutcome, AppendRequest};

use crate::credentials::{fetch_access_token, SHEETS_SCOPE};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Google Sheets `values.append` client.
pub struct GoogleSheetsClient {
    http: Client,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the append URL. Rows are always inserted, never overwritten.
    pub fn append_url(&self, sheet_id: &str, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.base_url,
            urlencoding::encode(sheet_id),
            urlencoding::encode(range)
        )
    }
}

impl Default for GoogleSheetsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize, Default)]
struct AppendResponse {
    #[serde(default)]
    updates: Option<AppendUpdates>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    #[serde(default)]
    updated_range: Option<String>,
    #[serde(default)]
    updated_rows: u64,
}

impl SheetsClient for GoogleSheetsClient {
    fn append_rows(&self, request: AppendRequest) -> BoxFuture<'_, Result<AppendOutcome>> {
        Box::pin(async move {
            let token = match &request.credentials {
                Some(path) => Some(fetch_access_token(&self.http, path, SHEETS_SCOPE).await?),
                None => {
                    warn!(sheet_id = %request.sheet_id, "Appending without credentials");
                    None
                }
            };

            let url = self.append_url(&request.sheet_id, &request.range);
            let mut req = self
                .http
                .post(&url)
                .json(&serde_json::json!({ "values": request.rows }));
            if let Some(token) = token {
                req = req.bearer_auth(token);
            }

            let response = req
                .send()
                .await
                .map_err(|e| NodeflowError::Spreadsheet(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(NodeflowError::Spreadsheet(format!("HTTP {}: {}", status, body)));
            }

            let parsed: AppendResponse = response.json().await.unwrap_or_default();
            let updates = parsed.updates.unwrap_or_default();
            debug!(range = ?updates.updated_range, rows = updates.updated_rows, "Rows appended");

            Ok(AppendOutcome {
                updated_range: updates.updated_range,
                updated_rows: updates.updated_rows,
            })
        })
    }
}

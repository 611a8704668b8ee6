use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{info, warn};

use nodeflow_channels::credentials::resolve_service_account;
use nodeflow_core::config::SheetsConfig;
use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::SheetsClient;
use nodeflow_core::types::AppendRequest;

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::graph::Node;
use crate::log::RunLog;

/// Sink that appends a row to a spreadsheet.
pub struct SheetAppendHandler {
    sheets: Arc<dyn SheetsClient>,
    config: SheetsConfig,
}

impl SheetAppendHandler {
    pub fn new(sheets: Arc<dyn SheetsClient>, config: SheetsConfig) -> Self {
        Self { sheets, config }
    }
}

/// Turn a value source into rows.
///
/// A JSON array literal is parsed (the raw text becomes the only cell if that
/// fails), comma-separated text is split and trimmed, anything else is one
/// cell. A flat result becomes a single row; an array of arrays is taken as
/// rows already.
pub fn parse_rows(source: &str) -> Vec<Vec<Value>> {
    let trimmed = source.trim();
    let cells: Vec<Value> = if trimmed.starts_with('[') {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Array(items)) => items,
            Ok(other) => vec![other],
            Err(_) => vec![Value::String(source.to_string())],
        }
    } else if source.contains(',') {
        source
            .split(',')
            .map(|s| Value::String(s.trim().to_string()))
            .collect()
    } else {
        vec![Value::String(source.to_string())]
    };

    if !cells.is_empty() && cells.iter().all(Value::is_array) {
        cells
            .into_iter()
            .filter_map(|row| match row {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .collect()
    } else {
        vec![cells]
    }
}

impl NodeHandler for SheetAppendHandler {
    fn name(&self) -> &str {
        "Google Sheets"
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a mut ExecutionContext,
        log: &'a mut RunLog,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let sheet_id = node
                .setting("sheetId")
                .ok_or_else(|| NodeflowError::missing("Google Sheet ID is missing"))?;
            let range = node.setting("range").unwrap_or(self.config.default_range.as_str());
            let source = node
                .setting("values")
                .or_else(|| ctx.text("summary"))
                .unwrap_or("");
            let rows = parse_rows(source);

            let credentials = resolve_service_account(&self.config);
            match &credentials {
                Some(found) => {
                    info!(node_id = %node.id, source = ?found, "Using service-account credentials");
                }
                None => {
                    warn!(node_id = %node.id, "No spreadsheet credentials found");
                    log.push("Warning: no Google credentials found, attempting request anyway");
                }
            }

            log.push(format!("Appending to Google Sheet {} ({})", sheet_id, range));
            let outcome = self
                .sheets
                .append_rows(AppendRequest {
                    sheet_id: sheet_id.to_string(),
                    range: range.to_string(),
                    rows,
                    credentials: credentials.map(|c| c.path().to_path_buf()),
                })
                .await?;

            let target = outcome.updated_range.as_deref().unwrap_or(range);
            log.push(format!(
                "Appended {} row(s) to {}",
                outcome.updated_rows, target
            ));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use nodeflow_test_utils::RecordingSheets;
    use serde_json::json;

    fn no_credentials() -> SheetsConfig {
        SheetsConfig {
            credentials_file: "/nonexistent/service-account.json".into(),
            credentials_env: "NODEFLOW_TEST_UNSET_CREDENTIALS".into(),
            ..SheetsConfig::default()
        }
    }

    #[test]
    fn test_comma_list_is_one_row() {
        assert_eq!(parse_rows("a,b,c"), vec![vec![json!("a"), json!("b"), json!("c")]]);
        assert_eq!(parse_rows(" a , b "), vec![vec![json!("a"), json!("b")]]);
    }

    #[test]
    fn test_json_array_is_one_row() {
        assert_eq!(parse_rows(r#"["x","y"]"#), vec![vec![json!("x"), json!("y")]]);
        assert_eq!(parse_rows("[1, true]"), vec![vec![json!(1), json!(true)]]);
    }

    #[test]
    fn test_single_value_is_one_cell() {
        assert_eq!(parse_rows("solo"), vec![vec![json!("solo")]]);
        assert_eq!(parse_rows(""), vec![vec![json!("")]]);
    }

    #[test]
    fn test_nested_arrays_are_rows() {
        assert_eq!(
            parse_rows(r#"[["a",1],["b",2]]"#),
            vec![vec![json!("a"), json!(1)], vec![json!("b"), json!(2)]]
        );
    }

    #[test]
    fn test_broken_json_falls_back_to_raw_cell() {
        assert_eq!(parse_rows("[oops, x"), vec![vec![json!("[oops, x")]]);
    }

    #[tokio::test]
    async fn test_appends_summary_when_values_unset() {
        let sheets = RecordingSheets::new();
        let handler = SheetAppendHandler::new(sheets.clone(), no_credentials());
        let node = Node::new("s", NodeKind::SheetAppend).with_setting("sheetId", "sheet-123");
        let mut ctx = ExecutionContext::new();
        ctx.summary = Some("Customer reports crash".into());
        let mut log = RunLog::new();

        handler.execute(&node, &mut ctx, &mut log).await.unwrap();

        let requests = sheets.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].sheet_id, "sheet-123");
        assert_eq!(requests[0].range, "Sheet1!A:A");
        assert_eq!(requests[0].rows, vec![vec![json!("Customer reports crash")]]);
        assert!(requests[0].credentials.is_none());
        assert!(log.contains("Warning: no Google credentials found"));
        assert!(log.last().unwrap().starts_with("Appended 1 row(s)"));
    }

    #[tokio::test]
    async fn test_explicit_values_and_range() {
        let sheets = RecordingSheets::new();
        let handler = SheetAppendHandler::new(sheets.clone(), no_credentials());
        let node = Node::new("s", NodeKind::SheetAppend)
            .with_setting("sheetId", "sheet-123")
            .with_setting("range", "Log!A:C")
            .with_setting("values", "2024-01-01, bug, open");
        let mut ctx = ExecutionContext::new();
        ctx.summary = Some("ignored".into());

        handler.execute(&node, &mut ctx, &mut RunLog::new()).await.unwrap();

        let request = &sheets.requests()[0];
        assert_eq!(request.range, "Log!A:C");
        assert_eq!(
            request.rows,
            vec![vec![json!("2024-01-01"), json!("bug"), json!("open")]]
        );
    }

    #[tokio::test]
    async fn test_local_credentials_are_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("service-account.json");
        std::fs::write(&key, "{}").unwrap();
        let config = SheetsConfig {
            credentials_file: key.clone(),
            ..no_credentials()
        };
        let sheets = RecordingSheets::new();
        let handler = SheetAppendHandler::new(sheets.clone(), config);
        let node = Node::new("s", NodeKind::SheetAppend).with_setting("sheetId", "id");
        let mut log = RunLog::new();

        handler
            .execute(&node, &mut ExecutionContext::new(), &mut log)
            .await
            .unwrap();

        assert_eq!(sheets.requests()[0].credentials.as_deref(), Some(key.as_path()));
        assert!(!log.contains("Warning"));
    }

    #[tokio::test]
    async fn test_missing_sheet_id_is_an_error() {
        let sheets = RecordingSheets::new();
        let handler = SheetAppendHandler::new(sheets.clone(), no_credentials());
        let node = Node::new("s", NodeKind::SheetAppend);

        let err = handler
            .execute(&node, &mut ExecutionContext::new(), &mut RunLog::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Google Sheet ID is missing");
        assert!(sheets.requests().is_empty());
    }
}

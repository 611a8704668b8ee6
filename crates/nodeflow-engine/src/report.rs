use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::log::RunLog;

pub const COMPLETE_MESSAGE: &str = "Workflow execution complete";

/// How a single node execution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Failed { error: String },
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One executed node, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub node_id: String,
    pub kind: String,
    pub outcome: StepOutcome,
    pub elapsed_ms: u64,
}

/// The terminal output of a completed run.
///
/// `success` is always true for a report; per-node failures show up in
/// `logs`, `steps` and the context's `error` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub success: bool,
    pub message: String,
    pub logs: RunLog,
    pub final_data: ExecutionContext,
    pub execution_id: String,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub limit_reached: bool,
}

impl RunReport {
    pub fn completed(
        execution_id: String,
        logs: RunLog,
        final_data: ExecutionContext,
        steps: Vec<StepRecord>,
        limit_reached: bool,
    ) -> Self {
        Self {
            success: true,
            message: COMPLETE_MESSAGE.to_string(),
            logs,
            final_data,
            execution_id,
            steps,
            limit_reached,
        }
    }

    /// Ids of the executed nodes, in order.
    pub fn executed(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.node_id.as_str()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.outcome.is_failed())
    }
}

/// Run identifier derived from the wall clock. Not unique under concurrent
/// runs started in the same millisecond.
pub fn new_execution_id() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

//! Workflow execution engine: graph model, trigger location, node handlers
//! and the queue-draining runner.

pub mod context;
pub mod graph;
pub mod handlers;
pub mod log;
pub mod report;
pub mod runner;

pub use context::ExecutionContext;
pub use graph::{Edge, Graph, Node, NodeKind};
pub use handlers::{HandlerRegistry, NodeHandler, Services};
pub use log::RunLog;
pub use report::{RunReport, StepOutcome, StepRecord};
pub use runner::WorkflowEngine;

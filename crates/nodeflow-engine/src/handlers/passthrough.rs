use futures::future::BoxFuture;

use nodeflow_core::error::Result;

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::graph::Node;
use crate::log::RunLog;

/// Fallback for kinds with no behaviour. Not an error.
pub struct PassthroughHandler;

impl NodeHandler for PassthroughHandler {
    fn name(&self) -> &str {
        "Passthrough"
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        _ctx: &'a mut ExecutionContext,
        log: &'a mut RunLog,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            log.push(format!("Executed {} (No logic defined)", node.label));
            Ok(())
        })
    }
}

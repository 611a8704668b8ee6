use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use nodeflow_core::config::{AppConfig, EngineConfig};
use nodeflow_core::error::Result;

use crate::context::ExecutionContext;
use crate::graph::Graph;
use crate::handlers::{HandlerRegistry, Services};
use crate::log::RunLog;
use crate::report::{new_execution_id, RunReport, StepRecord};

pub const LIMIT_REACHED: &str = "Execution halted: limit reached";

/// Executes workflow graphs.
///
/// Holds no per-run state: every call to [`run`](Self::run) owns a fresh
/// context and log, so one engine can serve concurrent runs.
pub struct WorkflowEngine {
    registry: HandlerRegistry,
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(registry: HandlerRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Build an engine wired to the live outbound services.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let services = Services::live(config)?;
        Ok(Self::with_services(services, config))
    }

    pub fn with_services(services: Services, config: &AppConfig) -> Self {
        Self::new(HandlerRegistry::new(services, config), config.engine.clone())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a graph from its trigger until the queue drains or the step
    /// ceiling is passed.
    ///
    /// Fails only for a malformed graph or a graph with no trigger node;
    /// per-node failures are recorded in the report.
    pub async fn run(&self, graph: &Graph) -> Result<RunReport> {
        graph.validate()?;
        let trigger = graph.find_trigger()?;

        let execution_id = new_execution_id();
        let index = graph.index();
        let adjacency = graph.adjacency();
        let start = Instant::now();

        info!(
            execution_id = %execution_id,
            trigger = %trigger.id,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "FLOW START"
        );

        let mut ctx = ExecutionContext::new();
        let mut log = RunLog::new();
        let mut steps: Vec<StepRecord> = Vec::new();
        let mut visits: HashMap<&str, usize> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::from([trigger.id.as_str()]);
        let mut step_count = 0usize;
        let mut limit_reached = false;

        while let Some(node_id) = queue.pop_front() {
            let Some(node) = index.get(node_id) else {
                debug!(node_id, "Queued id does not resolve to a node, skipping");
                continue;
            };

            step_count += 1;
            if step_count > self.config.max_steps {
                log.push(LIMIT_REACHED);
                limit_reached = true;
                info!(execution_id = %execution_id, max_steps = self.config.max_steps, "Step limit reached");
                break;
            }

            let visit = visits.entry(node.id.as_str()).or_insert(0);
            *visit += 1;
            if *visit > 1 {
                debug!(node_id = %node.id, visit = *visit, "Re-executing node");
            }

            info!(node_id = %node.id, kind = %node.kind, label = %node.label, "Executing node");
            let node_start = Instant::now();
            let outcome = self.registry.dispatch(node, &mut ctx, &mut log).await;
            steps.push(StepRecord {
                node_id: node.id.clone(),
                kind: node.kind.to_string(),
                outcome,
                elapsed_ms: node_start.elapsed().as_millis() as u64,
            });

            if let Some(successors) = adjacency.get(node_id) {
                queue.extend(successors.iter().map(String::as_str));
            }

            if self.config.node_delay_ms > 0 && !queue.is_empty() {
                tokio::time::sleep(Duration::from_millis(self.config.node_delay_ms)).await;
            }
        }

        info!(
            execution_id = %execution_id,
            steps = steps.len(),
            limit_reached,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "FLOW END"
        );

        Ok(RunReport::completed(
            execution_id,
            log,
            ctx,
            steps,
            limit_reached,
        ))
    }
}

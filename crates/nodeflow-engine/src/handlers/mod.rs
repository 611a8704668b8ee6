//! Node handlers and the registry that dispatches to them.
//!
//! Every handler returns `Result<()>`. The registry turns an `Err` into the
//! fail-open record: the context's `error` field, a failure line in the run
//! log and a `Failed` step outcome. The run always continues.

pub mod ai_summarize;
pub mod chat_notify;
pub mod email_poll;
pub mod email_send;
pub mod passthrough;
pub mod sheet_append;
pub mod webhook;

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

use nodeflow_channels::{GoogleSheetsClient, ImapMailbox, SmtpMailer, WebhookClient};
use nodeflow_core::config::AppConfig;
use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::{ChatWebhook, LlmClient, MailTransport, MailboxReader, SheetsClient};

use crate::context::ExecutionContext;
use crate::graph::{Node, NodeKind};
use crate::log::RunLog;
use crate::report::StepOutcome;

pub use ai_summarize::AiSummarizeHandler;
pub use chat_notify::ChatNotifyHandler;
pub use email_poll::EmailPollHandler;
pub use email_send::EmailSendHandler;
pub use passthrough::PassthroughHandler;
pub use sheet_append::SheetAppendHandler;
pub use webhook::WebhookHandler;

/// Executes one kind of node against the shared context.
pub trait NodeHandler: Send + Sync {
    /// Short name used as the prefix of failure log lines.
    fn name(&self) -> &str;

    /// Run the node. Must append at least one line to `log`.
    fn execute<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a mut ExecutionContext,
        log: &'a mut RunLog,
    ) -> BoxFuture<'a, Result<()>>;

    /// Seed extra context after a failure. `error` is already set.
    fn on_failure(&self, _error: &NodeflowError, _ctx: &mut ExecutionContext) {}
}

/// The outbound collaborators the handlers talk to.
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LlmClient>,
    pub chat: Arc<dyn ChatWebhook>,
    pub mailbox: Arc<dyn MailboxReader>,
    pub mailer: Arc<dyn MailTransport>,
    pub sheets: Arc<dyn SheetsClient>,
}

impl Services {
    /// Real network clients built from configuration.
    pub fn live(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            llm: nodeflow_llm::create_client(&config.ai)?,
            chat: Arc::new(WebhookClient::new()),
            mailbox: Arc::new(ImapMailbox::new(config.mail.clone())),
            mailer: Arc::new(SmtpMailer::new(config.mail.clone())),
            sheets: Arc::new(GoogleSheetsClient::new()),
        })
    }
}

/// Maps a node kind to its handler. The mapping is a single exhaustive
/// match; unrecognised kinds go to the pass-through handler.
pub struct HandlerRegistry {
    webhook: WebhookHandler,
    email_poll: EmailPollHandler,
    ai_summarize: AiSummarizeHandler,
    chat_notify: ChatNotifyHandler,
    sheet_append: SheetAppendHandler,
    email_send: EmailSendHandler,
    passthrough: PassthroughHandler,
}

impl HandlerRegistry {
    pub fn new(services: Services, config: &AppConfig) -> Self {
        Self {
            webhook: WebhookHandler,
            email_poll: EmailPollHandler::new(services.mailbox, config.mail.mailbox.clone()),
            ai_summarize: AiSummarizeHandler::new(services.llm, config.ai.clone()),
            chat_notify: ChatNotifyHandler::new(services.chat),
            sheet_append: SheetAppendHandler::new(services.sheets, config.sheets.clone()),
            email_send: EmailSendHandler::new(services.mailer, config.mail.clone()),
            passthrough: PassthroughHandler,
        }
    }

    pub fn handler_for(&self, kind: &NodeKind) -> &dyn NodeHandler {
        match kind {
            NodeKind::Webhook => &self.webhook,
            NodeKind::EmailPoll => &self.email_poll,
            NodeKind::AiSummarize => &self.ai_summarize,
            NodeKind::ChatNotify => &self.chat_notify,
            NodeKind::SheetAppend => &self.sheet_append,
            NodeKind::EmailSend => &self.email_send,
            NodeKind::Other(_) => &self.passthrough,
        }
    }

    /// Execute a node, converting any handler error into the fail-open record.
    pub async fn dispatch(
        &self,
        node: &Node,
        ctx: &mut ExecutionContext,
        log: &mut RunLog,
    ) -> StepOutcome {
        let handler = self.handler_for(&node.kind);
        match handler.execute(node, ctx, log).await {
            Ok(()) => StepOutcome::Completed,
            Err(e) => {
                let message = e.to_string();
                warn!(node_id = %node.id, handler = handler.name(), error = %message, "Node failed");
                ctx.error = Some(message.clone());
                log.push(format!("{} Execution Failed: {}", handler.name(), message));
                handler.on_failure(&e, ctx);
                StepOutcome::Failed { error: message }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use nodeflow_test_utils::{MockLlm, MockMailbox, RecordingMailer, RecordingSheets, RecordingWebhook};

    /// Services where every collaborator is a quiet mock.
    pub fn quiet_services() -> Services {
        Services {
            llm: MockLlm::replying("ok"),
            chat: RecordingWebhook::new(),
            mailbox: MockMailbox::empty(),
            mailer: RecordingMailer::new(),
            sheets: RecordingSheets::new(),
        }
    }
}

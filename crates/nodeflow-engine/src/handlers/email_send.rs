use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use nodeflow_core::config::MailConfig;
use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::MailTransport;
use nodeflow_core::types::OutgoingEmail;

use super::chat_notify::NO_CONTENT;
use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::graph::Node;
use crate::log::RunLog;

pub const DEFAULT_SUBJECT: &str = "Workflow Notification";

/// Sink that sends an email with plain-text and HTML bodies.
pub struct EmailSendHandler {
    mailer: Arc<dyn MailTransport>,
    config: MailConfig,
}

impl EmailSendHandler {
    pub fn new(mailer: Arc<dyn MailTransport>, config: MailConfig) -> Self {
        Self { mailer, config }
    }
}

/// Newlines become `<br>`. The text is not escaped.
pub fn to_html(text: &str) -> String {
    text.replace('\n', "<br>")
}

impl NodeHandler for EmailSendHandler {
    fn name(&self) -> &str {
        "Email"
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a mut ExecutionContext,
        log: &'a mut RunLog,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let to = node
                .setting("emailTo")
                .ok_or_else(|| NodeflowError::missing("Recipient email is missing"))?;
            if self.config.credentials().is_none() {
                return Err(NodeflowError::missing("Missing EMAIL_USER or EMAIL_PASS"));
            }

            let subject = node.setting("emailSubject").unwrap_or(DEFAULT_SUBJECT);
            let body = node
                .setting("emailBody")
                .or_else(|| ctx.text("summary"))
                .unwrap_or(NO_CONTENT);

            log.push(format!("Sending email to {}", to));
            let message_id = self
                .mailer
                .send(OutgoingEmail {
                    to: to.to_string(),
                    subject: subject.to_string(),
                    text: body.to_string(),
                    html: to_html(body),
                })
                .await?;

            info!(node_id = %node.id, %message_id, "Email sent");
            log.push(format!("Email sent: {}", message_id));
            Ok(())
        })
    }
}

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::MailboxReader;

use super::NodeHandler;
use crate::context::ExecutionContext;
use crate::graph::Node;
use crate::log::RunLog;

pub const NO_EMAIL_BODY: &str = "No email found";
pub const NO_SUBJECT: &str = "No Subject";
pub const UNKNOWN_SENDER: &str = "Unknown";
/// Body seeded when the mailbox can't be read, so downstream nodes still
/// have text to work on.
pub const FETCH_ERROR_BODY: &str = "Error fetching email";

/// Trigger that pulls the newest unseen message from a mailbox.
pub struct EmailPollHandler {
    mailbox: Arc<dyn MailboxReader>,
    default_mailbox: String,
}

impl EmailPollHandler {
    pub fn new(mailbox: Arc<dyn MailboxReader>, default_mailbox: String) -> Self {
        Self {
            mailbox,
            default_mailbox,
        }
    }
}

impl NodeHandler for EmailPollHandler {
    fn name(&self) -> &str {
        "Email Trigger"
    }

    fn execute<'a>(
        &'a self,
        node: &'a Node,
        ctx: &'a mut ExecutionContext,
        log: &'a mut RunLog,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mailbox = node.setting("mailbox").unwrap_or(self.default_mailbox.as_str());
            log.push(format!("Checking {} for unread email", mailbox));

            match self.mailbox.fetch_latest_unseen(mailbox).await? {
                Some(email) => {
                    info!(node_id = %node.id, from = %email.from, "Fetched unread email");
                    log.push(format!(
                        "Fetched email from {}: \"{}\"",
                        email.from, email.subject
                    ));
                    ctx.subject = Some(email.subject);
                    ctx.from = Some(email.from);
                    ctx.body = Some(email.body);
                }
                None => {
                    ctx.body = Some(NO_EMAIL_BODY.to_string());
                    ctx.subject = Some(NO_SUBJECT.to_string());
                    ctx.from = Some(UNKNOWN_SENDER.to_string());
                    log.push("No unread emails found");
                }
            }
            Ok(())
        })
    }

    fn on_failure(&self, _error: &NodeflowError, ctx: &mut ExecutionContext) {
        ctx.body = Some(FETCH_ERROR_BODY.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use nodeflow_test_utils::{email, MockMailbox};

    #[tokio::test]
    async fn test_extracts_message_fields() {
        let mailbox = MockMailbox::with_messages(vec![email(
            "Bug report",
            "client@example.com",
            "The app crashes on start.",
        )]);
        let handler = EmailPollHandler::new(mailbox.clone(), "INBOX".into());
        let node = Node::new("poll", NodeKind::EmailPoll);
        let mut ctx = ExecutionContext::new();
        let mut log = RunLog::new();

        handler.execute(&node, &mut ctx, &mut log).await.unwrap();

        assert_eq!(ctx.subject.as_deref(), Some("Bug report"));
        assert_eq!(ctx.from.as_deref(), Some("client@example.com"));
        assert_eq!(ctx.body.as_deref(), Some("The app crashes on start."));
        assert_eq!(mailbox.polls(), ["INBOX"]);
        assert!(log.contains("Fetched email from client@example.com"));
    }

    #[tokio::test]
    async fn test_consumed_message_is_not_reprocessed() {
        let mailbox = MockMailbox::with_messages(vec![email("Only", "a@b.c", "once")]);
        let handler = EmailPollHandler::new(mailbox.clone(), "INBOX".into());
        let node = Node::new("poll", NodeKind::EmailPoll);

        let mut first = ExecutionContext::new();
        handler.execute(&node, &mut first, &mut RunLog::new()).await.unwrap();
        let mut second = ExecutionContext::new();
        handler.execute(&node, &mut second, &mut RunLog::new()).await.unwrap();

        assert_eq!(first.body.as_deref(), Some("once"));
        assert_eq!(second.body.as_deref(), Some(NO_EMAIL_BODY));
        assert_eq!(mailbox.remaining(), 0);
    }

    #[tokio::test]
    async fn test_empty_mailbox_writes_placeholders() {
        let handler = EmailPollHandler::new(MockMailbox::empty(), "INBOX".into());
        let node = Node::new("poll", NodeKind::EmailPoll);
        let mut ctx = ExecutionContext::new();
        let mut log = RunLog::new();

        handler.execute(&node, &mut ctx, &mut log).await.unwrap();

        assert_eq!(ctx.body.as_deref(), Some(NO_EMAIL_BODY));
        assert_eq!(ctx.subject.as_deref(), Some(NO_SUBJECT));
        assert_eq!(ctx.from.as_deref(), Some(UNKNOWN_SENDER));
        assert!(ctx.error.is_none());
    }

    #[tokio::test]
    async fn test_node_mailbox_overrides_default() {
        let mailbox = MockMailbox::empty();
        let handler = EmailPollHandler::new(mailbox.clone(), "INBOX".into());
        let node = Node::new("poll", NodeKind::EmailPoll).with_setting("mailbox", "Support");

        handler
            .execute(&node, &mut ExecutionContext::new(), &mut RunLog::new())
            .await
            .unwrap();

        assert_eq!(mailbox.polls(), ["Support"]);
    }

    #[tokio::test]
    async fn test_unreachable_mailbox_is_an_error() {
        let handler = EmailPollHandler::new(MockMailbox::unreachable("timed out"), "INBOX".into());
        let node = Node::new("poll", NodeKind::EmailPoll);
        let mut ctx = ExecutionContext::new();

        let err = handler
            .execute(&node, &mut ctx, &mut RunLog::new())
            .await
            .unwrap_err();
        handler.on_failure(&err, &mut ctx);

        assert!(err.to_string().contains("timed out"));
        assert_eq!(ctx.body.as_deref(), Some(FETCH_ERROR_BODY));
    }
}

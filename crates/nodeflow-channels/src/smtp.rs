use futures::future::BoxFuture;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;
use uuid::Uuid;

use nodeflow_core::config::MailConfig;
use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::MailTransport;
use nodeflow_core::types::OutgoingEmail;

/// Sends mail through an authenticated SMTP relay.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

fn smtp_err(e: impl std::fmt::Display) -> NodeflowError {
    NodeflowError::MailTransport(e.to_string())
}

/// A fresh `<uuid@domain>` Message-ID, using the sender's domain.
pub fn new_message_id(sender: &str) -> String {
    let domain = sender
        .rsplit_once('@')
        .map(|(_, d)| d.trim_end_matches('>'))
        .filter(|d| !d.is_empty())
        .unwrap_or("localhost");
    format!("<{}@{}>", Uuid::new_v4(), domain)
}

/// Build the multipart/alternative message (plain text + HTML).
pub fn build_message(from: &str, email: &OutgoingEmail, message_id: &str) -> Result<Message> {
    let from: Mailbox = from.parse().map_err(smtp_err)?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| NodeflowError::MailTransport(format!("invalid recipient '{}': {}", email.to, e)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .message_id(Some(message_id.to_string()))
        .multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            email.html.clone(),
        ))
        .map_err(smtp_err)
}

impl MailTransport for SmtpMailer {
    fn send(&self, email: OutgoingEmail) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let (user, password) = self
                .config
                .credentials()
                .ok_or_else(|| NodeflowError::missing("Missing EMAIL_USER or EMAIL_PASS"))?;

            let message_id = new_message_id(user);
            let message = build_message(user, &email, &message_id)?;

            let host = self.config.smtp_host.as_str();
            // 587 negotiates STARTTLS; anything else uses implicit TLS.
            let builder = if self.config.smtp_port == 587 {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            }
            .map_err(smtp_err)?;

            let transport = builder
                .port(self.config.smtp_port)
                .credentials(Credentials::new(user.to_string(), password.to_string()))
                .build();

            transport.send(message).await.map_err(smtp_err)?;
            info!(to = %email.to, message_id = %message_id, "Email sent");
            Ok(message_id)
        })
    }
}

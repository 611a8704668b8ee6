//! Outbound collaborators used by the workflow handlers: chat webhooks,
//! IMAP mailboxes, SMTP relays and the Sheets API.

pub mod credentials;
pub mod mailbox;
pub mod sheets;
pub mod smtp;
pub mod webhook;

pub use credentials::{resolve_service_account, CredentialSource};
pub use mailbox::ImapMailbox;
pub use sheets::GoogleSheetsClient;
pub use smtp::SmtpMailer;
pub use webhook::WebhookClient;

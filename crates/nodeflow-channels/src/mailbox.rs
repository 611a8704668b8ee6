use futures::future::BoxFuture;
use mailparse::{MailHeaderMap, ParsedMail};
use tracing::{debug, info};

use nodeflow_core::config::MailConfig;
use nodeflow_core::error::{NodeflowError, Result};
use nodeflow_core::traits::MailboxReader;
use nodeflow_core::types::FetchedEmail;

/// Reads unseen mail over IMAP (TLS).
///
/// The `imap` crate is blocking, so each fetch runs on the blocking pool.
pub struct ImapMailbox {
    config: MailConfig,
}

impl ImapMailbox {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

impl MailboxReader for ImapMailbox {
    fn fetch_latest_unseen(&self, mailbox: &str) -> BoxFuture<'_, Result<Option<FetchedEmail>>> {
        let config = self.config.clone();
        let mailbox = mailbox.to_string();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || fetch_blocking(&config, &mailbox))
                .await
                .map_err(|e| NodeflowError::Mailbox(format!("fetch task failed: {}", e)))?
        })
    }
}

fn imap_err(e: impl std::fmt::Display) -> NodeflowError {
    NodeflowError::Mailbox(e.to_string())
}

fn fetch_blocking(config: &MailConfig, mailbox: &str) -> Result<Option<FetchedEmail>> {
    let (user, password) = config
        .credentials()
        .ok_or_else(|| NodeflowError::missing("Missing EMAIL_USER or EMAIL_PASS"))?;

    let tls = native_tls::TlsConnector::builder().build().map_err(imap_err)?;
    let client = imap::connect(
        (config.imap_host.as_str(), config.imap_port),
        config.imap_host.as_str(),
        &tls,
    )
    .map_err(imap_err)?;

    let mut session = client.login(user, password).map_err(|(e, _)| imap_err(e))?;
    debug!(host = %config.imap_host, mailbox, "IMAP session opened");

    let result = fetch_latest(&mut session, mailbox);
    // Logout failure does not affect what was fetched.
    let _ = session.logout();
    result
}

/// Fetch data item that leaves the `\Seen` flag alone.
const PEEK_FULL_MESSAGE: &str = "BODY.PEEK[]";

/// The mailbox operations one fetch needs.
trait UnseenStore {
    fn select(&mut self, mailbox: &str) -> Result<()>;
    fn unseen(&mut self) -> Result<Vec<u32>>;
    fn peek(&mut self, seq: u32) -> Result<Vec<u8>>;
    fn mark_seen(&mut self, seq: u32) -> Result<()>;
}

impl<T: std::io::Read + std::io::Write> UnseenStore for imap::Session<T> {
    fn select(&mut self, mailbox: &str) -> Result<()> {
        imap::Session::select(self, mailbox).map(|_| ()).map_err(imap_err)
    }

    fn unseen(&mut self) -> Result<Vec<u32>> {
        Ok(self.search("UNSEEN").map_err(imap_err)?.into_iter().collect())
    }

    fn peek(&mut self, seq: u32) -> Result<Vec<u8>> {
        let messages = self.fetch(seq.to_string(), PEEK_FULL_MESSAGE).map_err(imap_err)?;
        messages
            .iter()
            .find_map(|m| m.body())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| NodeflowError::Mailbox(format!("message {} has no body", seq)))
    }

    fn mark_seen(&mut self, seq: u32) -> Result<()> {
        self.store(seq.to_string(), "+FLAGS (\\Seen)")
            .map(|_| ())
            .map_err(imap_err)
    }
}

/// Newest unseen message, flagged `\Seen` only once it has been parsed.
fn fetch_latest(store: &mut impl UnseenStore, mailbox: &str) -> Result<Option<FetchedEmail>> {
    store.select(mailbox)?;

    let Some(latest) = store.unseen()?.into_iter().max() else {
        return Ok(None);
    };

    let raw = store.peek(latest)?;
    let email = parse_message(&raw)?;

    store.mark_seen(latest)?;
    info!(seq = latest, subject = %email.subject, "Fetched unseen message");

    Ok(Some(email))
}

/// Extract subject, sender and plain-text body from a raw RFC 822 message.
pub fn parse_message(raw: &[u8]) -> Result<FetchedEmail> {
    let parsed = mailparse::parse_mail(raw).map_err(imap_err)?;

    let subject = parsed
        .headers
        .get_first_value("Subject")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "No Subject".to_string());
    let from = parsed
        .headers
        .get_first_value("From")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string());
    let body = text_body(&parsed)?.unwrap_or_default().trim().to_string();

    Ok(FetchedEmail {
        subject,
        from,
        body,
    })
}

/// First `text/plain` part, depth-first; falls back to the top-level body.
fn text_body(mail: &ParsedMail<'_>) -> Result<Option<String>> {
    if mail.subparts.is_empty() {
        return mail.get_body().map(Some).map_err(imap_err);
    }
    for part in &mail.subparts {
        if part.ctype.mimetype == "text/plain" {
            return part.get_body().map(Some).map_err(imap_err);
        }
        if !part.subparts.is_empty() {
            if let Some(body) = text_body(part)? {
                return Ok(Some(body));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeStore {
        unseen: Vec<u32>,
        raw: Option<Vec<u8>>,
        peeked: Vec<u32>,
        seen: Vec<u32>,
    }

    impl UnseenStore for FakeStore {
        fn select(&mut self, _mailbox: &str) -> Result<()> {
            Ok(())
        }

        fn unseen(&mut self) -> Result<Vec<u32>> {
            Ok(self.unseen.clone())
        }

        fn peek(&mut self, seq: u32) -> Result<Vec<u8>> {
            self.peeked.push(seq);
            self.raw
                .clone()
                .ok_or_else(|| NodeflowError::Mailbox(format!("message {} has no body", seq)))
        }

        fn mark_seen(&mut self, seq: u32) -> Result<()> {
            self.seen.push(seq);
            Ok(())
        }
    }

    #[test]
    fn test_fetch_uses_peek() {
        assert_eq!(PEEK_FULL_MESSAGE, "BODY.PEEK[]");
    }

    #[test]
    fn test_newest_unseen_is_marked_after_parse() {
        let mut store = FakeStore {
            unseen: vec![3, 9, 5],
            raw: Some(b"Subject: Hi\r\n\r\nbody\r\n".to_vec()),
            ..FakeStore::default()
        };
        let email = fetch_latest(&mut store, "INBOX").unwrap().unwrap();
        assert_eq!(email.subject, "Hi");
        assert_eq!(store.peeked, [9]);
        assert_eq!(store.seen, [9]);
    }

    #[test]
    fn test_unreadable_message_stays_unseen() {
        let mut store = FakeStore {
            unseen: vec![4],
            raw: None,
            ..FakeStore::default()
        };
        assert!(fetch_latest(&mut store, "INBOX").is_err());
        assert_eq!(store.peeked, [4]);
        assert!(store.seen.is_empty());
    }

    #[test]
    fn test_empty_mailbox_touches_nothing() {
        let mut store = FakeStore::default();
        assert!(fetch_latest(&mut store, "INBOX").unwrap().is_none());
        assert!(store.peeked.is_empty());
        assert!(store.seen.is_empty());
    }

    #[test]
    fn test_parse_simple_message() {
        let raw = b"From: Client <client@example.com>\r\n\
Subject: Checkout is broken\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
The pay button does nothing.\r\n";
        let email = parse_message(raw).unwrap();
        assert_eq!(email.subject, "Checkout is broken");
        assert_eq!(email.from, "Client <client@example.com>");
        assert_eq!(email.body, "The pay button does nothing.");
    }

    #[test]
    fn test_parse_multipart_prefers_plain_text() {
        let raw = b"From: a@example.com\r\n\
Subject: Mixed\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>html body</p>\r\n\
--XYZ\r\n\
Content-Type: text/plain\r\n\
\r\n\
plain body\r\n\
--XYZ--\r\n";
        let email = parse_message(raw).unwrap();
        assert_eq!(email.body, "plain body");
    }

    #[test]
    fn test_parse_missing_headers_use_placeholders() {
        let raw = b"Content-Type: text/plain\r\n\r\nhello\r\n";
        let email = parse_message(raw).unwrap();
        assert_eq!(email.subject, "No Subject");
        assert_eq!(email.from, "Unknown");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_connecting() {
        let mailbox = ImapMailbox::new(MailConfig::default());
        let err = mailbox.fetch_latest_unseen("INBOX").await.unwrap_err();
        assert!(matches!(err, NodeflowError::MissingSetting(_)));
    }
}

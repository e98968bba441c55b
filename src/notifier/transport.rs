//! Mail transports
//!
//! [`SmtpMailTransport`] opens one SMTP session per delivery. The lettre
//! transport is owned by the `deliver` future, so the session is closed on
//! every exit path including errors.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::config::MailConfig;
use super::errors::{SendError, SendResult};
use super::template::{MessageBody, RenderedMessage};

/// A fully addressed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: MessageBody,
}

impl OutgoingMail {
    /// Address `message`, validating every mailbox
    pub fn new(from: &str, to: &[&str], message: RenderedMessage) -> SendResult<Self> {
        if to.is_empty() {
            return Err(SendError::InvalidAddress("no recipients".into()));
        }

        parse_mailbox(from)?;
        for recipient in to {
            parse_mailbox(recipient)?;
        }

        Ok(Self {
            from: from.to_string(),
            to: to.iter().map(|s| s.trim().to_string()).collect(),
            subject: message.subject,
            body: message.body,
        })
    }

    /// Build the RFC 5322 message
    pub fn to_message(&self) -> SendResult<Message> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.from)?)
            .subject(self.subject.clone());

        for recipient in &self.to {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        let (content_type, body) = match &self.body {
            MessageBody::Plain(text) => (ContentType::TEXT_PLAIN, text.clone()),
            MessageBody::Html(html) => (ContentType::TEXT_HTML, html.clone()),
        };

        builder
            .header(content_type)
            .body(body)
            .map_err(|e| SendError::Build(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> SendResult<Mailbox> {
    address
        .trim()
        .parse()
        .map_err(|e| SendError::InvalidAddress(format!("{:?}: {}", address, e)))
}

/// Delivery of one addressed message
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver `mail`; one call is one attempt
    async fn deliver(&self, mail: &OutgoingMail) -> SendResult<()>;
}

/// Authenticated SMTP with mandatory STARTTLS
pub struct SmtpMailTransport {
    config: MailConfig,
}

impl SmtpMailTransport {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn build_transport(&self) -> SendResult<AsyncSmtpTransport<Tokio1Executor>> {
        let creds = Credentials::new(
            self.config.smtp_user.clone(),
            self.config.smtp_password.clone(),
        );

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| SendError::Transport(format!("SMTP relay error: {}", e)))?
                .port(self.config.smtp_port)
                .credentials(creds)
                .timeout(Some(Duration::from_millis(self.config.timeout_ms)))
                .build(),
        )
    }

    /// Open a session, negotiate STARTTLS and close it again
    pub async fn verify(&self) -> SendResult<()> {
        let mailer = self.build_transport()?;
        match mailer.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(SendError::Transport(format!(
                "SMTP server {}:{} did not accept the connection",
                self.config.smtp_host, self.config.smtp_port
            ))),
            Err(e) => Err(SendError::Transport(e.to_string())),
        }
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, mail: &OutgoingMail) -> SendResult<()> {
        let message = mail.to_message()?;
        let mailer = self.build_transport()?;

        mailer
            .send(message)
            .await
            .map_err(|e| SendError::Transport(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

/// In-memory transport for dry runs and tests
///
/// Records every delivered message and counts attempts. Can be told to
/// fail its first N attempts.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<OutgoingMail>>,
    attempts: AtomicU32,
    fail_remaining: AtomicU32,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` attempts with a transport error
    pub fn failing_first(n: u32) -> Self {
        Self {
            fail_remaining: AtomicU32::new(n),
            ..Self::default()
        }
    }

    /// Fail every attempt
    pub fn always_failing() -> Self {
        Self::failing_first(u32::MAX)
    }

    /// Delivered messages
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Number of delivered messages
    pub fn sent_count(&self) -> usize {
        self.sent().len()
    }

    /// Number of delivery attempts, successful or not
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for MemoryTransport {
    async fn deliver(&self, mail: &OutgoingMail) -> SendResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if failed {
            return Err(SendError::Transport("simulated transport failure".into()));
        }

        self.sent
            .lock()
            .map_err(|_| SendError::Transport("Lock poisoned".into()))?
            .push(mail.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> OutgoingMail {
        OutgoingMail::new(
            "Hazard Alerts <alerts@example.com>",
            &["user@example.com"],
            RenderedMessage::plain("subject", "body"),
        )
        .unwrap()
    }

    #[test]
    fn test_outgoing_mail_validates_addresses() {
        let message = RenderedMessage::plain("s", "b");

        assert!(matches!(
            OutgoingMail::new("alerts@example.com", &[], message.clone()),
            Err(SendError::InvalidAddress(_))
        ));
        assert!(matches!(
            OutgoingMail::new("alerts@example.com", &["not-an-address"], message.clone()),
            Err(SendError::InvalidAddress(_))
        ));
        assert!(OutgoingMail::new("alerts@example.com", &["a@x.com", "b@x.com"], message).is_ok());
    }

    #[test]
    fn test_to_message_multiple_recipients() {
        let mail = OutgoingMail::new(
            "alerts@example.com",
            &["a@x.com", "b@x.com"],
            RenderedMessage::html("Alert", "<p>hi</p>"),
        )
        .unwrap();

        let formatted = String::from_utf8(mail.to_message().unwrap().formatted()).unwrap();
        assert!(formatted.contains("a@x.com"));
        assert!(formatted.contains("b@x.com"));
        assert!(formatted.contains("text/html"));
    }

    #[tokio::test]
    async fn test_memory_transport_records() {
        let transport = MemoryTransport::new();

        transport.deliver(&mail()).await.unwrap();

        assert_eq!(transport.sent_count(), 1);
        assert_eq!(transport.attempts(), 1);
        assert_eq!(transport.sent()[0].to, vec!["user@example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_transport_fails_first_n() {
        let transport = MemoryTransport::failing_first(2);

        assert!(transport.deliver(&mail()).await.is_err());
        assert!(transport.deliver(&mail()).await.is_err());
        assert!(transport.deliver(&mail()).await.is_ok());

        assert_eq!(transport.attempts(), 3);
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_transport_always_failing() {
        let transport = MemoryTransport::always_failing();

        for _ in 0..5 {
            assert!(transport.deliver(&mail()).await.is_err());
        }
        assert_eq!(transport.sent_count(), 0);
    }
}

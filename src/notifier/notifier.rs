//! Alert composer and sender

use std::sync::Arc;

use super::config::MailConfig;
use super::errors::SendResult;
use super::template::{AlertTemplate, RenderedMessage};
use super::transport::{MailTransport, MemoryTransport, OutgoingMail, SmtpMailTransport};

/// Composes alerts and hands them to a [`MailTransport`]
///
/// One `notify` call is exactly one delivery attempt; retries belong to the
/// sweep.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    from: String,
    html: bool,
}

impl Notifier {
    pub fn new(transport: Arc<dyn MailTransport>, from: impl Into<String>, html: bool) -> Self {
        Self {
            transport,
            from: from.into(),
            html,
        }
    }

    /// SMTP-backed notifier for `config`
    pub fn smtp(config: MailConfig) -> Self {
        let from = config.from_mailbox();
        let html = config.html;
        Self::new(Arc::new(SmtpMailTransport::new(config)), from, html)
    }

    /// Notifier that records alerts in memory instead of sending them
    pub fn dry_run(transport: Arc<MemoryTransport>, from: impl Into<String>) -> Self {
        Self::new(transport, from, false)
    }

    /// Send the danger alert for `(x, y)` to `email`
    pub async fn notify(&self, email: &str, x: f64, y: f64) -> SendResult<()> {
        let message = AlertTemplate::DangerZone { x, y }.render(self.html);
        self.send(&[email], message).await
    }

    /// Send `message` to one or more recipients in a single delivery
    pub async fn send(&self, to: &[&str], message: RenderedMessage) -> SendResult<()> {
        let mail = OutgoingMail::new(&self.from, to, message)?;
        self.transport.deliver(&mail).await
    }

    /// Sender mailbox
    pub fn from(&self) -> &str {
        &self.from
    }
}

//! # Notifier
//!
//! Alert email composition and delivery.
//!
//! - [`Notifier`] renders the danger template and addresses it
//! - [`MailTransport`] delivers: SMTP with STARTTLS, or in memory

mod config;
mod errors;
#[allow(clippy::module_inception)]
mod notifier;
mod template;
mod transport;

pub use config::MailConfig;
pub use errors::{SendError, SendResult};
pub use notifier::Notifier;
pub use template::{AlertTemplate, MessageBody, RenderedMessage, DANGER_SUBJECT};
pub use transport::{MailTransport, MemoryTransport, OutgoingMail, SmtpMailTransport};

//! Mail transport configuration

use std::fmt;

use serde::{Deserialize, Serialize};

/// SMTP configuration
///
/// Credentials come from the config file or the environment, never from
/// source. STARTTLS is always negotiated before authenticating.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// SMTP server host
    pub smtp_host: String,

    /// SMTP server port (default: 587, submission with STARTTLS)
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username
    pub smtp_user: String,

    /// SMTP password (should come from `GEOALERT_SMTP_PASSWORD`)
    #[serde(default)]
    pub smtp_password: String,

    /// From email address (default: the SMTP username)
    #[serde(default)]
    pub from_email: Option<String>,

    /// From display name
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Send the HTML rendering of alerts instead of plain text
    #[serde(default)]
    pub html: bool,

    /// SMTP connection timeout in milliseconds (default: 30000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Test the SMTP connection when the service starts (default: true)
    #[serde(default = "default_verify_on_start")]
    pub verify_on_start: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Hazard Alerts".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_verify_on_start() -> bool {
    true
}

impl MailConfig {
    /// Config for a host and login with every other field defaulted
    pub fn new(
        smtp_host: impl Into<String>,
        smtp_user: impl Into<String>,
        smtp_password: impl Into<String>,
    ) -> Self {
        Self {
            smtp_host: smtp_host.into(),
            smtp_port: default_smtp_port(),
            smtp_user: smtp_user.into(),
            smtp_password: smtp_password.into(),
            from_email: None,
            from_name: default_from_name(),
            html: false,
            timeout_ms: default_timeout_ms(),
            verify_on_start: default_verify_on_start(),
        }
    }

    /// Address alerts are sent from
    pub fn from_address(&self) -> &str {
        self.from_email.as_deref().unwrap_or(&self.smtp_user)
    }

    /// `From` header value
    pub fn from_mailbox(&self) -> String {
        if self.from_name.is_empty() {
            self.from_address().to_string()
        } else {
            format!("{} <{}>", self.from_name, self.from_address())
        }
    }

    /// Check that an authenticated session can be attempted
    pub fn validate(&self) -> Result<(), String> {
        if self.smtp_host.trim().is_empty() {
            return Err("smtp_host is required".into());
        }
        if self.smtp_port == 0 {
            return Err("smtp_port must be > 0".into());
        }
        if self.smtp_user.trim().is_empty() {
            return Err("smtp_user is required".into());
        }
        if self.smtp_password.is_empty() {
            return Err("smtp_password is required (set GEOALERT_SMTP_PASSWORD)".into());
        }
        if !self.from_address().contains('@') {
            return Err(format!(
                "from address must be an email address: {:?}",
                self.from_address()
            ));
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be > 0".into());
        }
        Ok(())
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("html", &self.html)
            .field("timeout_ms", &self.timeout_ms)
            .field("verify_on_start", &self.verify_on_start)
            .finish()
    }
}

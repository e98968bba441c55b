//! Service configuration
//!
//! One JSON file, one section per component:
//!
//! ```json
//! {
//!   "store_path": "subscribers.csv",
//!   "hazard": { "base_url": "http://127.0.0.1:5000" },
//!   "mail": { "smtp_host": "smtp.example.com", "smtp_user": "alerts@example.com" },
//!   "sweep": { "interval_secs": 300, "workers": 8 }
//! }
//! ```
//!
//! Deployment secrets may be supplied through the environment instead of
//! the file; environment values win.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::hazard::HazardClientConfig;
use crate::notifier::MailConfig;
use crate::sweep::SweepConfig;

pub const SMTP_HOST_ENV: &str = "GEOALERT_SMTP_HOST";
pub const SMTP_PORT_ENV: &str = "GEOALERT_SMTP_PORT";
pub const SMTP_USER_ENV: &str = "GEOALERT_SMTP_USER";
pub const SMTP_PASSWORD_ENV: &str = "GEOALERT_SMTP_PASSWORD";
pub const HAZARD_URL_ENV: &str = "GEOALERT_HAZARD_URL";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Subscriber file; relative paths resolve against the config file's
    /// directory (default: "subscribers.csv")
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Hazard classifier endpoint
    pub hazard: HazardClientConfig,

    /// SMTP settings; only `--dry-run` may leave this out
    #[serde(default)]
    pub mail: Option<MailConfig>,

    /// Sweep scheduling
    #[serde(default)]
    pub sweep: SweepConfig,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("subscribers.csv")
}

impl Config {
    /// Load configuration from file, apply environment overrides, validate
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let mut config = Self::parse(&content)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;

        if config.store_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.store_path = dir.join(&config.store_path);
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse without touching the environment or the filesystem
    pub fn parse(content: &str) -> CliResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))
    }

    /// Overlay values found by `var` on top of the file's values
    ///
    /// A `mail` section is created when both host and user come from the
    /// environment.
    pub fn apply_overrides<F>(&mut self, var: F) -> CliResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(HAZARD_URL_ENV) {
            self.hazard.base_url = url;
        }

        let host = var(SMTP_HOST_ENV);
        let user = var(SMTP_USER_ENV);

        if self.mail.is_none() {
            if let (Some(host), Some(user)) = (&host, &user) {
                self.mail = Some(MailConfig::new(host.as_str(), user.as_str(), ""));
            }
        }

        if let Some(mail) = self.mail.as_mut() {
            if let Some(host) = host {
                mail.smtp_host = host;
            }
            if let Some(user) = user {
                mail.smtp_user = user;
            }
            if let Some(password) = var(SMTP_PASSWORD_ENV) {
                mail.smtp_password = password;
            }
            if let Some(port) = var(SMTP_PORT_ENV) {
                mail.smtp_port = port.trim().parse().map_err(|_| {
                    CliError::config_error(format!("Invalid {}: {:?}", SMTP_PORT_ENV, port))
                })?;
            }
        }

        Ok(())
    }

    /// Validate everything every command needs
    ///
    /// Mail settings are checked separately by [`Config::delivery_mail`],
    /// since only sending commands need them.
    pub fn validate(&self) -> CliResult<()> {
        if self.store_path.as_os_str().is_empty() {
            return Err(CliError::config_error("store_path must not be empty"));
        }

        self.hazard
            .endpoint()
            .map_err(|e| CliError::config_error(format!("hazard: {}", e)))?;

        self.sweep
            .validate()
            .map_err(|e| CliError::config_error(format!("sweep: {}", e)))?;

        Ok(())
    }

    /// Mail settings for real delivery, validated
    pub fn delivery_mail(&self) -> CliResult<&MailConfig> {
        let mail = self.mail.as_ref().ok_or_else(|| {
            CliError::config_error("mail section is required unless --dry-run is given")
        })?;

        mail.validate()
            .map_err(|e| CliError::config_error(format!("mail: {}", e)))?;

        Ok(mail)
    }

    /// Sender shown on dry-run messages
    pub fn dry_run_sender(&self) -> String {
        self.mail
            .as_ref()
            .map(MailConfig::from_mailbox)
            .unwrap_or_else(|| "geoalert@localhost".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"{"hazard": {"base_url": "http://127.0.0.1:5000"}}"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.store_path, PathBuf::from("subscribers.csv"));
        assert_eq!(config.hazard.path, "/is_dangerous");
        assert!(config.mail.is_none());
        assert_eq!(config.sweep.workers, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_hazard_rejected() {
        assert!(Config::parse(r#"{"store_path": "s.csv"}"#).is_err());
    }

    #[test]
    fn test_bad_hazard_scheme_rejected() {
        let config =
            Config::parse(r#"{"hazard": {"base_url": "ftp://example.com"}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_creates_mail_section() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config
            .apply_overrides(env(&[
                (SMTP_HOST_ENV, "smtp.example.com"),
                (SMTP_USER_ENV, "alerts@example.com"),
                (SMTP_PASSWORD_ENV, "secret"),
                (SMTP_PORT_ENV, "2525"),
            ]))
            .unwrap();

        let mail = config.delivery_mail().unwrap();
        assert_eq!(mail.smtp_host, "smtp.example.com");
        assert_eq!(mail.smtp_port, 2525);
        assert_eq!(mail.smtp_password, "secret");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::parse(
            r#"{
                "hazard": {"base_url": "http://old:5000"},
                "mail": {"smtp_host": "old", "smtp_user": "alerts@example.com", "smtp_password": "pw"}
            }"#,
        )
        .unwrap();

        config
            .apply_overrides(env(&[
                (HAZARD_URL_ENV, "http://new:5000"),
                (SMTP_HOST_ENV, "new"),
            ]))
            .unwrap();

        assert_eq!(config.hazard.base_url, "http://new:5000");
        assert_eq!(config.mail.as_ref().unwrap().smtp_host, "new");
        assert_eq!(config.mail.as_ref().unwrap().smtp_password, "pw");
    }

    #[test]
    fn test_bad_port_env_rejected() {
        let mut config = Config::parse(
            r#"{"hazard": {"base_url": "http://h"}, "mail": {"smtp_host": "h", "smtp_user": "u@x.com"}}"#,
        )
        .unwrap();

        assert!(config
            .apply_overrides(env(&[(SMTP_PORT_ENV, "smtp")]))
            .is_err());
    }

    #[test]
    fn test_delivery_requires_mail() {
        let config = Config::parse(MINIMAL).unwrap();

        assert!(config.delivery_mail().is_err());
        assert_eq!(config.dry_run_sender(), "geoalert@localhost");
    }

    #[test]
    fn test_load_resolves_store_path_next_to_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geoalert.json");
        fs::write(&path, MINIMAL).unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.store_path, dir.path().join("subscribers.csv"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(&dir.path().join("nope.json")).unwrap_err();
        assert_eq!(err.code_str(), "GEOALERT_CLI_CONFIG_ERROR");
    }
}

//! SMTP account configuration.
//!
//! Stored as JSON:
//!
//! ```json
//! {
//!   "host": "smtp.example.com",
//!   "security": "starttls",
//!   "credentials": { "username": "me@example.com", "password": "secret" }
//! }
//! ```
//!
//! The `MAILPOST_PASSWORD` environment variable, when set, replaces the
//! configured password.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding the configured password.
pub const PASSWORD_ENV: &str = "MAILPOST_PASSWORD";

/// Security/encryption mode for the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// STARTTLS when the server offers it, plaintext otherwise.
    #[default]
    Opportunistic,
    /// STARTTLS upgrade after plaintext connect; required.
    StartTls,
    /// Implicit TLS (connect directly with TLS).
    Tls,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::Opportunistic => "STARTTLS if available",
            Self::StartTls => "STARTTLS",
            Self::Tls => "SSL/TLS",
        }
    }
}

impl From<Security> for mailpost_smtp::connection::Security {
    fn from(security: Security) -> Self {
        match security {
            Security::None => Self::None,
            Security::Opportunistic => Self::Opportunistic,
            Security::StartTls => Self::StartTls,
            Security::Tls => Self::Implicit,
        }
    }
}

/// Username and password for AUTH PLAIN.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username for authentication.
    pub username: String,
    /// Password for authentication.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SMTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port (default: 465 for TLS, 587 for STARTTLS, 25 for none).
    #[serde(default)]
    pub port: Option<u16>,
    /// Security mode.
    #[serde(default)]
    pub security: Security,
    /// Credentials; authentication is skipped when absent.
    #[serde(default)]
    pub credentials: Option<Credentials>,
    /// Name announced in EHLO.
    #[serde(default = "default_client_hostname")]
    pub client_hostname: String,
    /// Connection timeout in seconds; 0 disables it.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Socket read/write timeout in seconds; 0 disables it.
    #[serde(default = "default_io_timeout")]
    pub io_timeout_secs: u64,
}

fn default_client_hostname() -> String {
    "localhost".to_string()
}

const fn default_connect_timeout() -> u64 {
    30
}

const fn default_io_timeout() -> u64 {
    60
}

impl SmtpConfig {
    /// Creates a configuration for `host` with defaults for everything else.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            credentials: None,
            client_hostname: default_client_hostname(),
            connect_timeout_secs: default_connect_timeout(),
            io_timeout_secs: default_io_timeout(),
        }
    }

    /// Loads a JSON configuration file and applies [`PASSWORD_ENV`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_json(&contents)?;
        config.apply_password_override(std::env::var(PASSWORD_ENV).ok());
        tracing::debug!(host = %config.host, path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parses a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Replaces the configured password, if there are credentials to update.
    pub fn apply_password_override(&mut self, password: Option<String>) {
        if let (Some(credentials), Some(password)) = (self.credentials.as_mut(), password) {
            credentials.password = password;
        }
    }

    /// Returns the port, falling back to the default for the security mode.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        let security: mailpost_smtp::connection::Security = self.security.into();
        self.port.unwrap_or_else(|| security.default_port())
    }

    /// Converts into the transport's connection configuration.
    #[must_use]
    pub fn connection_config(&self) -> mailpost_smtp::connection::Config {
        mailpost_smtp::connection::Config::builder(&self.host)
            .port(self.effective_port())
            .security(self.security.into())
            .client_hostname(&self.client_hostname)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .io_timeout(Duration::from_secs(self.io_timeout_secs))
            .build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_uses_defaults() {
        let config = SmtpConfig::from_json(r#"{ "host": "smtp.example.com" }"#).unwrap();
        assert_eq!(config, SmtpConfig::new("smtp.example.com"));
        assert_eq!(config.effective_port(), 587);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn full_json() {
        let config = SmtpConfig::from_json(
            r#"{
                "host": "mail.example.org",
                "port": 2525,
                "security": "tls",
                "credentials": { "username": "me", "password": "pw" },
                "client_hostname": "laptop.example.org",
                "io_timeout_secs": 0
            }"#,
        )
        .unwrap();

        assert_eq!(config.security, Security::Tls);
        assert_eq!(config.effective_port(), 2525);

        let conn = config.connection_config();
        assert_eq!(conn.host, "mail.example.org");
        assert_eq!(conn.security, mailpost_smtp::connection::Security::Implicit);
        assert_eq!(conn.client_hostname, "laptop.example.org");
        assert_eq!(conn.io_timeout, Duration::ZERO);
        assert_eq!(conn.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn security_names() {
        for (name, security) in [
            ("none", Security::None),
            ("opportunistic", Security::Opportunistic),
            ("starttls", Security::StartTls),
            ("tls", Security::Tls),
        ] {
            let json = format!(r#"{{ "host": "h", "security": "{name}" }}"#);
            assert_eq!(SmtpConfig::from_json(&json).unwrap().security, security);
        }
        assert!(SmtpConfig::from_json(r#"{ "host": "h", "security": "ssl" }"#).is_err());
    }

    #[test]
    fn security_display_names() {
        assert_eq!(Security::default().display_name(), "STARTTLS if available");
        assert_eq!(Security::Tls.display_name(), "SSL/TLS");
        assert_eq!(Security::None.display_name(), "None (insecure)");
    }

    #[test]
    fn zero_connect_timeout_is_carried_through() {
        let config =
            SmtpConfig::from_json(r#"{ "host": "h", "connect_timeout_secs": 0 }"#).unwrap();
        assert_eq!(config.connection_config().connect_timeout, Duration::ZERO);
    }

    #[test]
    fn password_override() {
        let mut config = SmtpConfig::new("h");
        config.apply_password_override(Some("ignored".into()));
        assert!(config.credentials.is_none());

        config.credentials = Some(Credentials {
            username: "me".into(),
            password: "old".into(),
        });
        config.apply_password_override(None);
        assert_eq!(config.credentials.as_ref().unwrap().password, "old");
        config.apply_password_override(Some("new".into()));
        assert_eq!(config.credentials.as_ref().unwrap().password, "new");
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let credentials = Credentials {
            username: "me".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{credentials:?}");
        assert!(debug.contains("me"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SmtpConfig::load("/nonexistent/mailpost.json").unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}

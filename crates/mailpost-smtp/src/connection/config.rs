//! Connection configuration types.

use std::time::Duration;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 25). **Not recommended for production.**
    None,
    /// Plaintext connect, then STARTTLS; fails if the server does not offer it
    /// (port 587).
    StartTls,
    /// Plaintext connect, STARTTLS only when the server advertises it
    /// (port 587).
    #[default]
    Opportunistic,
    /// TLS from the start (port 465).
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls | Self::Opportunistic => 587,
            Self::Implicit => 465,
        }
    }
}

/// SMTP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname, also used as the TLS server name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Name announced in EHLO.
    pub client_hostname: String,
    /// Connection timeout. Zero disables it.
    pub connect_timeout: Duration,
    /// Socket read/write timeout. Zero disables it.
    pub io_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with opportunistic STARTTLS on port 587.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    client_hostname: String,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            client_hostname: "localhost".to_string(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(60),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the name announced in EHLO.
    #[must_use]
    pub fn client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }

    /// Sets the connection timeout; zero waits as long as the OS allows.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the I/O timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            client_hostname: self.client_hostname,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_follow_security() {
        assert_eq!(Config::new("smtp.example.com").port, 587);
        assert_eq!(
            Config::builder("h").security(Security::Implicit).build().port,
            465
        );
        assert_eq!(
            Config::builder("h").security(Security::None).build().port,
            25
        );
    }

    #[test]
    fn explicit_port_wins() {
        let config = Config::builder("smtp.example.com")
            .security(Security::Implicit)
            .port(2465)
            .client_hostname("client.example.com")
            .io_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.port, 2465);
        assert_eq!(config.client_hostname, "client.example.com");
        assert_eq!(config.io_timeout, Duration::from_secs(5));
    }
}

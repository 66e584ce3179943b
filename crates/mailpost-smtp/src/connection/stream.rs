//! Low-level SMTP stream handling.

use super::config::{Config, Security};
use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type TlsStream = StreamOwned<ClientConnection, TcpStream>;

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<TlsStream>>),
}

impl SmtpStream {
    /// Reads one line from the stream, without the line terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the server closed the connection.
    pub fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match self {
            Self::Tcp(reader) => reader.read_line(&mut line)?,
            Self::Tls(reader) => reader.read_line(&mut line)?,
        };
        if read == 0 {
            return Err(Error::Protocol("Connection closed by server".into()));
        }
        Ok(line.trim_end().to_string())
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.write_all(data)?;
        self.flush()?;
        Ok(())
    }

    /// Returns true if the stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Upgrades a TCP stream to TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted or the TLS
    /// handshake fails.
    pub fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let tcp_stream = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::Protocol("Already using TLS".into())),
        };

        let tls_stream = tls_handshake(hostname, tcp_stream)?;
        Ok(Self::Tls(Box::new(BufReader::new(tls_stream))))
    }
}

impl Write for SmtpStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(reader) => reader.get_mut().write(buf),
            Self::Tls(reader) => reader.get_mut().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(reader) => reader.get_mut().flush(),
            Self::Tls(reader) => reader.get_mut().flush(),
        }
    }
}

/// Connects to the configured SMTP server.
///
/// With [`Security::Implicit`] the TLS handshake is completed before this
/// returns; every other mode yields a plain TCP stream.
///
/// # Errors
///
/// Returns an error if the host cannot be resolved, no address accepts the
/// connection within the timeout, or the TLS handshake fails.
pub fn connect(config: &Config) -> Result<SmtpStream> {
    let tcp_stream = open_tcp(config)?;

    if config.security == Security::Implicit {
        let tls_stream = tls_handshake(&config.host, tcp_stream)?;
        return Ok(SmtpStream::Tls(Box::new(BufReader::new(tls_stream))));
    }

    Ok(SmtpStream::Tcp(BufReader::new(tcp_stream)))
}

fn open_tcp(config: &Config) -> Result<TcpStream> {
    let addrs = (config.host.as_str(), config.port).to_socket_addrs()?;

    let mut last_error = None;
    for addr in addrs {
        debug!(%addr, "connecting");
        let attempt = match non_zero(config.connect_timeout) {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                let timeout = non_zero(config.io_timeout);
                stream.set_read_timeout(timeout)?;
                stream.set_write_timeout(timeout)?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error
        .unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("No addresses for {}", config.host),
            )
        })
        .into())
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

/// Wraps `tcp_stream` in TLS and drives the handshake to completion so
/// certificate problems surface here rather than on the first command.
fn tls_handshake(hostname: &str, tcp_stream: TcpStream) -> Result<TlsStream> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;

    let connection = ClientConnection::new(tls_config(), server_name)?;
    let mut stream = StreamOwned::new(connection, tcp_stream);
    while stream.conn.is_handshaking() {
        stream.conn.complete_io(&mut stream.sock)?;
    }

    debug!(hostname, "TLS established");
    Ok(stream)
}

/// Creates a TLS client configuration with the webpki root certificates.
fn tls_config() -> Arc<ClientConfig> {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

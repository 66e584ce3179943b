//! Type-state SMTP client.

use super::data::DotWriter;
use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use std::collections::HashSet;
use std::io::{self, BufWriter, Write};
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<S> SmtpConnection for Client<S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Client<Connected> {
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream)?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::from_reply(&greeting));
        }

        let hostname = greeting
            .lines
            .first()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(%hostname, "server greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self.expect_success(Command::Ehlo {
            hostname: client_hostname.to_string(),
        })?;

        // The first line is the server's greeting, not an extension.
        self.server_info.extensions = reply
            .lines
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS, then repeats EHLO as
    /// the server forgets everything learned before the upgrade.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported or if the upgrade fails.
    pub fn starttls(mut self, server_name: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.expect_success(Command::StartTls)?;
        self.stream = self.stream.upgrade_to_tls(server_name)?;
        self.server_info.extensions.clear();

        self.ehlo(client_hostname)
    }

    /// Authenticates using the PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub fn auth_plain(mut self, username: &str, password: &str) -> Result<Client<Authenticated>> {
        let credentials = format!("\0{username}\0{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());

        let reply = self.send_command(&Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(encoded),
        })?;
        if reply.code != ReplyCode::AUTH_SUCCEEDED {
            return Err(Error::from_reply(&reply));
        }

        Ok(self.transition())
    }

    /// Starts a mail transaction without authentication (if server allows).
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub fn mail_from(mut self, from: Address) -> Result<Client<MailTransaction>> {
        self.expect_success(Command::MailFrom { from })?;
        Ok(self.transition())
    }
}

impl Client<Authenticated> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub fn mail_from(mut self, from: Address) -> Result<Client<MailTransaction>> {
        self.expect_success(Command::MailFrom { from })?;
        Ok(self.transition())
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded>> {
        self.expect_success(Command::RcptTo { to })?;
        Ok(self.transition())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.expect_success(Command::RcptTo { to })?;
        Ok(self)
    }

    /// Sends DATA and opens the message data stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer 354.
    pub fn data(mut self) -> Result<DataStream> {
        let reply = self.send_command(&Command::Data)?;
        if reply.code != ReplyCode::START_DATA {
            return Err(Error::from_reply(&reply));
        }

        Ok(DataStream {
            writer: DotWriter::new(BufWriter::new(self.stream)),
            server_info: self.server_info,
        })
    }
}

// Common implementation for all states
impl<S> Client<S> {
    fn transition<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        debug!(command = cmd.verb(), "sending SMTP command");
        self.stream.send(&cmd.serialize())?;
        let reply = read_reply(&mut self.stream)?;
        debug!(command = cmd.verb(), code = %reply.code, "SMTP reply");
        Ok(reply)
    }

    fn expect_success(&mut self, cmd: Command) -> Result<Reply> {
        let reply = self.send_command(&cmd)?;
        if !reply.is_success() {
            warn!(command = cmd.verb(), code = %reply.code, "command rejected");
            return Err(Error::from_reply(&reply));
        }
        Ok(reply)
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit)?;
        if !reply.is_success() {
            return Err(Error::from_reply(&reply));
        }
        Ok(())
    }
}

fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line()?;
        let is_last = is_last_reply_line(&line);
        lines.push(line);
        if is_last {
            break;
        }
    }
    parse_reply(&lines)
}

/// Open DATA stream of a mail transaction.
///
/// Everything written is dot-stuffed and buffered before it reaches the
/// socket. [`close`](Self::close) sends the terminator and waits for the
/// server to accept or reject the message; dropping the stream instead leaves
/// the transaction unfinished.
#[derive(Debug)]
pub struct DataStream {
    writer: DotWriter<BufWriter<SmtpStream>>,
    server_info: ServerInfo,
}

impl DataStream {
    /// Terminates the message and reads the server's verdict.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the terminator fails or the server rejects
    /// the message.
    pub fn close(self) -> Result<Client<Connected>> {
        let mut stream = self
            .writer
            .finish()?
            .into_inner()
            .map_err(io::IntoInnerError::into_error)?;

        let reply = read_reply(&mut stream)?;
        debug!(code = %reply.code, "message data reply");
        if !reply.is_success() {
            return Err(Error::from_reply(&reply));
        }

        Ok(Client {
            stream,
            server_info: self.server_info,
            _state: PhantomData,
        })
    }
}

impl SmtpConnection for DataStream {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl Write for DataStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

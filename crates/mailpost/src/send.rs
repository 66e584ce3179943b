//! Sending a composed message over one SMTP transaction.

use crate::config::{Security, SmtpConfig};
use crate::error::{Error, Result};
use mailpost_mime::{Message, compose};
use mailpost_smtp::connection::connect;
use mailpost_smtp::{
    Address, AuthMechanism, Authenticated, Client, Connected, MailTransaction, SmtpConnection,
};
use tracing::{debug, info, warn};

/// A ready SMTP session, with or without authentication.
#[derive(Debug)]
pub enum Session {
    /// No credentials were configured.
    Anonymous(Client<Connected>),
    /// AUTH PLAIN succeeded.
    Authenticated(Client<Authenticated>),
}

impl Session {
    fn mail_from(self, from: Address) -> mailpost_smtp::Result<Client<MailTransaction>> {
        match self {
            Self::Anonymous(client) => client.mail_from(from),
            Self::Authenticated(client) => client.mail_from(from),
        }
    }
}

/// Opens a session: connect, greeting, EHLO, STARTTLS and authentication as
/// configured. Credentials require the server to advertise `AUTH PLAIN`.
///
/// With [`Security::Opportunistic`] the upgrade happens only when the server
/// advertises STARTTLS. [`Security::StartTls`] fails if it does not.
///
/// # Errors
///
/// Returns [`Error::Connection`] if any step fails.
pub fn connect_session(config: &SmtpConfig) -> Result<Session> {
    let conn = config.connection_config();
    debug!(
        host = %conn.host,
        port = conn.port,
        security = config.security.display_name(),
        "connecting"
    );

    let stream = connect(&conn).map_err(Error::Connection)?;
    let client = Client::from_stream(stream)
        .and_then(|client| client.ehlo(&conn.client_hostname))
        .map_err(Error::Connection)?;

    let client = match config.security {
        Security::StartTls => client.starttls(&conn.host, &conn.client_hostname),
        Security::Opportunistic if client.server_info().supports_starttls() => {
            client.starttls(&conn.host, &conn.client_hostname)
        }
        Security::Opportunistic => {
            warn!(host = %conn.host, "server does not offer STARTTLS, continuing in plaintext");
            Ok(client)
        }
        Security::None | Security::Tls => Ok(client),
    }
    .map_err(Error::Connection)?;

    let Some(credentials) = &config.credentials else {
        return Ok(Session::Anonymous(client));
    };
    if !client
        .server_info()
        .auth_mechanisms()
        .contains(&AuthMechanism::Plain)
    {
        return Err(Error::Connection(mailpost_smtp::Error::NotSupported(
            "AUTH PLAIN".into(),
        )));
    }

    client
        .auth_plain(&credentials.username, &credentials.password)
        .map(Session::Authenticated)
        .map_err(Error::Connection)
}

/// Runs one mail transaction on an open session.
///
/// Recipients are added in order and the message is composed straight into
/// the data stream. On success the client is back in the connected state and
/// can carry another transaction or [`quit`](Client::quit).
///
/// # Errors
///
/// - [`Error::NoRecipients`] if the message has no recipients
/// - [`Error::Transaction`] if the server rejects a command or the message
/// - [`Error::StreamWrite`] if writing message data fails
/// - [`Error::Compose`] if an attachment payload cannot be read
pub fn deliver(session: Session, message: Message<'_>) -> Result<Client<Connected>> {
    let recipients = message.to.clone();
    let Some((first, rest)) = recipients.split_first() else {
        return Err(Error::NoRecipients);
    };

    let transaction = session
        .mail_from(Address::new(&message.from))
        .map_err(Error::Transaction)?;
    let mut client = transaction
        .rcpt_to(Address::new(first))
        .map_err(Error::Transaction)?;
    for recipient in rest {
        client = client
            .rcpt_to(Address::new(recipient))
            .map_err(Error::Transaction)?;
    }

    let attachments = message.attachments.len();
    let data = client.data().map_err(Error::Transaction)?;
    let data = compose(message, data).map_err(Error::from_compose)?;
    let client = data.close().map_err(Error::from_close)?;

    info!(recipients = recipients.len(), attachments, "message accepted");
    Ok(client)
}

/// Sends `message` through the server described by `config`.
///
/// The connection is closed with QUIT afterwards. A failed QUIT after the
/// server accepted the message is logged and otherwise ignored.
///
/// # Errors
///
/// See [`connect_session`] and [`deliver`].
pub fn send_mail(config: &SmtpConfig, message: Message<'_>) -> Result<()> {
    if message.to.is_empty() {
        return Err(Error::NoRecipients);
    }

    let session = connect_session(config)?;
    let client = deliver(session, message)?;
    if let Err(err) = client.quit() {
        warn!(error = %err, "QUIT failed after delivery");
    }
    Ok(())
}

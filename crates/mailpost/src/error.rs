//! Error types for sending mail.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while sending a message.
///
/// Nothing is retried. Once a [`StreamWrite`](Error::StreamWrite) error is
/// returned the server holds a partial message and the transaction must be
/// treated as failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Connecting, TLS negotiation or authentication failed; no transaction
    /// was started.
    #[error("Connection failed: {0}")]
    Connection(#[source] mailpost_smtp::Error),

    /// The server rejected MAIL FROM, RCPT TO, DATA or the message itself.
    #[error("Transaction rejected: {0}")]
    Transaction(#[source] mailpost_smtp::Error),

    /// Writing message data failed part-way through.
    #[error("Writing message data failed: {0}")]
    StreamWrite(#[source] io::Error),

    /// The message could not be composed, e.g. an attachment payload could
    /// not be read. The server holds a partial message.
    #[error("Composition failed: {0}")]
    Compose(#[source] mailpost_mime::Error),

    /// The message has no recipients.
    #[error("Message has no recipients")]
    NoRecipients,

    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl Error {
    /// Classifies a composition failure.
    pub(crate) fn from_compose(err: mailpost_mime::Error) -> Self {
        match err {
            mailpost_mime::Error::Io(e) => Self::StreamWrite(e),
            other => Self::Compose(other),
        }
    }

    /// Classifies a failure while closing the data stream.
    pub(crate) fn from_close(err: mailpost_smtp::Error) -> Self {
        match err {
            mailpost_smtp::Error::Io(e) => Self::StreamWrite(e),
            other => Self::Transaction(other),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_io_is_stream_write() {
        let err = Error::from_compose(mailpost_mime::Error::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "pipe",
        )));
        assert!(matches!(err, Error::StreamWrite(_)));

        let err = Error::from_compose(mailpost_mime::Error::InvalidContentType("x".into()));
        assert!(matches!(err, Error::Compose(_)));
    }

    #[test]
    fn unreadable_attachment_is_not_a_stream_write() {
        let err = Error::from_compose(mailpost_mime::Error::AttachmentRead {
            filename: "a.txt".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "locked"),
        });
        assert!(matches!(
            err,
            Error::Compose(mailpost_mime::Error::AttachmentRead { .. })
        ));
        assert_eq!(
            err.to_string(),
            "Composition failed: Failed to read attachment a.txt: locked"
        );
    }

    #[test]
    fn close_reply_is_transaction() {
        let err = Error::from_close(mailpost_smtp::Error::smtp_error(554, "no"));
        assert!(matches!(err, Error::Transaction(_)));
        assert_eq!(
            err.to_string(),
            "Transaction rejected: SMTP error 554: no"
        );

        let err = Error::from_close(mailpost_smtp::Error::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            "slow",
        )));
        assert!(matches!(err, Error::StreamWrite(_)));
    }
}

//! Error types for SMTP operations.

use crate::types::{Reply, ReplyCode};
use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// The server answered with an unexpected reply code.
    #[error("SMTP error {code}: {message}")]
    SmtpError {
        /// Reply code, e.g. 550.
        code: u16,
        /// Reply text, lines joined by newlines.
        message: String,
    },

    /// Malformed reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server did not advertise a required extension.
    #[error("Server does not support {0}")]
    NotSupported(String),
}

impl Error {
    /// Creates an SMTP error from a reply code and message.
    #[must_use]
    pub fn smtp_error(code: u16, message: impl Into<String>) -> Self {
        Self::SmtpError {
            code,
            message: message.into(),
        }
    }

    /// Converts a rejected reply into an error.
    #[must_use]
    pub fn from_reply(reply: &Reply) -> Self {
        Self::smtp_error(reply.code.as_u16(), reply.text())
    }

    /// Reply code carried by an [`Error::SmtpError`].
    #[must_use]
    pub const fn reply_code(&self) -> Option<ReplyCode> {
        match self {
            Self::SmtpError { code, .. } => Some(ReplyCode::new(*code)),
            _ => None,
        }
    }

    /// True for 5xx rejections; resending unchanged will not help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.reply_code().is_some_and(ReplyCode::is_permanent)
    }

    /// True for 4xx rejections.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.reply_code().is_some_and(ReplyCode::is_transient)
    }
}

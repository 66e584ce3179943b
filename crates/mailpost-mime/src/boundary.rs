//! Multipart boundary tokens.

use rand::Rng;
use std::fmt::{self, Write as _};

/// Number of random bytes behind a generated boundary.
const BOUNDARY_BYTES: usize = 30;

/// Delimiter separating the parts of one multipart message.
///
/// The token is not checked against the message content; callers are
/// trusted not to embed it in bodies or attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeBoundary(String);

impl MimeBoundary {
    /// Generates a random boundary of 60 lowercase hex characters.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; BOUNDARY_BYTES];
        rand::thread_rng().fill(&mut bytes[..]);

        let mut token = String::with_capacity(BOUNDARY_BYTES * 2);
        for byte in bytes {
            let _ = write!(token, "{byte:02x}");
        }
        Self(token)
    }

    /// Uses a caller-chosen boundary, e.g. for reproducible output.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the bare token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the delimiter line opening a part: `--<token>`.
    #[must_use]
    pub fn delimiter(&self) -> String {
        format!("--{}", self.0)
    }

    /// Returns the close delimiter ending the multipart body: `--<token>--`.
    #[must_use]
    pub fn close_delimiter(&self) -> String {
        format!("--{}--", self.0)
    }
}

impl Default for MimeBoundary {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for MimeBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

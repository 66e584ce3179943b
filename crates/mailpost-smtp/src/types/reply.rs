//! SMTP reply types.

use std::fmt;

/// SMTP reply from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code (e.g., 250).
    pub code: ReplyCode,
    /// Text of each reply line, without code and separator.
    pub lines: Vec<String>,
}

impl Reply {
    /// Creates a new reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the reply text with lines joined by newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Reply class, taken from the first digit of the code (RFC 5321 section 4.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// 2yz: the command was accepted.
    Completion,
    /// 3yz: the server waits for more input, as after DATA.
    Intermediate,
    /// 4yz: temporary failure; the same command may succeed later.
    Transient,
    /// 5yz: the command will not succeed as sent.
    Permanent,
    /// Any other first digit.
    Unknown,
}

/// Three-digit SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220, greeting.
    pub const SERVICE_READY: Self = Self(220);
    /// 235, AUTH accepted.
    pub const AUTH_SUCCEEDED: Self = Self(235);
    /// 250
    pub const OK: Self = Self(250);
    /// 354, send message data.
    pub const START_DATA: Self = Self(354);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Classifies the code by its first digit.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 / 100 {
            2 => ReplyClass::Completion,
            3 => ReplyClass::Intermediate,
            4 => ReplyClass::Transient,
            5 => ReplyClass::Permanent,
            _ => ReplyClass::Unknown,
        }
    }

    /// Returns true for 2xx codes.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.class(), ReplyClass::Completion)
    }

    /// Returns true for 4xx codes.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self.class(), ReplyClass::Transient)
    }

    /// Returns true for 5xx codes.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self.class(), ReplyClass::Permanent)
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(ReplyCode::OK.class(), ReplyClass::Completion);
        assert_eq!(ReplyCode::START_DATA.class(), ReplyClass::Intermediate);
        assert_eq!(ReplyCode::new(421).class(), ReplyClass::Transient);
        assert_eq!(ReplyCode::new(550).class(), ReplyClass::Permanent);
        assert_eq!(ReplyCode::new(600).class(), ReplyClass::Unknown);
        assert!(!ReplyCode::START_DATA.is_success());
        assert!(ReplyCode::new(451).is_transient());
        assert!(ReplyCode::new(554).is_permanent());
    }

    #[test]
    fn display() {
        assert_eq!(ReplyCode::new(535).to_string(), "535");
    }

    #[test]
    fn reply_text() {
        let reply = Reply::new(
            ReplyCode::OK,
            vec!["smtp.example.com".to_string(), "PIPELINING".to_string()],
        );
        assert!(reply.is_success());
        assert_eq!(reply.text(), "smtp.example.com\nPIPELINING");
    }
}

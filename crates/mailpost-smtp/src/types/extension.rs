//! EHLO extension keywords.

/// An extension advertised in the EHLO reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH with the mechanisms the client understands
    Auth(Vec<AuthMechanism>),
    /// SIZE with the optional maximum message size
    Size(Option<usize>),
    /// 8BITMIME
    EightBitMime,
    /// PIPELINING
    Pipelining,
    /// Anything else, kept verbatim
    Unknown(String),
}

impl Extension {
    /// Parses one EHLO extension line (without the reply code).
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(words.filter_map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(words.next().and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// SASL mechanism offered by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// PLAIN (RFC 4616)
    Plain,
    /// LOGIN (legacy)
    Login,
}

impl AuthMechanism {
    /// Parses a mechanism name; unknown mechanisms are ignored.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("PLAIN") {
            Some(Self::Plain)
        } else if s.eq_ignore_ascii_case("LOGIN") {
            Some(Self::Login)
        } else {
            None
        }
    }

    /// Returns the mechanism name as sent in `AUTH`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starttls_is_case_insensitive() {
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn auth_keeps_known_mechanisms() {
        assert_eq!(
            Extension::parse("AUTH CRAM-MD5 PLAIN login XOAUTH2"),
            Extension::Auth(vec![AuthMechanism::Plain, AuthMechanism::Login])
        );
    }

    #[test]
    fn size_with_and_without_limit() {
        assert_eq!(
            Extension::parse("SIZE 35882577"),
            Extension::Size(Some(35_882_577))
        );
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
    }

    #[test]
    fn unknown_and_empty_lines() {
        assert_eq!(
            Extension::parse("ENHANCEDSTATUSCODES"),
            Extension::Unknown("ENHANCEDSTATUSCODES".to_string())
        );
        assert!(matches!(Extension::parse(""), Extension::Unknown(_)));
    }

    #[test]
    fn mechanism_names() {
        assert_eq!(AuthMechanism::Plain.as_str(), "PLAIN");
        assert_eq!(AuthMechanism::parse("Login"), Some(AuthMechanism::Login));
        assert_eq!(AuthMechanism::parse("GSSAPI"), None);
    }
}

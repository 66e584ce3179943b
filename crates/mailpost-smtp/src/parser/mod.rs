//! SMTP reply parser.
//!
//! Replies are single-line (`250 OK`) or multi-line, where every line but
//! the last uses `-` after the code:
//!
//! ```text
//! 250-smtp.example.com
//! 250-STARTTLS
//! 250 AUTH PLAIN LOGIN
//! ```

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses the code of a single reply line.
fn line_code(line: &str) -> Result<u16> {
    let code = line
        .get(..3)
        .ok_or_else(|| Error::Protocol(format!("Reply too short: {line}")))?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Protocol(format!("Invalid reply code: {code}")));
    }
    code.parse()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {code}")))
}

/// Assembles a reply from its raw lines (CRLF already stripped).
///
/// # Errors
///
/// Returns [`Error::Protocol`] if there are no lines, a line is malformed, or
/// the lines disagree on the reply code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let first = lines
        .first()
        .ok_or_else(|| Error::Protocol("Empty reply".into()))?;
    let code = line_code(first)?;

    let mut text = Vec::with_capacity(lines.len());
    for line in lines {
        if line_code(line)? != code {
            return Err(Error::Protocol(format!(
                "Reply code changed mid-reply: {line}"
            )));
        }
        match line.as_bytes().get(3) {
            None => text.push(String::new()),
            Some(b' ' | b'-') => text.push(line[4..].to_string()),
            Some(_) => return Err(Error::Protocol(format!("Malformed reply line: {line}"))),
        }
    }

    Ok(Reply::new(ReplyCode::new(code), text))
}

/// Returns true if `line` ends a reply (no `-` continuation marker).
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.as_bytes().get(3) != Some(&b'-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn single_line() {
        let reply = parse_reply(&lines(&["354 End data with <CR><LF>.<CR><LF>"])).unwrap();
        assert_eq!(reply.code, ReplyCode::START_DATA);
        assert_eq!(reply.lines, vec!["End data with <CR><LF>.<CR><LF>"]);
    }

    #[test]
    fn multi_line_ehlo() {
        let reply = parse_reply(&lines(&[
            "250-mx.example.com greets you",
            "250-STARTTLS",
            "250 AUTH PLAIN",
        ]))
        .unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(
            reply.lines,
            vec!["mx.example.com greets you", "STARTTLS", "AUTH PLAIN"]
        );
    }

    #[test]
    fn bare_code() {
        let reply = parse_reply(&lines(&["250"])).unwrap();
        assert_eq!(reply.lines, vec![String::new()]);
    }

    #[test]
    fn last_line_detection() {
        assert!(is_last_reply_line("250 OK"));
        assert!(is_last_reply_line("250"));
        assert!(!is_last_reply_line("250-PIPELINING"));
    }

    #[test]
    fn rejects_malformed() {
        assert!(parse_reply(&[]).is_err());
        assert!(parse_reply(&lines(&["25"])).is_err());
        assert!(parse_reply(&lines(&["ABC OK"])).is_err());
        assert!(parse_reply(&lines(&["250xOK"])).is_err());
        assert!(parse_reply(&lines(&["250-one", "550 two"])).is_err());
    }
}

//! Incremental message composition onto a mail data stream.
//!
//! A [`Composer`] writes one message straight into the sink in wire order:
//!
//! ```text
//! ┌──────┐ write_headers ┌────────────────┐ write_body ┌─────────────┐
//! │ Idle │ ────────────→ │ HeadersWritten │ ─────────→ │ BodyWritten │
//! └──────┘               └────────────────┘            └─────────────┘
//!                                                         │ write_part (multipart only)
//!                                                         ▼
//!                                                     ┌──────────────┐
//!                                                     │ PartsWritten │ ⟲ write_part
//!                                                     └──────────────┘
//! ```
//!
//! `close` is accepted from `BodyWritten` or `PartsWritten` and consumes the
//! composer. Nothing is buffered: a failure leaves whatever was already
//! written on the stream and moves the composer to `Failed`.

use crate::boundary::MimeBoundary;
use crate::content_type::ContentType;
use crate::encoding::{CRLF, LineFoldingBase64Encoder, TransferEncoding};
use crate::error::{Error, Result};
use crate::message::{Attachment, Message};
use std::io::{self, Read, Write};
use tracing::{debug, trace};

/// Payload bytes read per call; a multiple of the 57-byte base64 line input.
const READ_CHUNK: usize = 57 * 144;

/// Progress of a [`Composer`] through one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeState {
    /// Nothing written yet.
    Idle,
    /// Envelope headers (and the multipart preamble) written.
    HeadersWritten,
    /// Text body or blank-body placeholder written.
    BodyWritten,
    /// At least one attachment part written.
    PartsWritten,
    /// A write failed; the stream holds a partial message.
    Failed,
}

/// Writes a single message to a data stream.
#[derive(Debug)]
pub struct Composer<W: Write> {
    sink: W,
    boundary: MimeBoundary,
    multipart: bool,
    state: ComposeState,
}

impl<W: Write> Composer<W> {
    /// Creates a composer with a freshly generated boundary.
    pub fn new(sink: W) -> Self {
        Self::with_boundary(sink, MimeBoundary::generate())
    }

    /// Creates a composer with a fixed boundary.
    pub const fn with_boundary(sink: W, boundary: MimeBoundary) -> Self {
        Self {
            sink,
            boundary,
            multipart: false,
            state: ComposeState::Idle,
        }
    }

    /// Returns the boundary used for multipart messages.
    #[must_use]
    pub const fn boundary(&self) -> &MimeBoundary {
        &self.boundary
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ComposeState {
        self.state
    }

    /// Composes `message` completely and returns the sink.
    ///
    /// Attachments are consumed in [`AttachmentSet`](crate::AttachmentSet)
    /// order. On failure the remaining attachments are dropped unread.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error from the sink or from an attachment reader.
    pub fn compose(mut self, message: Message<'_>) -> Result<W> {
        self.write_headers(&message)?;
        self.write_body(message.body.as_deref())?;
        for attachment in message.attachments {
            self.write_part(attachment)?;
        }
        self.close()
    }

    /// Writes `From`, `Subject` and `To`, plus the multipart preamble when the
    /// message has attachments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the composer is idle, or the
    /// sink's I/O error.
    pub fn write_headers(&mut self, message: &Message<'_>) -> Result<()> {
        self.expect_state("write headers", &[ComposeState::Idle])?;
        self.multipart = message.is_multipart();

        let result = self.emit_headers(message);
        self.advance(result, ComposeState::HeadersWritten)
    }

    fn emit_headers(&mut self, message: &Message<'_>) -> io::Result<()> {
        write!(self.sink, "From: {}{CRLF}", message.from)?;
        if let Some(subject) = &message.subject {
            write!(self.sink, "Subject: {subject}{CRLF}")?;
        }
        write!(self.sink, "To: {}{CRLF}", message.to.join(","))?;

        if self.multipart {
            debug!(boundary = %self.boundary, "composing multipart/mixed message");
            let content_type = ContentType::multipart_mixed(self.boundary.as_str());
            write!(self.sink, "Content-Type: {content_type}{CRLF}")?;
            write!(self.sink, "{}{CRLF}", self.boundary.delimiter())?;
            // Terminated by the blank lines that open the body.
            write!(
                self.sink,
                "Content-Transfer-Encoding: {}",
                TransferEncoding::QuotedPrintable
            )?;
        }

        Ok(())
    }

    /// Writes the text body framed by blank lines, or four blank lines when
    /// there is no body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless headers were just written, or the
    /// sink's I/O error.
    pub fn write_body(&mut self, body: Option<&[u8]>) -> Result<()> {
        self.expect_state("write body", &[ComposeState::HeadersWritten])?;

        let result = match body {
            Some(body) => {
                trace!(len = body.len(), "writing text body");
                self.emit(CRLF.repeat(2).as_bytes())
                    .and_then(|()| self.emit(body))
                    .and_then(|()| self.emit(CRLF.repeat(2).as_bytes()))
            }
            None => self.emit(CRLF.repeat(4).as_bytes()),
        };
        self.advance(result, ComposeState::BodyWritten)
    }

    /// Writes one attachment part and consumes its payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the message was not declared
    /// multipart or the body has not been written, or the I/O error from the
    /// sink or the payload reader.
    pub fn write_part(&mut self, attachment: Attachment<'_>) -> Result<()> {
        self.expect_state(
            "write attachment part",
            &[ComposeState::BodyWritten, ComposeState::PartsWritten],
        )?;
        if !self.multipart {
            return Err(Error::InvalidState {
                operation: "write attachment part to a single-part message",
                state: self.state,
            });
        }

        let result = self.emit_part(attachment);
        self.advance(result, ComposeState::PartsWritten)
    }

    fn emit_part(&mut self, attachment: Attachment<'_>) -> Result<()> {
        let Attachment {
            filename,
            mut payload,
        } = attachment;
        let content_type = ContentType::for_filename(&filename);
        debug!(%filename, %content_type, "writing attachment part");

        if self.state == ComposeState::PartsWritten {
            self.sink.write_all(CRLF.as_bytes())?;
        }
        write!(self.sink, "{}{CRLF}", self.boundary.delimiter())?;
        write!(self.sink, "Content-Type: {content_type}{CRLF}")?;
        write!(
            self.sink,
            "Content-Disposition: attachment; filename=\"{filename}\"{CRLF}"
        )?;
        write!(
            self.sink,
            "Content-Transfer-Encoding: {}{CRLF}{CRLF}",
            TransferEncoding::Base64
        )?;

        let mut encoder = LineFoldingBase64Encoder::new(&mut self.sink);
        let mut buf = [0u8; READ_CHUNK];
        let mut copied = 0usize;
        loop {
            let n = match payload.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(Error::AttachmentRead { filename, source }),
            };
            encoder.write_all(&buf[..n])?;
            copied += n;
        }
        encoder.finish()?;
        trace!(%filename, bytes = copied, "attachment encoded");

        Ok(())
    }

    /// Writes the closing boundary (multipart only) and returns the sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the body has not been written, or the
    /// sink's I/O error.
    pub fn close(mut self) -> Result<W> {
        self.expect_state(
            "close",
            &[ComposeState::BodyWritten, ComposeState::PartsWritten],
        )?;

        if self.multipart {
            let close = format!("{CRLF}{}{CRLF}", self.boundary.close_delimiter());
            self.sink.write_all(close.as_bytes())?;
        }
        self.sink.flush()?;
        Ok(self.sink)
    }

    fn emit(&mut self, data: &[u8]) -> io::Result<()> {
        self.sink.write_all(data)
    }

    fn expect_state(&self, operation: &'static str, allowed: &[ComposeState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn advance<E: Into<Error>>(
        &mut self,
        result: std::result::Result<(), E>,
        next: ComposeState,
    ) -> Result<()> {
        match result {
            Ok(()) => {
                self.state = next;
                Ok(())
            }
            Err(e) => {
                self.state = ComposeState::Failed;
                Err(e.into())
            }
        }
    }
}

/// Composes `message` onto `sink` with a random boundary and returns the sink.
///
/// # Errors
///
/// Returns the first I/O error from the sink or from an attachment reader.
pub fn compose<W: Write>(message: Message<'_>, sink: W) -> Result<W> {
    Composer::new(sink).compose(message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::cell::Cell;
    use std::io::{Cursor, Read};
    use std::rc::Rc;

    fn compose_fixed(message: Message<'_>) -> String {
        let out = Composer::with_boundary(Vec::new(), MimeBoundary::new("XYZ"))
            .compose(message)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    /// Reader that records whether it was read and whether it was dropped.
    struct Tracked {
        inner: Cursor<Vec<u8>>,
        read: Rc<Cell<bool>>,
        dropped: Rc<Cell<bool>>,
    }

    impl Read for Tracked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.read.set(true);
            self.inner.read(buf)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    /// Sink that fails once more than `limit` bytes would have been written.
    struct LimitedSink {
        written: Vec<u8>,
        limit: usize,
    }

    impl Write for LimitedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written.len() + buf.len() > self.limit {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_body_without_attachments() {
        let message = Message::new("s@x.com")
            .to("r@x.com")
            .subject("Hello")
            .body("Plain body");

        assert_eq!(
            compose_fixed(message),
            "From: s@x.com\r\nSubject: Hello\r\nTo: r@x.com\r\n\r\n\r\nPlain body\r\n\r\n"
        );
    }

    #[test]
    fn test_no_body_no_attachments() {
        let message = Message::new("s@x.com").to("r@x.com");
        assert_eq!(
            compose_fixed(message),
            "From: s@x.com\r\nTo: r@x.com\r\n\r\n\r\n\r\n\r\n"
        );
    }

    #[test]
    fn test_single_part_has_no_mime_structure() {
        let message = Message::new("s@x.com").to("r@x.com").body("hi");
        let out = compose_fixed(message);
        assert!(!out.contains("Content-Type"));
        assert!(!out.contains("XYZ"));
    }

    #[test]
    fn test_recipients_comma_joined_in_order() {
        let message = Message::new("s@x.com").to("a@x.com").to("b@x.com");
        let out = compose_fixed(message);
        assert!(out.contains("To: a@x.com,b@x.com\r\n"));
    }

    #[test]
    fn test_single_attachment_without_body() {
        let message = Message::new("s@x.com")
            .to("r@x.com")
            .subject("Report")
            .attach("report.csv", Cursor::new(b"a,b\n1,2\n".to_vec()));

        assert_eq!(
            compose_fixed(message),
            concat!(
                "From: s@x.com\r\n",
                "Subject: Report\r\n",
                "To: r@x.com\r\n",
                "Content-Type: multipart/mixed; boundary=\"XYZ\"\r\n",
                "--XYZ\r\n",
                "Content-Transfer-Encoding: quoted-printable",
                "\r\n\r\n\r\n\r\n",
                "--XYZ\r\n",
                "Content-Type: text/csv\r\n",
                "Content-Disposition: attachment; filename=\"report.csv\"\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "\r\n",
                "YSxiCjEsMgo=\r\n",
                "\r\n--XYZ--\r\n",
            )
        );
    }

    #[test]
    fn test_body_with_attachments() {
        let message = Message::new("s@x.com")
            .to("r@x.com")
            .body("See attached")
            .attach("b.txt", Cursor::new(b"second".to_vec()))
            .attach("a.txt", Cursor::new(b"first".to_vec()));

        let out = compose_fixed(message);
        assert!(out.contains("quoted-printable\r\n\r\nSee attached\r\n\r\n--XYZ\r\n"));

        let first = out.find("filename=\"a.txt\"").unwrap();
        let second = out.find("filename=\"b.txt\"").unwrap();
        assert!(first < second);
        assert!(out.contains("\r\n\r\n--XYZ\r\nContent-Type: text/plain\r\nContent-Disposition: attachment; filename=\"b.txt\""));
        assert!(out.ends_with("\r\n\r\n--XYZ--\r\n"));
        assert_eq!(out.matches("--XYZ\r\n").count(), 3);
    }

    #[test]
    fn test_unknown_extension_is_text_plain() {
        let message = Message::new("s@x.com")
            .to("r@x.com")
            .attach("blob.zzqx", Cursor::new(vec![1, 2, 3]));

        let out = compose_fixed(message);
        assert!(out.contains(
            "Content-Type: text/plain\r\nContent-Disposition: attachment; filename=\"blob.zzqx\"\r\n"
        ));
    }

    #[test]
    fn test_attachment_payload_round_trips() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let message = Message::new("s@x.com")
            .to("r@x.com")
            .attach("data.bin", Cursor::new(payload.clone()));

        let out = compose_fixed(message);
        let start = out.find("base64\r\n\r\n").unwrap() + "base64\r\n\r\n".len();
        let end = out.rfind("\r\n--XYZ--").unwrap();
        let encoded = &out[start..end];

        for line in encoded.split_terminator("\r\n") {
            assert!(line.len() <= 78);
        }
        let joined: String = encoded.split("\r\n").collect();
        assert_eq!(STANDARD.decode(joined).unwrap(), payload);
    }

    #[test]
    fn test_random_boundary_is_used_consistently() {
        let composer = Composer::new(Vec::new());
        let boundary = composer.boundary().clone();
        let message = Message::new("s@x.com")
            .to("r@x.com")
            .attach("x.txt", Cursor::new(b"x".to_vec()));

        let out = String::from_utf8(composer.compose(message).unwrap()).unwrap();
        assert!(out.contains(&format!("boundary=\"{boundary}\"")));
        assert!(out.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_write_failure_aborts_remaining_parts() {
        let payload = || vec![0x5Au8; 300];
        let third_read = Rc::new(Cell::new(false));
        let third_dropped = Rc::new(Cell::new(false));
        let build = |read: Rc<Cell<bool>>, dropped: Rc<Cell<bool>>| {
            Message::new("s@x.com")
                .to("r@x.com")
                .attach("a.bin", Cursor::new(payload()))
                .attach("b.bin", Cursor::new(payload()))
                .attach(
                    "c.bin",
                    Tracked {
                        inner: Cursor::new(payload()),
                        read,
                        dropped,
                    },
                )
        };

        // Locate the middle of the second part's base64 in a clean run.
        let reference = compose_fixed(build(
            Rc::new(Cell::new(false)),
            Rc::new(Cell::new(false)),
        ));
        let limit = reference.find("filename=\"b.bin\"").unwrap() + 150;

        let mut sink = LimitedSink {
            written: Vec::new(),
            limit,
        };
        let result = Composer::with_boundary(&mut sink, MimeBoundary::new("XYZ"))
            .compose(build(third_read.clone(), third_dropped.clone()));

        assert!(matches!(result, Err(Error::Io(_))));
        let written = String::from_utf8(sink.written).unwrap();
        assert!(written.contains("filename=\"b.bin\""));
        assert!(!written.contains("c.bin"));
        assert!(!written.contains("--XYZ--"));
        assert!(!third_read.get());
        assert!(third_dropped.get());
    }

    /// Reader that yields a few bytes and then fails.
    struct Unreadable {
        served: bool,
    }

    impl Read for Unreadable {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
            }
            self.served = true;
            buf[..3].copy_from_slice(b"abc");
            Ok(3)
        }
    }

    #[test]
    fn test_read_failure_names_the_attachment() {
        let message = Message::new("s@x.com")
            .to("r@x.com")
            .attach("a.txt", &b"fine"[..])
            .attach("b.txt", Unreadable { served: false });

        let mut composer = Composer::with_boundary(Vec::new(), MimeBoundary::new("XYZ"));
        composer.write_headers(&message).unwrap();
        composer.write_body(None).unwrap();

        let mut parts = message.attachments.into_iter();
        composer.write_part(parts.next().unwrap()).unwrap();
        match composer.write_part(parts.next().unwrap()) {
            Err(Error::AttachmentRead { filename, source }) => {
                assert_eq!(filename, "b.txt");
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected attachment read error, got {other:?}"),
        }
        assert_eq!(composer.state(), ComposeState::Failed);
        assert!(composer.close().is_err());
    }

    #[test]
    fn test_steps_out_of_order_are_rejected() {
        let message = Message::new("s@x.com").to("r@x.com");
        let mut composer = Composer::with_boundary(Vec::new(), MimeBoundary::new("XYZ"));

        assert!(matches!(
            composer.write_body(None),
            Err(Error::InvalidState {
                state: ComposeState::Idle,
                ..
            })
        ));

        composer.write_headers(&message).unwrap();
        assert!(composer.write_headers(&message).is_err());
        assert_eq!(composer.state(), ComposeState::HeadersWritten);

        composer.write_body(None).unwrap();
        assert!(composer.write_body(None).is_err());

        let part = Attachment::new("a.txt", &b"a"[..]);
        assert!(composer.write_part(part).is_err());
        assert_eq!(composer.state(), ComposeState::BodyWritten);

        composer.close().unwrap();
    }

    #[test]
    fn test_close_before_body_is_rejected() {
        let composer = Composer::with_boundary(Vec::new(), MimeBoundary::new("XYZ"));
        assert!(composer.close().is_err());
    }

    #[test]
    fn test_failed_composer_rejects_further_steps() {
        let mut sink = LimitedSink {
            written: Vec::new(),
            limit: 4,
        };
        let message = Message::new("s@x.com").to("r@x.com");
        let mut composer = Composer::with_boundary(&mut sink, MimeBoundary::new("XYZ"));

        assert!(matches!(composer.write_headers(&message), Err(Error::Io(_))));
        assert_eq!(composer.state(), ComposeState::Failed);
        assert!(composer.write_body(None).is_err());
        assert!(composer.close().is_err());
    }

    #[test]
    fn test_compose_helper() {
        let message = Message::new("s@x.com").to("r@x.com").body("x");
        let out = compose(message, Vec::new()).unwrap();
        assert!(out.starts_with(b"From: s@x.com\r\n"));
    }
}

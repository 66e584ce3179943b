//! Transfer encodings for MIME parts.
//!
//! Attachments are sent with the `base64` Content-Transfer-Encoding, folded
//! into CRLF-terminated lines. Folding is a separate pipeline stage:
//!
//! ```text
//! input bytes ──▶ base64 encoder ──▶ fold_lines ──▶ sink
//! ```
//!
//! The fold width is a multiple of 4 so that a line break never lands inside
//! a 4-character base64 block.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::io::{self, Write};

/// Line terminator used on the wire.
pub const CRLF: &str = "\r\n";

/// Widest base64 line generally accepted by SMTP servers.
pub const MAX_LINE_WIDTH: usize = 78;

/// Width at which encoded output is folded: the largest multiple of 4 that
/// does not exceed [`MAX_LINE_WIDTH`].
pub const FOLD_WIDTH: usize = MAX_LINE_WIDTH - MAX_LINE_WIDTH % 4;

/// Unencoded bytes that produce exactly one folded line.
const LINE_INPUT_BYTES: usize = FOLD_WIDTH / 4 * 3;

/// Content-Transfer-Encoding values emitted by the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Writes `encoded` to `sink` as lines of at most `width` characters, each
/// followed by CRLF.
///
/// Empty input writes nothing.
///
/// # Errors
///
/// Returns `InvalidInput` if `width` is zero or not a multiple of 4, or the
/// first write error reported by `sink`.
pub fn fold_lines<W: Write + ?Sized>(encoded: &[u8], width: usize, sink: &mut W) -> io::Result<()> {
    if width == 0 || width % 4 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("fold width {width} is not a positive multiple of 4"),
        ));
    }

    for line in encoded.chunks(width) {
        sink.write_all(line)?;
        sink.write_all(CRLF.as_bytes())?;
    }

    Ok(())
}

/// Base64 encoder producing CRLF-folded output for email bodies.
///
/// Input is buffered unencoded. Whenever at least one full line of input is
/// pending, the whole lines are encoded and folded into the sink; the tail
/// (and the `=` padding) is only emitted by [`finish`](Self::finish). Callers
/// must not assume anything reached the sink before `finish` returns.
#[derive(Debug)]
pub struct LineFoldingBase64Encoder<W: Write> {
    sink: W,
    pending: Vec<u8>,
    encoded: String,
}

impl<W: Write> LineFoldingBase64Encoder<W> {
    /// Creates an encoder writing folded base64 to `sink`.
    pub const fn new(sink: W) -> Self {
        Self {
            sink,
            pending: Vec::new(),
            encoded: String::new(),
        }
    }

    /// Encodes and folds every complete line currently buffered.
    fn drain_whole_lines(&mut self) -> io::Result<()> {
        let whole = self.pending.len() - self.pending.len() % LINE_INPUT_BYTES;
        if whole == 0 {
            return Ok(());
        }

        self.encoded.clear();
        STANDARD.encode_string(&self.pending[..whole], &mut self.encoded);
        fold_lines(self.encoded.as_bytes(), FOLD_WIDTH, &mut self.sink)?;
        self.pending.drain(..whole);
        Ok(())
    }

    /// Flushes the remaining input with padding, folds it, and returns the
    /// sink.
    ///
    /// # Errors
    ///
    /// Returns the first write error reported by the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.drain_whole_lines()?;

        self.encoded.clear();
        STANDARD.encode_string(&self.pending, &mut self.encoded);
        fold_lines(self.encoded.as_bytes(), FOLD_WIDTH, &mut self.sink)?;

        self.sink.flush()?;
        Ok(self.sink)
    }
}

impl<W: Write> Write for LineFoldingBase64Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        if self.pending.len() >= LINE_INPUT_BYTES {
            self.drain_whole_lines()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Encodes `data` as folded base64 in one call.
#[must_use]
pub fn encode_folded(data: &[u8]) -> String {
    let mut folded = Vec::with_capacity(data.len() / 3 * 4 + data.len() / 28 + 8);
    // Writing into a Vec cannot fail.
    if fold_lines(STANDARD.encode(data).as_bytes(), FOLD_WIDTH, &mut folded).is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&folded).into_owned()
}

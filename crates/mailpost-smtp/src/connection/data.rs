//! DATA phase encoding.

use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    /// At the start of a line.
    Start,
    /// After a CR that may begin a CRLF.
    Cr,
    /// Inside a line.
    Middle,
}

/// Writer applying SMTP transparency (RFC 5321 §4.5.2) to message content.
///
/// Lines starting with `.` get an extra `.`, and bare LF becomes CRLF.
/// [`finish`](Self::finish) writes the `.` terminator line.
#[derive(Debug)]
pub struct DotWriter<W: Write> {
    inner: W,
    state: LineState,
}

impl<W: Write> DotWriter<W> {
    /// Wraps `inner`; the first byte written starts a line.
    pub const fn new(inner: W) -> Self {
        Self {
            inner,
            state: LineState::Start,
        }
    }

    /// Ends the current line if needed, writes `.\r\n`, flushes and returns
    /// the inner writer.
    ///
    /// # Errors
    ///
    /// Returns the inner writer's I/O error.
    pub fn finish(mut self) -> io::Result<W> {
        match self.state {
            LineState::Start => {}
            LineState::Cr => self.inner.write_all(b"\n")?,
            LineState::Middle => self.inner.write_all(b"\r\n")?,
        }
        self.inner.write_all(b".\r\n")?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for DotWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = Vec::with_capacity(buf.len() + 8);
        for &byte in buf {
            self.state = match (self.state, byte) {
                (LineState::Start, b'.') => {
                    out.extend_from_slice(b"..");
                    LineState::Middle
                }
                (LineState::Cr, b'\n') => {
                    out.push(b'\n');
                    LineState::Start
                }
                (_, b'\n') => {
                    out.extend_from_slice(b"\r\n");
                    LineState::Start
                }
                (_, b'\r') => {
                    out.push(b'\r');
                    LineState::Cr
                }
                _ => {
                    out.push(byte);
                    LineState::Middle
                }
            };
        }
        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

//! # mailpost-mime
//!
//! MIME message composition for outgoing email with attachments.
//!
//! ## Features
//!
//! - **Line-folded base64**: Attachment payloads encoded with CRLF-terminated
//!   lines that never split a base64 quantum
//! - **Multipart/mixed composition**: Envelope headers, text body and one part
//!   per attachment, written incrementally to any [`std::io::Write`]
//! - **Content types**: MIME type inference from attachment file names
//!
//! ## Quick Start
//!
//! ### Composing a Message
//!
//! ```ignore
//! use mailpost_mime::{Message, compose};
//! use std::io::Cursor;
//!
//! let message = Message::new("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Quarterly report")
//!     .body("See attached.")
//!     .attach("report.csv", Cursor::new(b"a,b\n1,2\n".to_vec()));
//!
//! let wire = compose(message, Vec::new())?;
//! ```
//!
//! ### Encoding Attachments
//!
//! ```ignore
//! use mailpost_mime::encoding::LineFoldingBase64Encoder;
//! use std::io::Write;
//!
//! let mut encoder = LineFoldingBase64Encoder::new(Vec::new());
//! encoder.write_all(b"Hello, World!")?;
//! let folded = encoder.finish()?;
//! assert_eq!(folded, b"SGVsbG8sIFdvcmxkIQ==\r\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod boundary;
mod compose;
mod content_type;
mod error;
mod message;

pub mod encoding;

pub use boundary::MimeBoundary;
pub use compose::{ComposeState, Composer, compose};
pub use content_type::ContentType;
pub use encoding::{LineFoldingBase64Encoder, TransferEncoding};
pub use error::{Error, Result};
pub use message::{Attachment, AttachmentSet, Message};

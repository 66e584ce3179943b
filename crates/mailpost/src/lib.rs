//! # mailpost
//!
//! Send email with binary attachments over SMTP.
//!
//! A [`Message`] is composed as `multipart/mixed` when it carries
//! attachments and written straight into the SMTP DATA stream, so attachment
//! payloads are read and encoded incrementally and never held in memory as a
//! whole.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost::{Message, SmtpConfig, send_mail};
//! use std::fs::File;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SmtpConfig::load("mailpost.json")?;
//!
//!     let message = Message::new("sender@example.com")
//!         .to("recipient@example.com")
//!         .subject("Quarterly report")
//!         .body("Numbers attached.")
//!         .attach("report.pdf", File::open("report.pdf")?);
//!
//!     send_mail(&config, message)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! - [`mailpost_mime`]: message composition and line-folded base64
//! - [`mailpost_smtp`]: the blocking type-state SMTP client

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
mod send;

pub use config::{Credentials, PASSWORD_ENV, Security, SmtpConfig};
pub use error::{Error, Result};
pub use send::{Session, connect_session, deliver, send_mail};

pub use mailpost_mime::{Attachment, AttachmentSet, Message};
pub use mailpost_mime as mime;
pub use mailpost_smtp as smtp;

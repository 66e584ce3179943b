//! # mailpost-smtp
//!
//! A blocking SMTP client for submitting one message per transaction
//! (RFC 5321).
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of valid
//!   SMTP state transitions
//! - **Protocol support**: EHLO, STARTTLS, AUTH PLAIN, MAIL FROM, RCPT TO, DATA
//! - **TLS support**: Implicit TLS (port 465), required or opportunistic
//!   STARTTLS, via rustls
//! - **Streaming DATA**: The data stream is an [`std::io::Write`] with
//!   dot-stuffing, so message bodies never need to be held in memory
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpost_smtp::connection::{Config, Security, connect};
//! use mailpost_smtp::{Address, Client};
//! use std::io::Write;
//!
//! fn main() -> mailpost_smtp::Result<()> {
//!     let config = Config::builder("smtp.example.com")
//!         .security(Security::StartTls)
//!         .build();
//!
//!     let client = Client::from_stream(connect(&config)?)?
//!         .ehlo("client.example.com")?
//!         .starttls("smtp.example.com", "client.example.com")?
//!         .auth_plain("user@example.com", "password")?;
//!
//!     let mut data = client
//!         .mail_from(Address::new("sender@example.com"))?
//!         .rcpt_to(Address::new("recipient@example.com"))?
//!         .data()?;
//!
//!     data.write_all(b"Subject: Test\r\n\r\nHello, World!\r\n")?;
//!     data.close()?.quit()
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── auth_plain() ───→ Authenticated
//! └──────────────┘                             │
//!        │                                     │
//!        └─── mail_from() ───→ MailTransaction ←┘
//!                                   │
//!                              rcpt_to()
//!                                   ▼
//!                            RecipientAdded ─── data() ───→ DataStream
//!                                                              │
//!                              Connected ←─── close() ─────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Connection management and type-state client
//! - [`parser`]: Reply parser
//! - [`types`]: Core SMTP types (addresses, extensions, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, DataStream, MailTransaction, RecipientAdded, ServerInfo,
    SmtpConnection,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyClass, ReplyCode};

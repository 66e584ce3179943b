//! Error types for MIME operations.

use std::io;

use crate::compose::ComposeState;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Writing to the sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An attachment payload could not be read.
    #[error("Failed to read attachment {filename}: {source}")]
    AttachmentRead {
        /// Name of the attachment.
        filename: String,
        /// Error returned by the payload reader.
        source: io::Error,
    },

    /// A composition step was attempted out of order.
    #[error("Cannot {operation} in state {state:?}")]
    InvalidState {
        /// The step that was attempted.
        operation: &'static str,
        /// The composer state at the time.
        state: ComposeState,
    },

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),
}

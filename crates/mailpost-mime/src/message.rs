//! Outgoing message model.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

/// A named attachment payload.
///
/// The reader is consumed exactly once while the composer encodes the part.
pub struct Attachment<'a> {
    /// File name, used for `Content-Disposition` and MIME type inference.
    pub filename: String,
    /// Payload stream.
    pub payload: Box<dyn Read + 'a>,
}

impl<'a> Attachment<'a> {
    /// Creates an attachment from a file name and a reader.
    pub fn new(filename: impl Into<String>, payload: impl Read + 'a) -> Self {
        Self {
            filename: filename.into(),
            payload: Box::new(payload),
        }
    }
}

impl fmt::Debug for Attachment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}

/// Attachments keyed by file name.
///
/// Names are unique; iteration (and therefore part order on the wire) is in
/// ascending file name order.
#[derive(Default)]
pub struct AttachmentSet<'a> {
    entries: BTreeMap<String, Box<dyn Read + 'a>>,
}

impl<'a> AttachmentSet<'a> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds an attachment, replacing any payload already stored under the
    /// same file name. Returns `true` if a payload was replaced.
    pub fn insert(&mut self, filename: impl Into<String>, payload: impl Read + 'a) -> bool {
        self.entries
            .insert(filename.into(), Box::new(payload))
            .is_some()
    }

    /// Adds an [`Attachment`].
    pub fn push(&mut self, attachment: Attachment<'a>) -> bool {
        self.entries
            .insert(attachment.filename, attachment.payload)
            .is_some()
    }

    /// Returns the number of attachments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no attachments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if an attachment with this file name exists.
    #[must_use]
    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    /// Returns the file names in emission order.
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<'a> IntoIterator for AttachmentSet<'a> {
    type Item = Attachment<'a>;
    type IntoIter = std::vec::IntoIter<Attachment<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .into_iter()
            .map(|(filename, payload)| Attachment { filename, payload })
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl<'a> FromIterator<Attachment<'a>> for AttachmentSet<'a> {
    fn from_iter<I: IntoIterator<Item = Attachment<'a>>>(iter: I) -> Self {
        let mut set = Self::new();
        for attachment in iter {
            set.push(attachment);
        }
        set
    }
}

impl fmt::Debug for AttachmentSet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// An email message to compose.
#[derive(Debug, Default)]
pub struct Message<'a> {
    /// Sender address.
    pub from: String,
    /// Recipient addresses, in header order.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: Option<String>,
    /// Text body.
    pub body: Option<Vec<u8>>,
    /// Attachments.
    pub attachments: AttachmentSet<'a>,
}

impl<'a> Message<'a> {
    /// Creates a message with a sender and nothing else.
    #[must_use]
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Self::default()
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the text body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attaches a payload under `filename`.
    #[must_use]
    pub fn attach(mut self, filename: impl Into<String>, payload: impl Read + 'a) -> Self {
        self.attachments.insert(filename, payload);
        self
    }

    /// Returns true if the message will be sent as multipart/mixed.
    ///
    /// Only a non-empty attachment set makes the message multipart; an
    /// empty set is written as a single-part message.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.attachments.is_empty()
    }
}

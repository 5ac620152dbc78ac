//! Per-message normalization into text and CSV projections.
//!
//! [`RecordBuilder`] turns one raw page element into an [`ArchiveRecord`]
//! holding both the readable text block and the CSV row. Either both
//! projections are produced or neither is: a message that fails anywhere is
//! reported as a [`DumpError::Record`] and contributes nothing.
//!
//! # Text block
//!
//! ```text
//! [{timestamp}] {(referencing id) }{msg_type=NAME }<{username}#{discriminator}> {content}
//! [ATTACHMENTS]: {url} {url}
//! ```
//!
//! The attachments line only appears when the message has attachments.
//!
//! # CSV escaping
//!
//! Free-text fields are wrapped in double quotes with inner quotes doubled,
//! then every newline is replaced by the literal token `<NEWLINE>`, so each
//! record stays on one physical line:
//!
//! ```
//! use ddump::record::{escape_field, unescape_field};
//!
//! let escaped = escape_field("He said \"hi\"\nbye");
//! assert_eq!(escaped, "\"He said \"\"hi\"\"<NEWLINE>bye\"");
//! assert_eq!(unescape_field(&escaped), "He said \"hi\"\nbye");
//! ```

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Deserialize;
use serde_json::Value;

use crate::attachments::{AttachmentFailure, AttachmentFetcher};
use crate::error::{DumpError, Result};
use crate::models::Message;

/// Token substituted for newlines inside escaped fields.
pub const NEWLINE_TOKEN: &str = "<NEWLINE>";

/// CSV header, in column order.
pub const CSV_HEADER: [&str; 13] = [
    "MessageID",
    "Timestamp",
    "AuthorID",
    "AuthorUsername",
    "AuthorDiscriminator",
    "Content",
    "Attachments",
    "Embeds",
    "Reactions",
    "Pinned",
    "Type",
    "MessageReference",
    "Mentions",
];

/// Quotes a free-text field and flattens its newlines.
pub fn escape_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\"")).replace('\n', NEWLINE_TOKEN)
}

/// Reverses [`escape_field`].
///
/// Values that are not quoted are only stripped of newline tokens.
pub fn unescape_field(field: &str) -> String {
    let inner = field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .map(|f| f.replace("\"\"", "\""))
        .unwrap_or_else(|| field.to_string());
    inner.replace(NEWLINE_TOKEN, "\n")
}

/// Renders one CSV line from already-escaped fields.
pub fn render_csv_line<I, T>(fields: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer.into_inner().map_err(|e| DumpError::Io(e.into_error()))
}

/// The two projections of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub message_id: String,

    /// Readable block, newline-terminated
    pub text: String,

    /// Escaped CSV fields, one per [`CSV_HEADER`] column
    pub csv: Vec<String>,
}

impl ArchiveRecord {
    /// Builds both projections of an already-decoded message.
    pub fn from_message(msg: &Message) -> Self {
        let reference = msg
            .referenced_message_id()
            .map(|id| format!("(referencing {}) ", id))
            .unwrap_or_default();
        let attachments = msg
            .attachments
            .iter()
            .map(|a| a.url.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let mut text = format!(
            "[{}] {}{}<{}#{}> {}\n",
            msg.timestamp,
            reference,
            msg.kind.annotation(),
            msg.author.username,
            msg.author.discriminator,
            msg.content
        );
        if !attachments.is_empty() {
            text.push_str("[ATTACHMENTS]: ");
            text.push_str(&attachments);
            text.push('\n');
        }

        let csv = vec![
            msg.id.clone(),
            msg.timestamp.clone(),
            msg.author.id.clone(),
            escape_field(&msg.author.username),
            msg.author.discriminator.clone(),
            escape_field(&msg.content),
            escape_field(&attachments),
            opaque_field(msg.embeds.as_ref()),
            opaque_field(msg.reactions.as_ref()),
            if msg.pinned { "1" } else { "0" }.to_string(),
            msg.kind.code().to_string(),
            reference,
            opaque_field(msg.mentions.as_ref()),
        ];

        Self {
            message_id: msg.id.clone(),
            text,
            csv,
        }
    }

    /// The CSV row as a newline-terminated line.
    pub fn csv_line(&self) -> Result<Vec<u8>> {
        render_csv_line(&self.csv)
    }
}

fn opaque_field(value: Option<&Value>) -> String {
    value.map(|v| escape_field(&v.to_string())).unwrap_or_default()
}

/// A message that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub message_id: Option<String>,
    pub reason: String,
}

impl RecordFailure {
    /// Converts a [`DumpError`] raised while building a record.
    pub fn from_error(err: &DumpError) -> Self {
        match err {
            DumpError::Record { message_id, reason } => Self {
                message_id: message_id.clone(),
                reason: reason.clone(),
            },
            other => Self {
                message_id: None,
                reason: other.to_string(),
            },
        }
    }
}

/// Converts raw page elements into records, downloading attachments on the
/// way when a fetcher is attached.
#[derive(Default)]
pub struct RecordBuilder<'a> {
    attachments: Option<AttachmentFetcher<'a>>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new() -> Self {
        Self { attachments: None }
    }

    /// Downloads every attachment through `fetcher` while building.
    #[must_use]
    pub fn with_attachments(mut self, fetcher: AttachmentFetcher<'a>) -> Self {
        self.attachments = Some(fetcher);
        self
    }

    /// Builds the record for one raw message object.
    ///
    /// The message is fully decoded before any attachment is downloaded, so a
    /// rejected message leaves no files behind.
    pub fn build(&mut self, raw: &Value) -> Result<ArchiveRecord> {
        let message = Message::deserialize(raw).map_err(|e| {
            let id = raw.get("id").and_then(Value::as_str).map(str::to_string);
            DumpError::record(id, e.to_string())
        })?;

        if let Some(fetcher) = self.attachments.as_mut() {
            for attachment in &message.attachments {
                fetcher.fetch(&message.id, attachment);
            }
        }

        Ok(ArchiveRecord::from_message(&message))
    }

    /// Number of attachments saved so far.
    pub fn attachments_downloaded(&self) -> usize {
        self.attachments.as_ref().map_or(0, AttachmentFetcher::downloaded)
    }

    pub fn into_attachment_failures(self) -> Vec<AttachmentFailure> {
        self.attachments
            .map(AttachmentFetcher::into_failures)
            .unwrap_or_default()
    }
}

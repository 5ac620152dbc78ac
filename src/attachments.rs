//! Best-effort attachment downloads.
//!
//! Each attachment is saved as `{messageId}_{filename}` inside the channel's
//! attachment directory. A failed download never fails the message or the
//! channel; it is logged and kept as an [`AttachmentFailure`] for the run
//! summary.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Attachment;
use crate::transport::Transport;

static UNSAFE_PATH_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).expect("valid file name pattern")
});

/// Replaces characters that cannot appear in a single path component.
///
/// ```
/// use ddump::attachments::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("memes/and:stuff"), "memes_and_stuff");
/// assert_eq!(sanitize_file_name(".."), "_");
/// assert_eq!(sanitize_file_name("general"), "general");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned = UNSAFE_PATH_CHARS.replace_all(name, "_");
    match cleaned.as_ref() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned.into_owned(),
    }
}

/// A download that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFailure {
    pub message_id: String,
    pub url: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Saves attachments into one directory and remembers what failed.
pub struct AttachmentFetcher<'a> {
    transport: &'a dyn Transport,
    dir: PathBuf,
    downloaded: usize,
    failures: Vec<AttachmentFailure>,
}

impl<'a> AttachmentFetcher<'a> {
    /// Creates a fetcher writing into `dir`, which must already exist.
    pub fn new(transport: &'a dyn Transport, dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            dir: dir.into(),
            downloaded: 0,
            failures: Vec::new(),
        }
    }

    /// Where an attachment of `message_id` is saved.
    pub fn destination(&self, message_id: &str, filename: &str) -> PathBuf {
        self.dir
            .join(sanitize_file_name(&format!("{}_{}", message_id, filename)))
    }

    /// Downloads one attachment. Returns `true` on success.
    pub fn fetch(&mut self, message_id: &str, attachment: &Attachment) -> bool {
        let dest = self.destination(message_id, &attachment.filename);
        match self.transport.fetch_binary(&attachment.url, &dest) {
            Ok(bytes) => {
                tracing::debug!(message_id, path = %dest.display(), bytes, "Saved attachment");
                self.downloaded += 1;
                true
            }
            Err(e) => {
                tracing::warn!(
                    message_id,
                    url = %attachment.url,
                    error = %e,
                    "Attachment download failed"
                );
                self.failures.push(AttachmentFailure {
                    message_id: message_id.to_string(),
                    url: attachment.url.clone(),
                    path: dest,
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    /// Number of attachments saved so far.
    pub fn downloaded(&self) -> usize {
        self.downloaded
    }

    pub fn into_failures(self) -> Vec<AttachmentFailure> {
        self.failures
    }
}

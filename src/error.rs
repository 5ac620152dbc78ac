//! Unified error types for ddump.
//!
//! This module provides a single [`DumpError`] enum that covers every failure
//! the archiver can run into, from a missing credential to a page response the
//! API should never have produced.
//!
//! # Failure Scopes
//!
//! - **Run**: [`DumpError::Configuration`] is raised before any request is made
//! - **Channel**: [`DumpError::UnexpectedResponse`], [`DumpError::StalledCursor`]
//!   and transport errors abort the channel being archived
//! - **Message**: [`DumpError::Record`] never escapes a channel run; it is turned
//!   into a [`RecordFailure`](crate::record::RecordFailure) and the message is skipped

use std::io;

use thiserror::Error;

/// A specialized [`Result`] type for ddump operations.
///
/// # Example
///
/// ```rust
/// use ddump::error::Result;
///
/// fn channel_name() -> Result<String> {
///     Ok("general".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, DumpError>;

/// The error type for all ddump operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DumpError {
    /// The run configuration is unusable (no credential, no target).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of what's missing or wrong
        message: String,
    },

    /// The API answered with a body that has the wrong shape.
    ///
    /// This occurs when:
    /// - A channel fetch returns an object without a `name`
    /// - A page fetch returns neither a list nor a rate-limit object
    /// - A body is not JSON at all
    #[error("Unexpected response while fetching {context}:\n{body}")]
    UnexpectedResponse {
        /// What was being fetched (e.g. "channel 123")
        context: String,
        /// The raw response body
        body: String,
    },

    /// Pagination did not move strictly back in history.
    #[error("Pagination cursor did not advance (previous: {previous}, next: {next})")]
    StalledCursor {
        /// Cursor used for the previous page
        previous: u64,
        /// Cursor derived from the latest page
        next: u64,
    },

    /// A single message could not be turned into a record.
    #[error("Failed to process message {}: {reason}", message_id.as_deref().unwrap_or("<unknown id>"))]
    Record {
        /// The message id, if the raw object had one
        message_id: Option<String>,
        /// Why the message was rejected
        reason: String,
    },

    /// An HTTP request failed (connection, TLS, timeout or bad status).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An I/O error occurred while writing dumps or attachments.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// CSV writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The API base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl DumpError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        DumpError::Configuration {
            message: message.into(),
        }
    }

    /// Creates an unexpected response error carrying the raw body.
    pub fn unexpected_response(context: impl Into<String>, body: impl Into<String>) -> Self {
        DumpError::UnexpectedResponse {
            context: context.into(),
            body: body.into(),
        }
    }

    /// Creates a per-message processing error.
    pub fn record(message_id: Option<String>, reason: impl Into<String>) -> Self {
        DumpError::Record {
            message_id,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, DumpError::Configuration { .. })
    }

    /// Returns `true` if the API returned a malformed body.
    pub fn is_unexpected_response(&self) -> bool {
        matches!(self, DumpError::UnexpectedResponse { .. })
    }

    /// Returns `true` if this is a per-message error.
    pub fn is_record(&self) -> bool {
        matches!(self, DumpError::Record { .. })
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, DumpError::Io(_))
    }
}

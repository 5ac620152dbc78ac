//! Progress reporting for long-running archival.
//!
//! Walking a large channel takes a long time, mostly spent sleeping on rate
//! limits. The channel archiver pushes a [`Progress`] snapshot to a callback
//! after every page so front ends can show a live status line.
//!
//! # Example
//!
//! ```rust
//! use ddump::progress::{Progress, ProgressCallback};
//! use std::sync::Arc;
//!
//! let callback: ProgressCallback = Arc::new(|progress| {
//!     eprint!("\r{} records", progress.records_built);
//! });
//!
//! callback(Progress::new("123", 1, 100, 100));
//! ```

use std::sync::Arc;

/// Snapshot of one channel's archival after a page has been processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub channel_id: String,

    /// Non-empty pages processed so far.
    pub pages_fetched: u64,

    /// Raw messages received so far.
    pub messages_seen: u64,

    /// Records spooled so far (messages seen minus skipped ones).
    pub records_built: u64,

    /// Timestamp of the newest message of the latest page.
    pub newest_timestamp: Option<String>,
}

impl Progress {
    /// Creates a new progress snapshot.
    pub fn new(
        channel_id: impl Into<String>,
        pages_fetched: u64,
        messages_seen: u64,
        records_built: u64,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            pages_fetched,
            messages_seen,
            records_built,
            newest_timestamp: None,
        }
    }

    /// Attaches the newest timestamp of the latest page.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.newest_timestamp = Some(timestamp.into());
        self
    }

    /// Messages that could not be turned into records.
    pub fn skipped(&self) -> u64 {
        self.messages_seen.saturating_sub(self.records_built)
    }

    /// One-line status, e.g. for a carriage-return progress display.
    ///
    /// ```rust
    /// use ddump::progress::Progress;
    ///
    /// let progress = Progress::new("1", 2, 200, 199).with_timestamp("2021-03-01T10:00:00");
    /// assert_eq!(
    ///     progress.status_line(),
    ///     "message timestamp: 2021-03-01T10:00:00 Messages downloaded: 199"
    /// );
    /// ```
    pub fn status_line(&self) -> String {
        format!(
            "message timestamp: {} Messages downloaded: {}",
            self.newest_timestamp.as_deref().unwrap_or("-"),
            self.records_built
        )
    }
}

/// Callback type for receiving progress updates.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Creates a no-op progress callback.
pub fn no_progress() -> ProgressCallback {
    Arc::new(|_| {})
}

/// Creates a progress callback that rewrites one status line on stderr.
pub fn stderr_progress() -> ProgressCallback {
    Arc::new(|progress| {
        eprint!("\r{}", progress.status_line());
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped() {
        let progress = Progress::new("1", 1, 100, 97);
        assert_eq!(progress.skipped(), 3);
    }

    #[test]
    fn test_status_line_without_timestamp() {
        let progress = Progress::new("1", 0, 0, 0);
        assert_eq!(progress.status_line(), "message timestamp: - Messages downloaded: 0");
    }

    #[test]
    fn test_no_progress_callback() {
        let callback = no_progress();
        callback(Progress::default());
    }

    #[test]
    fn test_progress_callback_type() {
        use std::sync::atomic::{AtomicU64, Ordering};

        let counter = Arc::new(AtomicU64::new(0));
        let counter_clone = counter.clone();

        let callback: ProgressCallback = Arc::new(move |progress| {
            counter_clone.store(progress.records_built, Ordering::SeqCst);
        });

        callback(Progress::new("1", 1, 42, 42));
        assert_eq!(counter.load(Ordering::SeqCst), 42);
    }
}

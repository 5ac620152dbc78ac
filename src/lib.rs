//! # ddump
//!
//! Archive the message history of a Discord channel, or of every text
//! channel in a guild, into chronological human-readable and CSV dumps,
//! optionally saving every attachment.
//!
//! ## Overview
//!
//! One run walks a channel's history backwards, a page of 100 messages at a
//! time, honouring the server's rate-limit signals and throttling itself.
//! Every message becomes a record with two projections:
//!
//! - **Text** — `[timestamp] <user#discriminator> content`, one block per message
//! - **CSV** — a fixed 13-column row with quoted, newline-flattened free text
//!
//! Records are spooled to disk as they are produced and written out oldest
//! first once the start of the history is reached.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ddump::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = ArchiveConfig::new("token", Target::Channel("123456789".into()))
//!         .with_download_attachments(true);
//!
//!     if let RunReport::Channel(report) = run(&config, no_progress())? {
//!         println!("{} messages written to {}", report.records_written, report.paths.text.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`archiver`] — [`Archiver`](archiver::Archiver) and [`run`](archiver::run)
//! - [`channel`] — [`ChannelArchiver`](channel::ChannelArchiver), [`ChannelReport`](channel::ChannelReport)
//! - [`guild`] — [`GuildArchiver`](guild::GuildArchiver), guild summary
//! - [`pagination`] — [`PaginationEngine`](pagination::PaginationEngine), rate-limit handling
//! - [`record`] — [`RecordBuilder`](record::RecordBuilder), CSV escaping
//! - [`attachments`] — best-effort attachment downloads
//! - [`spool`] — incremental record spool
//! - [`transport`] — [`Transport`](transport::Transport) trait and HTTP client
//! - [`api`] — endpoint URLs
//! - [`models`] — wire data model
//! - [`config`] — [`ArchiveConfig`](config::ArchiveConfig)
//! - [`progress`] — progress callbacks
//! - [`error`] — [`DumpError`], [`Result`]
//! - `cli` — clap argument definition (feature `cli`)

pub mod api;
pub mod archiver;
pub mod attachments;
pub mod channel;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod guild;
pub mod models;
pub mod pagination;
pub mod progress;
pub mod record;
pub mod spool;
pub mod transport;

// Re-export the main types at the crate root for convenience
pub use error::{DumpError, Result};

/// Convenient re-exports for common usage.
///
/// ```rust
/// use ddump::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{DumpError, Result};

    pub use crate::archiver::{Archiver, RunReport, run};
    pub use crate::config::{ArchiveConfig, Target, ThrottleConfig};

    pub use crate::channel::{ChannelArchiver, ChannelReport};
    pub use crate::guild::{GuildArchiver, GuildReport};

    pub use crate::pagination::{PaginationEngine, Sleeper, ThreadSleeper};
    pub use crate::record::{ArchiveRecord, RecordBuilder};
    pub use crate::transport::{HttpTransport, Transport};

    pub use crate::progress::{Progress, ProgressCallback, no_progress};
}

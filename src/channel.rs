//! Archival of a single channel.
//!
//! [`ChannelArchiver::archive`] fetches the channel metadata, walks the whole
//! message history with a [`PaginationEngine`], turns every message into a
//! record, spools records as they are produced and finally writes
//! `{name}_{id}_DUMP.txt` and `{name}_{id}_DUMP.csv` in chronological order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::api::Endpoints;
use crate::attachments::{AttachmentFailure, AttachmentFetcher, sanitize_file_name};
use crate::config::ThrottleConfig;
use crate::error::{DumpError, Result};
use crate::models::Channel;
use crate::pagination::{PaginationEngine, PaginationStats, Sleeper};
use crate::progress::{Progress, ProgressCallback, no_progress};
use crate::record::{RecordBuilder, RecordFailure};
use crate::spool::{DumpHeader, DumpPaths, RecordSpool};
use crate::transport::Transport;

/// File-name stem shared by a channel's dumps: `{name}_{id}`.
pub fn dump_stem(channel: &Channel) -> String {
    format!("{}_{}", sanitize_file_name(&channel.name), channel.id)
}

/// Directory holding a channel's attachments: `{name}_{id}_attachments`.
pub fn attachment_dir(output_dir: &Path, channel: &Channel) -> PathBuf {
    output_dir.join(format!("{}_attachments", dump_stem(channel)))
}

/// Outcome of a completed channel archival.
#[derive(Debug, Clone)]
pub struct ChannelReport {
    pub channel: Channel,
    pub paths: DumpPaths,
    /// Set when attachments were requested
    pub attachment_dir: Option<PathBuf>,
    pub records_written: usize,
    pub record_failures: Vec<RecordFailure>,
    pub attachments_downloaded: usize,
    pub attachment_failures: Vec<AttachmentFailure>,
    pub stats: PaginationStats,
}

impl ChannelReport {
    /// Raw messages received from the API.
    pub fn messages_fetched(&self) -> u64 {
        self.stats.messages
    }

    /// Returns `true` if nothing was skipped or left undownloaded.
    pub fn is_clean(&self) -> bool {
        self.record_failures.is_empty() && self.attachment_failures.is_empty()
    }
}

/// Archives channels into one output directory.
pub struct ChannelArchiver<'a> {
    transport: &'a dyn Transport,
    sleeper: &'a dyn Sleeper,
    endpoints: &'a Endpoints,
    output_dir: PathBuf,
    download_attachments: bool,
    throttle: ThrottleConfig,
    progress: ProgressCallback,
}

impl<'a> ChannelArchiver<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        sleeper: &'a dyn Sleeper,
        endpoints: &'a Endpoints,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            sleeper,
            endpoints,
            output_dir: output_dir.into(),
            download_attachments: false,
            throttle: ThrottleConfig::default(),
            progress: no_progress(),
        }
    }

    #[must_use]
    pub fn with_download_attachments(mut self, enabled: bool) -> Self {
        self.download_attachments = enabled;
        self
    }

    #[must_use]
    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Fetches channel metadata.
    ///
    /// A body without a `name` is not a channel and is rejected with
    /// [`DumpError::UnexpectedResponse`].
    pub fn fetch_channel(&self, channel_id: &str) -> Result<Channel> {
        let body = self.transport.fetch_text(&self.endpoints.channel(channel_id))?;
        let context = format!("channel {}", channel_id);
        let unexpected = || DumpError::unexpected_response(context.as_str(), body.as_str());

        let value: Value = serde_json::from_str(&body).map_err(|_| unexpected())?;
        if value.get("name").and_then(Value::as_str).is_none() {
            return Err(unexpected());
        }
        Channel::deserialize(&value).map_err(|_| unexpected())
    }

    /// Archives one channel end to end.
    pub fn archive(&self, channel_id: &str) -> Result<ChannelReport> {
        let channel = self.fetch_channel(channel_id)?;
        tracing::info!(channel_id, name = %channel.name, "Dumping channel");

        let attachment_dir = if self.download_attachments {
            let dir = attachment_dir(&self.output_dir, &channel);
            fs::create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };

        let mut builder = RecordBuilder::new();
        if let Some(dir) = &attachment_dir {
            builder = builder.with_attachments(AttachmentFetcher::new(self.transport, dir));
        }

        let paths = DumpPaths::new(&self.output_dir, &dump_stem(&channel));
        let mut spool = RecordSpool::create(&paths)?;
        let mut record_failures = Vec::new();

        let mut pages = PaginationEngine::new(
            self.transport,
            self.sleeper,
            self.endpoints,
            channel.id.as_str(),
            self.throttle,
        );

        let (mut pages_done, mut messages_seen) = (0u64, 0u64);
        for page in &mut pages {
            let page = page?;
            pages_done += 1;
            messages_seen += page.len() as u64;

            for raw in &page {
                match builder.build(raw) {
                    Ok(record) => spool.append(&record)?,
                    Err(e) => {
                        tracing::warn!(channel_id, error = %e, "Skipping message");
                        record_failures.push(RecordFailure::from_error(&e));
                    }
                }
            }
            spool.flush()?;

            let mut progress = Progress::new(
                channel.id.as_str(),
                pages_done,
                messages_seen,
                spool.len() as u64,
            );
            if let Some(ts) = page
                .first()
                .and_then(|m| m.get("timestamp"))
                .and_then(Value::as_str)
            {
                progress = progress.with_timestamp(ts);
            }
            (self.progress)(progress);
        }
        let stats = pages.stats();

        let header = DumpHeader {
            channel_name: channel.name.clone(),
            channel_id: channel.id.clone(),
            topic: channel.topic.clone(),
        };
        let records_written = spool.finish(&header, &paths)?;
        let attachments_downloaded = builder.attachments_downloaded();
        let attachment_failures = builder.into_attachment_failures();

        tracing::info!(
            channel_id,
            records = records_written,
            skipped = record_failures.len(),
            attachment_failures = attachment_failures.len(),
            requests = stats.requests,
            rate_limited = stats.rate_limited,
            "Channel dumped"
        );

        Ok(ChannelReport {
            channel,
            paths,
            attachment_dir,
            records_written,
            record_failures,
            attachments_downloaded,
            attachment_failures,
            stats,
        })
    }
}

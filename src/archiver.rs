//! Entry point tying configuration, transport and archivers together.
//!
//! ```rust,no_run
//! use ddump::archiver::{RunReport, run};
//! use ddump::config::{ArchiveConfig, Target};
//! use ddump::progress::no_progress;
//!
//! let config = ArchiveConfig::new("token", Target::Guild("42".into()));
//! match run(&config, no_progress())? {
//!     RunReport::Guild(report) => println!("{} channels dumped", report.succeeded()),
//!     RunReport::Channel(report) => println!("{} records", report.records_written),
//! }
//! # Ok::<(), ddump::DumpError>(())
//! ```

use crate::api::Endpoints;
use crate::channel::{ChannelArchiver, ChannelReport};
use crate::config::{ArchiveConfig, Target};
use crate::error::Result;
use crate::guild::{GuildArchiver, GuildReport};
use crate::pagination::{Sleeper, ThreadSleeper};
use crate::progress::{ProgressCallback, no_progress};
use crate::transport::{HttpTransport, Transport};

/// Result of a run, by target kind.
#[derive(Debug, Clone)]
pub enum RunReport {
    Channel(ChannelReport),
    Guild(GuildReport),
}

/// Runs one configured archival against arbitrary transport and sleeper.
pub struct Archiver<'a> {
    config: &'a ArchiveConfig,
    transport: &'a dyn Transport,
    sleeper: &'a dyn Sleeper,
    endpoints: Endpoints,
    progress: ProgressCallback,
}

impl<'a> Archiver<'a> {
    /// Validates `config` before anything touches the network.
    pub fn new(
        config: &'a ArchiveConfig,
        transport: &'a dyn Transport,
        sleeper: &'a dyn Sleeper,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            sleeper,
            endpoints: Endpoints::new(&config.api_base)?,
            progress: no_progress(),
        })
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn run(&self) -> Result<RunReport> {
        match &self.config.target {
            Target::Channel(id) => {
                let archiver = ChannelArchiver::new(
                    self.transport,
                    self.sleeper,
                    &self.endpoints,
                    &self.config.output_dir,
                )
                .with_download_attachments(self.config.download_attachments)
                .with_throttle(self.config.throttle)
                .with_progress(self.progress.clone());
                archiver.archive(id).map(RunReport::Channel)
            }
            Target::Guild(id) => {
                let archiver = GuildArchiver::new(
                    self.transport,
                    self.sleeper,
                    &self.endpoints,
                    &self.config.output_dir,
                )
                .with_download_attachments(self.config.download_attachments)
                .with_throttle(self.config.throttle)
                .with_progress(self.progress.clone());
                archiver.archive(id).map(RunReport::Guild)
            }
        }
    }
}

/// Runs `config` over HTTPS with real sleeps.
pub fn run(config: &ArchiveConfig, progress: ProgressCallback) -> Result<RunReport> {
    config.validate()?;
    let transport = HttpTransport::new(&config.credential, config.request_timeout)?;
    Archiver::new(config, &transport, &ThreadSleeper)?
        .with_progress(progress)
        .run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DumpError;
    use std::cell::Cell;
    use std::path::Path;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingTransport(Cell<usize>);

    impl Transport for CountingTransport {
        fn fetch_text(&self, _url: &str) -> Result<String> {
            self.0.set(self.0.get() + 1);
            Err(DumpError::unexpected_response("test", "offline"))
        }

        fn fetch_binary(&self, _url: &str, _dest: &Path) -> Result<u64> {
            self.0.set(self.0.get() + 1);
            Ok(0)
        }
    }

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    #[test]
    fn test_invalid_config_makes_no_requests() {
        let config = ArchiveConfig::new("", Target::Channel("1".into()));
        let transport = CountingTransport::default();
        let err = Archiver::new(&config, &transport, &NoSleep).err().unwrap();
        assert!(err.is_configuration());
        assert_eq!(transport.0.get(), 0);
    }

    #[test]
    fn test_invalid_api_base() {
        let config = ArchiveConfig::new("t", Target::Channel("1".into())).with_api_base("::");
        let transport = CountingTransport::default();
        assert!(matches!(
            Archiver::new(&config, &transport, &NoSleep).err(),
            Some(DumpError::Url(_))
        ));
    }

    #[test]
    fn test_channel_failure_is_returned() {
        let config = ArchiveConfig::new("t", Target::Channel("1".into()));
        let transport = CountingTransport::default();
        let archiver = Archiver::new(&config, &transport, &NoSleep).unwrap();
        assert!(archiver.run().unwrap_err().is_unexpected_response());
        assert_eq!(transport.0.get(), 1);
    }
}

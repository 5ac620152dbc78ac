//! Configuration types for an archival run.
//!
//! This module provides plain configuration structs for library usage,
//! without any CLI framework dependencies. The binary builds an
//! [`ArchiveConfig`] from its flags; library users build one directly.
//!
//! # Example
//!
//! ```rust
//! use ddump::config::{ArchiveConfig, Target};
//!
//! let config = ArchiveConfig::new("my-token", Target::Channel("123456789".into()))
//!     .with_download_attachments(true)
//!     .with_output_dir("dumps");
//!
//! assert!(config.validate().is_ok());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DumpError, Result};

/// Default REST API root.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v9";

/// Environment variable the CLI reads the credential from.
pub const TOKEN_ENV_VAR: &str = "DDUMP_TOKEN";

/// What a run archives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum Target {
    /// A single channel, by id
    Channel(String),
    /// Every text channel of a guild, by guild id
    Guild(String),
}

impl Target {
    /// Returns the id of the channel or guild.
    pub fn id(&self) -> &str {
        match self {
            Target::Channel(id) | Target::Guild(id) => id,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Channel(id) => write!(f, "channel {}", id),
            Target::Guild(id) => write!(f, "guild {}", id),
        }
    }
}

/// Proactive request throttling.
///
/// Independently of server rate-limit signals, the pagination engine pauses
/// for [`pause`](Self::pause) after every [`every_requests`](Self::every_requests)
/// successful page fetches.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use ddump::config::ThrottleConfig;
///
/// let throttle = ThrottleConfig::default();
/// assert_eq!(throttle.every_requests, 20);
/// assert_eq!(throttle.pause, Duration::from_millis(1700));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Number of successful page requests between pauses (0 disables throttling)
    pub every_requests: u32,

    /// How long to pause
    pub pause: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            every_requests: 20,
            pause: Duration::from_millis(1700),
        }
    }
}

impl ThrottleConfig {
    /// A throttle that never pauses.
    pub fn disabled() -> Self {
        Self {
            every_requests: 0,
            pause: Duration::ZERO,
        }
    }

    /// Returns `true` if a pause is due after `completed` successful requests.
    pub fn is_due(&self, completed: u64) -> bool {
        self.every_requests > 0 && completed > 0 && completed % u64::from(self.every_requests) == 0
    }
}

/// Validated configuration consumed by the archivers.
#[derive(Clone)]
pub struct ArchiveConfig {
    /// Value sent in the `authorization` header
    pub credential: String,

    /// Channel or guild to archive
    pub target: Target,

    /// Save every attachment next to the dumps (default: false)
    pub download_attachments: bool,

    /// Directory the dumps are written into (default: current directory)
    pub output_dir: PathBuf,

    /// REST API root (default: [`DEFAULT_API_BASE`])
    pub api_base: String,

    /// Per-request timeout (default: 60s)
    pub request_timeout: Duration,

    /// Proactive throttling between page requests
    pub throttle: ThrottleConfig,
}

impl ArchiveConfig {
    /// Creates a configuration with default values for everything but the
    /// credential and target.
    pub fn new(credential: impl Into<String>, target: Target) -> Self {
        Self {
            credential: credential.into(),
            target,
            download_attachments: false,
            output_dir: PathBuf::from("."),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(60),
            throttle: ThrottleConfig::default(),
        }
    }

    /// Enables or disables attachment downloads.
    #[must_use]
    pub fn with_download_attachments(mut self, enabled: bool) -> Self {
        self.download_attachments = enabled;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the API root, e.g. to point at a mock server.
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the throttle.
    #[must_use]
    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    /// Checks that the configuration can drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.credential.trim().is_empty() {
            return Err(DumpError::configuration("no token provided"));
        }
        if self.target.id().trim().is_empty() {
            return Err(DumpError::configuration("no channel or guild id provided"));
        }
        Ok(())
    }
}

impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("credential", &"<redacted>")
            .field("target", &self.target)
            .field("download_attachments", &self.download_attachments)
            .field("output_dir", &self.output_dir)
            .field("api_base", &self.api_base)
            .field("request_timeout", &self.request_timeout)
            .field("throttle", &self.throttle)
            .finish()
    }
}

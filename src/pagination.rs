//! Backward pagination over a channel's message history.
//!
//! [`PaginationEngine`] is an iterator of pages. Each page is the raw list
//! returned by the messages endpoint, newest first. Internally it walks a small
//! state machine:
//!
//! ```text
//! Requesting(url) ──list──────────────▶ PageReady(messages)
//!       │  ▲                                  │
//!       │  └──── RateLimitedSleep(delay, url) │ non-empty: cursor = last id,
//!       │retry_after        (same url)        │ next Requesting(url before cursor)
//!       ▼                                     ▼
//!  Fatal(error)                        empty: Exhausted
//! ```
//!
//! A rate-limit answer never advances the cursor, and retries are unbounded.
//! Independently of rate limits the engine pauses after every
//! [`ThrottleConfig::every_requests`] successful pages.
//!
//! # Example
//!
//! ```rust,no_run
//! use ddump::api::Endpoints;
//! use ddump::config::ThrottleConfig;
//! use ddump::pagination::{PaginationEngine, ThreadSleeper};
//! use ddump::transport::HttpTransport;
//!
//! let transport = HttpTransport::new("token", std::time::Duration::from_secs(30))?;
//! let endpoints = Endpoints::new("https://discord.com/api/v9")?;
//! let pages = PaginationEngine::new(
//!     &transport,
//!     &ThreadSleeper,
//!     &endpoints,
//!     "123456789",
//!     ThrottleConfig::default(),
//! );
//!
//! for page in pages {
//!     println!("{} messages", page?.len());
//! }
//! # Ok::<(), ddump::DumpError>(())
//! ```

use std::time::Duration;

use serde_json::Value;

use crate::api::Endpoints;
use crate::config::ThrottleConfig;
use crate::error::{DumpError, Result};
use crate::transport::Transport;

/// Blocks the current flow of control.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// What a page request answered.
#[derive(Debug, Clone, PartialEq)]
pub enum PageResponse {
    /// A (possibly empty) list of raw messages, newest first
    Messages(Vec<Value>),
    /// The server asked us to wait `retry_after` seconds
    RateLimited { retry_after: f64 },
}

impl PageResponse {
    /// Classifies a response body.
    ///
    /// Anything that is neither a JSON list nor an object with a numeric
    /// `retry_after` is an [`DumpError::UnexpectedResponse`].
    pub fn classify(context: &str, body: &str) -> Result<Self> {
        let unexpected = || DumpError::unexpected_response(context, body);
        match serde_json::from_str::<Value>(body).map_err(|_| unexpected())? {
            Value::Array(messages) => Ok(PageResponse::Messages(messages)),
            Value::Object(map) => map
                .get("retry_after")
                .and_then(Value::as_f64)
                .map(|retry_after| PageResponse::RateLimited { retry_after })
                .ok_or_else(unexpected),
            _ => Err(unexpected()),
        }
    }
}

/// Converts a `retry_after` in seconds into a sleep duration.
///
/// ```
/// use std::time::Duration;
/// use ddump::pagination::retry_delay;
///
/// assert_eq!(retry_delay(1.5), Duration::from_micros(1_500_000));
/// assert_eq!(retry_delay(-3.0), Duration::ZERO);
/// ```
pub fn retry_delay(retry_after: f64) -> Duration {
    if retry_after.is_finite() && retry_after > 0.0 {
        Duration::from_micros((retry_after * 1_000_000.0) as u64)
    } else {
        Duration::ZERO
    }
}

/// States of the page-fetch loop.
#[derive(Debug)]
pub enum PageState {
    Requesting { url: String },
    RateLimitedSleep { delay: Duration, url: String },
    PageReady(Vec<Value>),
    Exhausted,
    Fatal(DumpError),
}

/// Counters for one pagination run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginationStats {
    /// Requests issued, including rate-limited ones
    pub requests: u64,
    /// Requests that returned a list, including the final empty one
    pub pages: u64,
    /// Raw messages received
    pub messages: u64,
    pub rate_limited: u64,
    pub throttle_pauses: u64,
}

struct Cursor {
    id: String,
    value: u64,
}

/// Iterator over the pages of one channel, newest page first.
///
/// Yields `Ok(messages)` for every non-empty page, then stops. A fatal error
/// is yielded once as `Err` and ends the iteration.
pub struct PaginationEngine<'a> {
    transport: &'a dyn Transport,
    sleeper: &'a dyn Sleeper,
    endpoints: &'a Endpoints,
    channel_id: String,
    throttle: ThrottleConfig,
    state: PageState,
    cursor: Option<Cursor>,
    throttle_pending: bool,
    failed: bool,
    stats: PaginationStats,
}

impl<'a> PaginationEngine<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        sleeper: &'a dyn Sleeper,
        endpoints: &'a Endpoints,
        channel_id: impl Into<String>,
        throttle: ThrottleConfig,
    ) -> Self {
        let channel_id = channel_id.into();
        let url = endpoints.messages(&channel_id, None);
        Self {
            transport,
            sleeper,
            endpoints,
            channel_id,
            throttle,
            state: PageState::Requesting { url },
            cursor: None,
            throttle_pending: false,
            failed: false,
            stats: PaginationStats::default(),
        }
    }

    pub fn stats(&self) -> PaginationStats {
        self.stats
    }

    /// Id of the oldest message seen so far.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_ref().map(|c| c.id.as_str())
    }

    /// Returns `true` once an empty page ended the walk.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, PageState::Exhausted) && !self.failed
    }

    fn request(&mut self, url: String) -> PageState {
        if self.throttle_pending {
            self.throttle_pending = false;
            self.stats.throttle_pauses += 1;
            tracing::debug!(
                channel_id = %self.channel_id,
                pause_ms = self.throttle.pause.as_millis() as u64,
                "Throttling page requests"
            );
            self.sleeper.sleep(self.throttle.pause);
        }

        self.stats.requests += 1;
        let body = match self.transport.fetch_text(&url) {
            Ok(body) => body,
            Err(e) => return PageState::Fatal(e),
        };

        let context = format!("messages of channel {}", self.channel_id);
        match PageResponse::classify(&context, &body) {
            Ok(PageResponse::Messages(messages)) => {
                self.stats.pages += 1;
                self.stats.messages += messages.len() as u64;
                if self.throttle.is_due(self.stats.pages) {
                    self.throttle_pending = true;
                }
                tracing::debug!(
                    channel_id = %self.channel_id,
                    page = self.stats.pages,
                    count = messages.len(),
                    "Fetched page"
                );
                PageState::PageReady(messages)
            }
            Ok(PageResponse::RateLimited { retry_after }) => {
                self.stats.rate_limited += 1;
                let delay = retry_delay(retry_after);
                tracing::warn!(
                    channel_id = %self.channel_id,
                    retry_after,
                    delay_us = delay.as_micros() as u64,
                    "Rate limited, retrying same page"
                );
                PageState::RateLimitedSleep { delay, url }
            }
            Err(e) => PageState::Fatal(e),
        }
    }

    /// Moves the cursor to the oldest message of `messages` and returns the
    /// next request URL.
    fn advance(&mut self, messages: &[Value]) -> Result<String> {
        let context = || format!("messages of channel {}", self.channel_id);
        let Some(last) = messages.last() else {
            return Err(DumpError::unexpected_response(context(), "[]"));
        };
        let id = last
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| DumpError::unexpected_response(context(), last.to_string()))?;
        let value = id
            .parse::<u64>()
            .map_err(|_| DumpError::unexpected_response(context(), last.to_string()))?;

        if let Some(previous) = &self.cursor {
            if value >= previous.value {
                return Err(DumpError::StalledCursor {
                    previous: previous.value,
                    next: value,
                });
            }
        }

        let url = self.endpoints.messages(&self.channel_id, Some(id));
        self.cursor = Some(Cursor {
            id: id.to_string(),
            value,
        });
        Ok(url)
    }
}

impl Iterator for PaginationEngine<'_> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut state = std::mem::replace(&mut self.state, PageState::Exhausted);
        loop {
            state = match state {
                PageState::Requesting { url } => self.request(url),
                PageState::RateLimitedSleep { delay, url } => {
                    self.sleeper.sleep(delay);
                    PageState::Requesting { url }
                }
                PageState::PageReady(messages) if messages.is_empty() => {
                    tracing::debug!(channel_id = %self.channel_id, "Reached start of history");
                    PageState::Exhausted
                }
                PageState::PageReady(messages) => {
                    self.state = match self.advance(&messages) {
                        Ok(url) => PageState::Requesting { url },
                        Err(e) => PageState::Fatal(e),
                    };
                    return Some(Ok(messages));
                }
                PageState::Exhausted => return None,
                PageState::Fatal(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            };
        }
    }
}

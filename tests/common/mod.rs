//! Shared fixtures for the integration tests.
//!
//! [`FakeApi`] is an in-memory stand-in for the REST API and the attachment
//! CDN. It serves channel histories the way the real endpoint does (newest
//! first, `limit` and `before` honoured), can inject rate limits and failures,
//! and doubles as the [`Sleeper`] so tests can check how requests and pauses
//! interleave.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::{Value, json};
use url::Url;

use ddump::api::Endpoints;
use ddump::pagination::Sleeper;
use ddump::transport::Transport;
use ddump::{DumpError, Result};

pub const API_BASE: &str = "http://api.test";

/// Something the fake observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Request(String),
    Download(String),
    Sleep(Duration),
}

#[derive(Default)]
pub struct FakeApi {
    channels: HashMap<String, Value>,
    histories: HashMap<String, Vec<Value>>,
    guilds: HashMap<String, Value>,
    guild_channels: HashMap<String, Vec<Value>>,
    files: HashMap<String, Vec<u8>>,
    broken_channels: HashSet<String>,
    rate_limits: RefCell<HashMap<usize, u32>>,
    fail_at: Cell<Option<usize>>,
    message_requests: Cell<usize>,
    events: RefCell<Vec<Event>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel whose history holds `messages` (any order).
    pub fn with_channel(mut self, id: &str, name: &str, messages: Vec<Value>) -> Self {
        self.channels.insert(
            id.to_string(),
            json!({"id": id, "name": name, "type": 0, "topic": null}),
        );
        self.set_history(id, messages);
        self
    }

    pub fn with_topic(mut self, id: &str, topic: &str) -> Self {
        if let Some(channel) = self.channels.get_mut(id) {
            channel["topic"] = json!(topic);
        }
        self
    }

    /// Makes every messages request of `id` answer with an error object.
    pub fn with_broken_channel(mut self, id: &str) -> Self {
        self.broken_channels.insert(id.to_string());
        self
    }

    pub fn with_guild(mut self, guild: Value, channels: Vec<Value>) -> Self {
        let id = guild["id"].as_str().unwrap_or_default().to_string();
        self.guilds.insert(id.clone(), guild);
        self.guild_channels.insert(id, channels);
        self
    }

    pub fn with_file(mut self, url: &str, bytes: &[u8]) -> Self {
        self.files.insert(url.to_string(), bytes.to_vec());
        self
    }

    /// Answers the `nth` messages request (1-based) with `count` rate limits
    /// before serving it.
    pub fn rate_limit(self, nth: usize, count: u32) -> Self {
        self.rate_limits.borrow_mut().insert(nth, count);
        self
    }

    /// Answers the `nth` messages request (1-based) with a server error.
    pub fn fail_at(self, nth: usize) -> Self {
        self.fail_at.set(Some(nth));
        self
    }

    fn set_history(&mut self, id: &str, mut messages: Vec<Value>) {
        messages.sort_by_key(|m| std::cmp::Reverse(snowflake(m)));
        self.histories.insert(id.to_string(), messages);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Request(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn message_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|url| url.contains("/messages"))
            .collect()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Sleep(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    fn serve_messages(&self, channel_id: &str, url: &Url) -> String {
        let attempt = self.message_requests.get() + 1;

        if let Some(remaining) = self.rate_limits.borrow_mut().get_mut(&attempt) {
            if *remaining > 0 {
                *remaining -= 1;
                return json!({"message": "You are being rate limited.", "retry_after": 0.5, "global": false})
                    .to_string();
            }
        }
        self.message_requests.set(attempt);

        if self.fail_at.get() == Some(attempt) || self.broken_channels.contains(channel_id) {
            return json!({"message": "500: Internal Server Error", "code": 0}).to_string();
        }

        let Some(history) = self.histories.get(channel_id) else {
            return json!({"message": "Unknown Channel", "code": 10003}).to_string();
        };

        let mut limit = 50usize;
        let mut before = u64::MAX;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "limit" => limit = value.parse().unwrap_or(50),
                "before" => before = value.parse().unwrap_or(u64::MAX),
                _ => {}
            }
        }

        let page: Vec<Value> = history
            .iter()
            .filter(|m| snowflake(m) < before)
            .take(limit)
            .cloned()
            .collect();
        Value::Array(page).to_string()
    }
}

impl Transport for FakeApi {
    fn fetch_text(&self, url: &str) -> Result<String> {
        self.events.borrow_mut().push(Event::Request(url.to_string()));
        let parsed = Url::parse(url)?;
        let segments: Vec<&str> = parsed.path_segments().map(Iterator::collect).unwrap_or_default();

        let unknown = || json!({"message": "404: Not Found", "code": 0}).to_string();
        let body = match segments.as_slice() {
            ["channels", id] => self
                .channels
                .get(*id)
                .map(Value::to_string)
                .unwrap_or_else(|| json!({"message": "Unknown Channel", "code": 10003}).to_string()),
            ["channels", id, "messages"] => self.serve_messages(id, &parsed),
            ["guilds", id] => self
                .guilds
                .get(*id)
                .map(Value::to_string)
                .unwrap_or_else(|| json!({"message": "Unknown Guild", "code": 10004}).to_string()),
            ["guilds", id, "channels"] => self
                .guild_channels
                .get(*id)
                .map(|channels| Value::Array(channels.clone()).to_string())
                .unwrap_or_else(unknown),
            _ => unknown(),
        };
        Ok(body)
    }

    fn fetch_binary(&self, url: &str, dest: &Path) -> Result<u64> {
        self.events.borrow_mut().push(Event::Download(url.to_string()));
        let bytes = self
            .files
            .get(url)
            .ok_or_else(|| DumpError::unexpected_response(url, "404 Not Found"))?;
        fs::write(dest, bytes)?;
        Ok(bytes.len() as u64)
    }
}

impl Sleeper for FakeApi {
    fn sleep(&self, duration: Duration) {
        self.events.borrow_mut().push(Event::Sleep(duration));
    }
}

pub fn endpoints() -> Endpoints {
    Endpoints::new(API_BASE).unwrap()
}

fn snowflake(message: &Value) -> u64 {
    message["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .unwrap_or_default()
}

/// A well-formed message with id `id`.
pub fn message(id: u64, content: &str) -> Value {
    json!({
        "id": id.to_string(),
        "timestamp": format!("2021-03-01T10:{:02}:{:02}.000000+00:00", (id / 60) % 60, id % 60),
        "author": {"id": "7", "username": "alice", "discriminator": "0001"},
        "content": content,
        "type": 0,
        "pinned": false,
        "attachments": [],
        "embeds": [],
        "mentions": []
    })
}

/// Messages `first..=last`, each with content `message {id}`.
pub fn history(first: u64, last: u64) -> Vec<Value> {
    (first..=last).map(|id| message(id, &format!("message {}", id))).collect()
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

/// Ids of the CSV rows (header excluded), in file order.
pub fn csv_ids(path: &Path) -> Vec<String> {
    read(path)
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap_or_default().to_string())
        .collect()
}

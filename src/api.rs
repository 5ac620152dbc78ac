//! REST endpoint URLs.
//!
//! ```rust
//! use ddump::api::Endpoints;
//!
//! let endpoints = Endpoints::new("https://discord.com/api/v9")?;
//! assert_eq!(
//!     endpoints.messages("123", Some("456")),
//!     "https://discord.com/api/v9/channels/123/messages?limit=100&before=456"
//! );
//! # Ok::<(), ddump::DumpError>(())
//! ```

use url::Url;

use crate::error::Result;

/// Maximum page size accepted by the messages endpoint.
pub const PAGE_LIMIT: u32 = 100;

/// Builds request URLs relative to an API root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: &str) -> Result<Self> {
        Ok(Self {
            base: Url::parse(base.trim_end_matches('/'))?,
        })
    }

    /// `GET /channels/{channel_id}`
    pub fn channel(&self, channel_id: &str) -> String {
        self.path(&["channels", channel_id]).into()
    }

    /// `GET /channels/{channel_id}/messages?limit=100[&before={cursor}]`
    pub fn messages(&self, channel_id: &str, before: Option<&str>) -> String {
        let mut url = self.path(&["channels", channel_id, "messages"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &PAGE_LIMIT.to_string());
            if let Some(cursor) = before {
                query.append_pair("before", cursor);
            }
        }
        url.into()
    }

    /// `GET /guilds/{guild_id}`
    pub fn guild(&self, guild_id: &str) -> String {
        self.path(&["guilds", guild_id]).into()
    }

    /// `GET /guilds/{guild_id}/channels`
    pub fn guild_channels(&self, guild_id: &str) -> String {
        self.path(&["guilds", guild_id, "channels"]).into()
    }

    fn path(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new("https://discord.com/api/v9").unwrap()
    }

    #[test]
    fn test_channel_url() {
        assert_eq!(
            endpoints().channel("123"),
            "https://discord.com/api/v9/channels/123"
        );
    }

    #[test]
    fn test_first_page_has_no_cursor() {
        assert_eq!(
            endpoints().messages("123", None),
            "https://discord.com/api/v9/channels/123/messages?limit=100"
        );
    }

    #[test]
    fn test_guild_urls() {
        assert_eq!(endpoints().guild("9"), "https://discord.com/api/v9/guilds/9");
        assert_eq!(
            endpoints().guild_channels("9"),
            "https://discord.com/api/v9/guilds/9/channels"
        );
    }

    #[test]
    fn test_trailing_slash_base() {
        let endpoints = Endpoints::new("http://127.0.0.1:8080/api/").unwrap();
        assert_eq!(endpoints.guild("9"), "http://127.0.0.1:8080/api/guilds/9");
    }

    #[test]
    fn test_root_base() {
        let endpoints = Endpoints::new("http://127.0.0.1:8080").unwrap();
        assert_eq!(endpoints.channel("1"), "http://127.0.0.1:8080/channels/1");
    }

    #[test]
    fn test_invalid_base() {
        assert!(Endpoints::new("not a url").is_err());
    }
}

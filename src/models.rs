//! Wire data model for the chat platform's REST API.
//!
//! Every type here is deserialized straight from API responses with serde.
//! Page elements are deserialized one at a time so that a malformed message
//! only fails itself (see [`record`](crate::record)).
//!
//! # Example
//!
//! ```
//! use ddump::models::{Message, MessageType};
//!
//! let raw = serde_json::json!({
//!     "id": "200",
//!     "timestamp": "2021-03-01T10:00:00.000000+00:00",
//!     "author": {"id": "7", "username": "alice", "discriminator": "0001"},
//!     "content": "hello",
//!     "type": 3,
//!     "pinned": false
//! });
//!
//! let msg: Message = serde_json::from_value(raw)?;
//! assert_eq!(msg.kind, MessageType::Call);
//! assert!(msg.attachments.is_empty());
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Milliseconds between the Unix epoch and the first second of 2015, the
/// platform's snowflake epoch.
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_420_070_400_000;

/// Channel type code of a guild text channel.
pub const TEXT_CHANNEL: i64 = 0;

/// CDN root for guild icons and custom emoji.
pub const CDN_BASE: &str = "https://cdn.discordapp.com";

/// Returns the creation time encoded in a snowflake id.
///
/// ```
/// use ddump::models::snowflake_timestamp;
///
/// let created = snowflake_timestamp("175928847299117063").unwrap();
/// assert_eq!(created.to_rfc3339(), "2016-04-30T11:18:25.796+00:00");
/// assert!(snowflake_timestamp("general").is_none());
/// ```
pub fn snowflake_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let raw = id.parse::<u64>().ok()?;
    let millis = i64::try_from(raw >> 22).ok()? + SNOWFLAKE_EPOCH_MS;
    DateTime::from_timestamp_millis(millis)
}

/// One message as returned by `GET /channels/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake id
    pub id: String,

    /// ISO 8601 send time, kept verbatim
    pub timestamp: String,

    pub author: Author,

    pub content: String,

    /// Message type code
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Files attached to the message; `null` is treated as none
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,

    /// Embeds, captured opaquely
    #[serde(default)]
    pub embeds: Option<Value>,

    /// Reactions, captured opaquely
    #[serde(default)]
    pub reactions: Option<Value>,

    /// Mentioned users, captured opaquely
    #[serde(default)]
    pub mentions: Option<Value>,

    pub pinned: bool,

    #[serde(default)]
    pub message_reference: Option<MessageReference>,
}

impl Message {
    /// Id of the message this one replies to or quotes, if any.
    pub fn referenced_message_id(&self) -> Option<&str> {
        self.message_reference
            .as_ref()
            .and_then(|r| r.message_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub discriminator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReference {
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Channel metadata from `GET /channels/{id}`, also used for the entries of
/// `GET /guilds/{id}/channels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub topic: Option<String>,

    /// Channel type code (0 = guild text channel)
    #[serde(rename = "type", default)]
    pub kind: i64,
}

impl Channel {
    /// Returns `true` for guild text channels.
    pub fn is_text(&self) -> bool {
        self.kind == TEXT_CHANNEL
    }
}

/// Guild metadata from `GET /guilds/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,

    pub name: String,

    /// Icon hash; `None` when the guild has no icon
    #[serde(default)]
    pub icon: Option<String>,

    pub owner_id: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub emojis: Vec<Emoji>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: Vec<Role>,
}

impl Guild {
    /// CDN URL of the guild icon.
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("{}/icons/{}/{}.png", CDN_BASE, self.id, hash))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub animated: bool,
}

impl Emoji {
    /// CDN URL of a custom emoji (`.gif` when animated).
    pub fn url(&self) -> Option<String> {
        let ext = if self.animated { "gif" } else { "png" };
        self.id
            .as_ref()
            .map(|id| format!("{}/emojis/{}.{}", CDN_BASE, id, ext))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,

    /// Permission bitset as a decimal string
    pub permissions: String,

    #[serde(default)]
    pub color: u32,
}

/// Message type codes, in the order the API assigns them.
///
/// Codes outside the known range map to [`MessageType::Unknown`] instead of
/// failing, and are labelled `UNKNOWN_TYPE_<code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MessageType {
    Default,
    RecipientAdd,
    RecipientRemove,
    Call,
    ChannelNameChange,
    ChannelIconChange,
    ChannelPinnedMessage,
    GuildMemberJoin,
    UserPremiumGuildSubscription,
    UserPremiumGuildSubscriptionTier1,
    UserPremiumGuildSubscriptionTier2,
    UserPremiumGuildSubscriptionTier3,
    ChannelFollowAdd,
    GuildDiscoveryDisqualified,
    GuildDiscoveryRequalified,
    GuildDiscoveryGracePeriodInitialWarning,
    GuildDiscoveryGracePeriodFinalWarning,
    ThreadCreated,
    Reply,
    ApplicationCommand,
    ThreadStarterMessage,
    GuildInviteReminder,
    Unknown(i64),
}

impl MessageType {
    /// Known types, indexed by code.
    pub const KNOWN: [MessageType; 22] = [
        MessageType::Default,
        MessageType::RecipientAdd,
        MessageType::RecipientRemove,
        MessageType::Call,
        MessageType::ChannelNameChange,
        MessageType::ChannelIconChange,
        MessageType::ChannelPinnedMessage,
        MessageType::GuildMemberJoin,
        MessageType::UserPremiumGuildSubscription,
        MessageType::UserPremiumGuildSubscriptionTier1,
        MessageType::UserPremiumGuildSubscriptionTier2,
        MessageType::UserPremiumGuildSubscriptionTier3,
        MessageType::ChannelFollowAdd,
        MessageType::GuildDiscoveryDisqualified,
        MessageType::GuildDiscoveryRequalified,
        MessageType::GuildDiscoveryGracePeriodInitialWarning,
        MessageType::GuildDiscoveryGracePeriodFinalWarning,
        MessageType::ThreadCreated,
        MessageType::Reply,
        MessageType::ApplicationCommand,
        MessageType::ThreadStarterMessage,
        MessageType::GuildInviteReminder,
    ];

    pub fn from_code(code: i64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::KNOWN.get(index).copied())
            .unwrap_or(MessageType::Unknown(code))
    }

    pub fn code(self) -> i64 {
        match self {
            MessageType::Unknown(code) => code,
            known => Self::KNOWN
                .iter()
                .position(|t| *t == known)
                .map_or(-1, |index| index as i64),
        }
    }

    /// Upper snake case label for known types.
    pub fn label(self) -> Option<&'static str> {
        let label = match self {
            MessageType::Default => "DEFAULT",
            MessageType::RecipientAdd => "RECIPIENT_ADD",
            MessageType::RecipientRemove => "RECIPIENT_REMOVE",
            MessageType::Call => "CALL",
            MessageType::ChannelNameChange => "CHANNEL_NAME_CHANGE",
            MessageType::ChannelIconChange => "CHANNEL_ICON_CHANGE",
            MessageType::ChannelPinnedMessage => "CHANNEL_PINNED_MESSAGE",
            MessageType::GuildMemberJoin => "GUILD_MEMBER_JOIN",
            MessageType::UserPremiumGuildSubscription => "USER_PREMIUM_GUILD_SUBSCRIPTION",
            MessageType::UserPremiumGuildSubscriptionTier1 => {
                "USER_PREMIUM_GUILD_SUBSCRIPTION_TIER_1"
            }
            MessageType::UserPremiumGuildSubscriptionTier2 => {
                "USER_PREMIUM_GUILD_SUBSCRIPTION_TIER_2"
            }
            MessageType::UserPremiumGuildSubscriptionTier3 => {
                "USER_PREMIUM_GUILD_SUBSCRIPTION_TIER_3"
            }
            MessageType::ChannelFollowAdd => "CHANNEL_FOLLOW_ADD",
            MessageType::GuildDiscoveryDisqualified => "GUILD_DISCOVERY_DISQUALIFIED",
            MessageType::GuildDiscoveryRequalified => "GUILD_DISCOVERY_REQUALIFIED",
            MessageType::GuildDiscoveryGracePeriodInitialWarning => {
                "GUILD_DISCOVERY_GRACE_PERIOD_INITIAL_WARNING"
            }
            MessageType::GuildDiscoveryGracePeriodFinalWarning => {
                "GUILD_DISCOVERY_GRACE_PERIOD_FINAL_WARNING"
            }
            MessageType::ThreadCreated => "THREAD_CREATED",
            MessageType::Reply => "REPLY",
            MessageType::ApplicationCommand => "APPLICATION_COMMAND",
            MessageType::ThreadStarterMessage => "THREAD_STARTER_MESSAGE",
            MessageType::GuildInviteReminder => "GUILD_INVITE_REMINDER",
            MessageType::Unknown(_) => return None,
        };
        Some(label)
    }

    /// Text-dump annotation (`msg_type=NAME `), empty for default messages.
    pub fn annotation(self) -> String {
        match self {
            MessageType::Default => String::new(),
            other => format!("msg_type={} ", other),
        }
    }
}

impl From<i64> for MessageType {
    fn from(code: i64) -> Self {
        MessageType::from_code(code)
    }
}

impl From<MessageType> for i64 {
    fn from(kind: MessageType) -> i64 {
        kind.code()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => f.write_str(label),
            None => write!(f, "UNKNOWN_TYPE_{}", self.code()),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

//! Archival of a whole guild.
//!
//! Writes `{guildId}_DUMP/GUILD_{guildId}_DUMP.txt` with the guild's name,
//! icon, owner, creation date, emoji and roles, then archives every text
//! channel into the same directory. Each channel runs in its own failure
//! boundary: a channel that fails is recorded in the [`GuildReport`] and the
//! remaining channels are still archived.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::api::Endpoints;
use crate::channel::{ChannelArchiver, ChannelReport};
use crate::config::ThrottleConfig;
use crate::error::{DumpError, Result};
use crate::models::{Channel, Guild, snowflake_timestamp};
use crate::pagination::Sleeper;
use crate::progress::{ProgressCallback, no_progress};
use crate::transport::Transport;

/// Renders the readable guild summary.
pub fn render_summary(guild: &Guild) -> String {
    let created = snowflake_timestamp(&guild.id)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());

    let mut out = format!("GUILD {} ({})\n", guild.id, guild.name);
    out.push_str(&format!(
        "Icon URL: {}\n",
        guild.icon_url().as_deref().unwrap_or("none")
    ));
    out.push_str(&format!("Owner: {}\n", guild.owner_id));
    out.push_str(&format!("Creation Date: {}\n", created));

    out.push_str("Emoji:\n");
    for emoji in &guild.emojis {
        out.push_str(&format!(
            "Name: {} URL: {}\n",
            emoji.name.as_deref().unwrap_or("unknown"),
            emoji.url().as_deref().unwrap_or("none")
        ));
    }

    out.push_str("Roles:\n");
    for role in &guild.roles {
        out.push_str(&format!(
            "Name: {} ID: {} Permissions: {} Colour: {}\n",
            role.name, role.id, role.permissions, role.color
        ));
    }
    out
}

/// What happened to one channel of a guild run.
#[derive(Debug, Clone)]
pub struct ChannelOutcome {
    pub channel_id: String,
    pub channel_name: String,
    pub result: std::result::Result<ChannelReport, String>,
}

impl ChannelOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcome of a guild archival.
#[derive(Debug, Clone)]
pub struct GuildReport {
    pub guild: Guild,
    /// `{output_dir}/{guildId}_DUMP`
    pub dir: PathBuf,
    pub summary_path: PathBuf,
    /// Channels that were not text channels
    pub skipped_channels: usize,
    pub channels: Vec<ChannelOutcome>,
}

impl GuildReport {
    pub fn succeeded(&self) -> usize {
        self.channels.iter().filter(|c| c.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.channels.len() - self.succeeded()
    }
}

/// Archives a guild and all of its text channels.
pub struct GuildArchiver<'a> {
    transport: &'a dyn Transport,
    sleeper: &'a dyn Sleeper,
    endpoints: &'a Endpoints,
    output_dir: PathBuf,
    download_attachments: bool,
    throttle: ThrottleConfig,
    progress: ProgressCallback,
}

impl<'a> GuildArchiver<'a> {
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

    pub fn fetch_guild(&self, guild_id: &str) -> Result<Guild> {
        self.fetch_json(&self.endpoints.guild(guild_id), &format!("guild {}", guild_id))
    }

    pub fn fetch_channels(&self, guild_id: &str) -> Result<Vec<Channel>> {
        self.fetch_json(
            &self.endpoints.guild_channels(guild_id),
            &format!("channels of guild {}", guild_id),
        )
    }

    fn fetch_json<T: DeserializeOwned>(&self, url: &str, context: &str) -> Result<T> {
        let body = self.transport.fetch_text(url)?;
        serde_json::from_str(&body).map_err(|_| DumpError::unexpected_response(context, body))
    }

    /// Archives the guild summary and every text channel.
    ///
    /// Only failures before the first channel (guild metadata, summary file,
    /// channel listing) are returned as errors.
    pub fn archive(&self, guild_id: &str) -> Result<GuildReport> {
        let guild = self.fetch_guild(guild_id)?;
        tracing::info!(guild_id, name = %guild.name, "Dumping guild");

        let dir = self.output_dir.join(format!("{}_DUMP", guild.id));
        fs::create_dir_all(&dir)?;
        let summary_path = dir.join(format!("GUILD_{}_DUMP.txt", guild.id));
        fs::write(&summary_path, render_summary(&guild))?;

        let channels = self.fetch_channels(guild_id)?;
        let (text, other): (Vec<_>, Vec<_>) = channels.into_iter().partition(Channel::is_text);

        let archiver = ChannelArchiver::new(self.transport, self.sleeper, self.endpoints, &dir)
            .with_download_attachments(self.download_attachments)
            .with_throttle(self.throttle)
            .with_progress(self.progress.clone());

        let mut outcomes = Vec::with_capacity(text.len());
        for channel in text {
            let result = archiver.archive(&channel.id).map_err(|e| {
                tracing::error!(
                    guild_id,
                    channel_id = %channel.id,
                    error = %e,
                    "Channel failed, continuing with the next one"
                );
                e.to_string()
            });
            outcomes.push(ChannelOutcome {
                channel_id: channel.id,
                channel_name: channel.name,
                result,
            });
        }

        let report = GuildReport {
            guild,
            dir,
            summary_path,
            skipped_channels: other.len(),
            channels: outcomes,
        };
        tracing::info!(
            guild_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Guild dumped"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Emoji, Role};

    #[test]
    fn test_render_summary() {
        let guild = Guild {
            id: "175928847299117063".into(),
            name: "Rustaceans".into(),
            icon: Some("abc".into()),
            owner_id: "7".into(),
            emojis: vec![
                Emoji {
                    name: Some("ferris".into()),
                    id: Some("9".into()),
                    animated: false,
                },
                Emoji {
                    name: None,
                    id: None,
                    animated: false,
                },
            ],
            roles: vec![Role {
                id: "1".into(),
                name: "mods".into(),
                permissions: "8".into(),
                color: 3447003,
            }],
        };

        let summary = render_summary(&guild);
        assert_eq!(
            summary,
            "GUILD 175928847299117063 (Rustaceans)\n\
             Icon URL: https://cdn.discordapp.com/icons/175928847299117063/abc.png\n\
             Owner: 7\n\
             Creation Date: 2016-04-30T11:18:25.796+00:00\n\
             Emoji:\n\
             Name: ferris URL: https://cdn.discordapp.com/emojis/9.png\n\
             Name: unknown URL: none\n\
             Roles:\n\
             Name: mods ID: 1 Permissions: 8 Colour: 3447003\n"
        );
    }

    #[test]
    fn test_summary_without_icon() {
        let guild = Guild {
            id: "1".into(),
            name: "Tiny".into(),
            icon: None,
            owner_id: "2".into(),
            emojis: vec![],
            roles: vec![],
        };
        let summary = render_summary(&guild);
        assert!(summary.contains("Icon URL: none\n"));
        assert!(summary.ends_with("Emoji:\nRoles:\n"));
    }
}

//! Command-line interface definition using clap.
//!
//! [`Args`] mirrors the classic `ddump` flags:
//!
//! | Flag | Meaning |
//! |------|---------|
//! | `-t TOKEN` | credential (overrides `DDUMP_TOKEN`) |
//! | `-c CHANNEL_ID` | archive one channel |
//! | `-g GUILD_ID` | archive every text channel of a guild (wins over `-c`) |
//! | `-d` | download attachments |
//! | `-o DIR` | output directory |
//!
//! ```rust
//! use clap::Parser;
//! use ddump::cli::Args;
//! use ddump::config::Target;
//!
//! let args = Args::try_parse_from(["ddump", "-t", "token", "-c", "1", "-g", "2"]).unwrap();
//! let config = args.into_config().unwrap();
//! assert_eq!(config.target, Target::Guild("2".into()));
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ArchiveConfig, DEFAULT_API_BASE, TOKEN_ENV_VAR, Target};
use crate::error::{DumpError, Result};

/// Dump the message history of a Discord channel or guild to TXT and CSV.
#[derive(Parser, Debug, Clone)]
#[command(name = "ddump")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    DDUMP_TOKEN=... ddump -c 123456789012345678
    ddump -t TOKEN -c 123456789012345678 -d
    ddump -t TOKEN -g 987654321098765432 -o dumps")]
pub struct Args {
    /// Use TOKEN for authentication
    #[arg(short = 't', long, value_name = "TOKEN", env = TOKEN_ENV_VAR, hide_env_values = true)]
    pub token: Option<String>,

    /// Dump the channel with this id
    #[arg(short = 'c', long, value_name = "CHANNEL_ID")]
    pub channel: Option<String>,

    /// Dump the guild with this id and all its text channels (overrides --channel)
    #[arg(short = 'g', long, value_name = "GUILD_ID")]
    pub guild: Option<String>,

    /// Download all attachments
    #[arg(short = 'd', long)]
    pub download_attachments: bool,

    /// Directory to write dumps into
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// REST API root
    #[arg(long, value_name = "URL", default_value = DEFAULT_API_BASE, hide = true)]
    pub api_base: String,
}

impl Args {
    /// The archival target; the guild flag wins.
    pub fn target(&self) -> Option<Target> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        non_empty(&self.guild)
            .map(Target::Guild)
            .or_else(|| non_empty(&self.channel).map(Target::Channel))
    }

    /// Converts the flags into a validated [`ArchiveConfig`].
    pub fn into_config(self) -> Result<ArchiveConfig> {
        let token = self
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| DumpError::configuration("no token provided"))?;
        let target = self
            .target()
            .ok_or_else(|| DumpError::configuration("no channel id provided"))?;

        let config = ArchiveConfig::new(token, target)
            .with_download_attachments(self.download_attachments)
            .with_output_dir(self.output)
            .with_api_base(self.api_base);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut full = vec!["ddump"];
        full.extend_from_slice(args);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_channel_target() {
        let config = parse(&["-t", "tok", "-c", "55"]).into_config().unwrap();
        assert_eq!(config.target, Target::Channel("55".into()));
        assert_eq!(config.credential, "tok");
        assert!(!config.download_attachments);
    }

    #[test]
    fn test_guild_overrides_channel() {
        let args = parse(&["-t", "tok", "-c", "55", "-g", "66", "-d"]);
        assert_eq!(args.target(), Some(Target::Guild("66".into())));
        assert!(args.into_config().unwrap().download_attachments);
    }

    #[test]
    fn test_missing_target() {
        let err = parse(&["-t", "tok"]).into_config().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no channel id"));
    }

    #[test]
    fn test_missing_token() {
        let args = Args {
            token: None,
            channel: Some("1".into()),
            guild: None,
            download_attachments: false,
            output: PathBuf::from("."),
            api_base: DEFAULT_API_BASE.into(),
        };
        assert!(args.into_config().unwrap_err().to_string().contains("no token"));
    }

    #[test]
    fn test_output_dir() {
        let config = parse(&["-t", "tok", "-c", "1", "-o", "dumps"])
            .into_config()
            .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("dumps"));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["ddump", "-x"]).is_err());
    }
}

use std::path::PathBuf;

use anyhow::Context;
use chrono::DateTime;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "harbor", version, about = "Fetch channel posts into a local store")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection settings. Every field can also come from the environment or a
/// `.env` file.
#[derive(Debug, Args)]
pub struct Config {
    #[arg(long, global = true, env = "HARBOR_SERVER_URL")]
    pub server_url: Option<String>,

    #[arg(long, global = true, env = "HARBOR_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, global = true, env = "HARBOR_DB_PATH", default_value = "harbor.db")]
    pub db_path: PathBuf,

    #[arg(long, global = true, env = "HARBOR_USER_ID")]
    pub user_id: Option<String>,

    /// Channel treated as on screen. Defaults to the command's channel.
    #[arg(long = "viewing", global = true, env = "HARBOR_CHANNEL_ID")]
    pub channel_id: Option<String>,
}

impl Config {
    pub fn server_url(&self) -> anyhow::Result<&str> {
        self.server_url.as_deref().context("HARBOR_SERVER_URL is not set")
    }

    pub fn token(&self) -> anyhow::Result<&str> {
        self.token.as_deref().context("HARBOR_TOKEN is not set")
    }

    pub fn user_id(&self) -> anyhow::Result<&str> {
        self.user_id.as_deref().context("HARBOR_USER_ID is not set")
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a page of a channel, newest first
    Page {
        channel_id: String,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Fetch posts changed since a timestamp (ms since epoch or RFC 3339)
    Since {
        channel_id: String,
        #[arg(value_parser = parse_since)]
        since: i64,
    },
    /// Fetch posts older than an anchor post
    Before {
        channel_id: String,
        post_id: String,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Fetch posts newer than an anchor post
    After {
        channel_id: String,
        post_id: String,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Fetch both sides of an anchor post plus its thread
    Around {
        channel_id: String,
        post_id: String,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Fetch a root post and its replies
    Thread { root_id: String },
    /// Print stored posts of a channel without touching the network
    Local {
        channel_id: String,
        #[arg(long, default_value_t = 60)]
        limit: u32,
    },
    /// Print a stored thread without touching the network
    LocalThread { root_id: String },
}

impl Command {
    /// The channel a remote command reads from, if it names one.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::Page { channel_id, .. }
            | Self::Since { channel_id, .. }
            | Self::Before { channel_id, .. }
            | Self::After { channel_id, .. }
            | Self::Around { channel_id, .. }
            | Self::Local { channel_id, .. } => Some(channel_id),
            Self::Thread { .. } | Self::LocalThread { .. } => None,
        }
    }
}

fn parse_since(value: &str) -> Result<i64, chrono::ParseError> {
    match value.parse::<i64>() {
        Ok(ms) => Ok(ms),
        Err(_) => DateTime::parse_from_rfc3339(value).map(|t| t.timestamp_millis()),
    }
}

//! Per-server log channel settings

use std::collections::BTreeMap;
use std::path::PathBuf;

use poise::serenity_prelude::{ChannelId, GuildId};
use serde::{Deserialize, Serialize};

use super::{JsonDocument, StoreResult};

/// One server's entry in `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredLogEntry {
    /// Older files stored only the channel id; presence meant enabled
    Legacy(String),
    Full {
        #[serde(
            rename = "logChannel",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        log_channel: Option<String>,
        #[serde(rename = "loggingEnabled", default)]
        logging_enabled: bool,
    },
}

impl StoredLogEntry {
    fn settings(&self) -> LogSettings {
        match self {
            Self::Legacy(channel) => LogSettings {
                channel: parse_channel(channel),
                enabled: true,
            },
            Self::Full {
                log_channel,
                logging_enabled,
            } => LogSettings {
                channel: log_channel.as_deref().and_then(parse_channel),
                enabled: *logging_enabled,
            },
        }
    }
}

fn parse_channel(raw: &str) -> Option<ChannelId> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChannelId::new)
}

/// Resolved log settings for one server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub channel: Option<ChannelId>,
    pub enabled: bool,
}

/// Durable per-server log channel configuration
#[derive(Debug)]
pub struct LogConfigStore {
    document: JsonDocument<BTreeMap<String, StoredLogEntry>>,
}

impl LogConfigStore {
    /// Open `config.json`, starting empty if it does not exist
    ///
    /// # Errors
    ///
    /// Fails if the file is unreadable or is invalid JSON.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Ok(Self {
            document: JsonDocument::open(path).await?,
        })
    }

    /// Settings for a server, `None` if it has never been configured
    pub async fn get(&self, guild_id: GuildId) -> Option<LogSettings> {
        self.document
            .read(|entries| entries.get(&guild_id.to_string()).map(StoredLogEntry::settings))
            .await
    }

    /// Point the server's log at `channel_id` and enable logging
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub async fn set_channel(&self, guild_id: GuildId, channel_id: ChannelId) -> StoreResult<()> {
        self.document
            .update(|entries| {
                entries.insert(
                    guild_id.to_string(),
                    StoredLogEntry::Full {
                        log_channel: Some(channel_id.to_string()),
                        logging_enabled: true,
                    },
                );
            })
            .await
    }

    /// Turn logging on or off, keeping any stored channel
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub async fn set_enabled(&self, guild_id: GuildId, enabled: bool) -> StoreResult<()> {
        self.document
            .update(|entries| {
                let key = guild_id.to_string();
                let log_channel = match entries.get(&key) {
                    Some(StoredLogEntry::Legacy(channel)) => Some(channel.clone()),
                    Some(StoredLogEntry::Full { log_channel, .. }) => log_channel.clone(),
                    None => None,
                };
                entries.insert(
                    key,
                    StoredLogEntry::Full {
                        log_channel,
                        logging_enabled: enabled,
                    },
                );
            })
            .await
    }

    /// Forget the server's settings. Returns whether anything was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub async fn clear(&self, guild_id: GuildId) -> StoreResult<bool> {
        self.document
            .update(|entries| entries.remove(&guild_id.to_string()).is_some())
            .await
    }
}

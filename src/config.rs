//! Bot configuration
//!
//! Loaded once at startup from a YAML file. Every policy that differs between
//! deployments (strike layout, escalation ladder, log-config gate, role diffing)
//! is an explicit field here rather than a hard-coded choice.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::moderation::duration::MAX_TIMEOUT;

/// Default config file location, relative to the working directory
pub const CONFIG_FILE: &str = "data/bot_config.yaml";
/// Environment variable that overrides [`CONFIG_FILE`]
pub const CONFIG_ENV: &str = "WARDEN_CONFIG";
/// Environment variable holding the Discord bot token
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";
/// Environment variable that overrides the liveness port
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{0} must be set")]
    MissingToken(&'static str),

    #[error("Invalid liveness bind address: {0}")]
    InvalidBind(String),

    #[error("Invalid escalation ladder: {0}")]
    InvalidEscalation(String),
}

/// How strike counts are laid out on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeLayout {
    /// `{serverId: {memberId: count}}`
    #[default]
    Nested,
    /// `{memberId: count}`, one count per member shared by every server
    Flat,
}

/// Who may change the log channel configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogConfigGate {
    #[default]
    Administrator,
    ServerOwner,
}

/// How the mirror decides that a member's roles changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDiffMode {
    /// Compare only the number of roles. Misses a simultaneous add and remove.
    #[default]
    Count,
    /// Compare the role names as sets.
    Membership,
}

/// Action applied automatically when a strike count hits a threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    Mute { minutes: u64 },
    Ban,
}

impl EscalationAction {
    /// Mute duration, if this is a mute
    #[must_use]
    pub fn mute_duration(&self) -> Option<Duration> {
        match self {
            Self::Mute { minutes } => Some(Duration::from_secs(minutes.saturating_mul(60))),
            Self::Ban => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationStep {
    pub at: u64,
    /// Written as `ban` or `mute: {minutes: N}`
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub action: EscalationAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub enabled: bool,
    pub bind: String,
    pub body: String,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:3000".to_string(),
            body: "Bot is alive!".to_string(),
        }
    }
}

impl LivenessConfig {
    /// Resolve the bind address, letting `port` replace the configured port.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBind`] if the address or port does not parse.
    pub fn socket_addr(&self, port: Option<&str>) -> Result<SocketAddr, ConfigError> {
        let mut addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.bind.clone()))?;
        if let Some(port) = port {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidBind(format!("port {port}")))?;
            addr.set_port(port);
        }
        Ok(addr)
    }
}

/// Top-level bot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub prefix: char,
    pub data_dir: PathBuf,
    pub strike_layout: StrikeLayout,
    pub escalation: Vec<EscalationStep>,
    pub log_config_gate: LogConfigGate,
    pub owner_id: Option<u64>,
    pub role_diff: RoleDiffMode,
    pub fallback_log_channel: Option<String>,
    pub say_deletes_trigger: bool,
    pub liveness: LivenessConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: '!',
            data_dir: PathBuf::from("data"),
            strike_layout: StrikeLayout::default(),
            escalation: vec![
                EscalationStep {
                    at: 5,
                    action: EscalationAction::Mute { minutes: 60 },
                },
                EscalationStep {
                    at: 10,
                    action: EscalationAction::Ban,
                },
            ],
            log_config_gate: LogConfigGate::default(),
            owner_id: None,
            role_diff: RoleDiffMode::default(),
            fallback_log_channel: Some("logs".to_string()),
            say_deletes_trigger: true,
            liveness: LivenessConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load the configuration from `path`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the escalation ladder is invalid.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration document
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the document is malformed.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Check invariants serde cannot express
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEscalation`] on a zero or duplicate threshold,
    /// or a mute outside one minute to [`MAX_TIMEOUT`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for step in &self.escalation {
            if step.at == 0 {
                return Err(ConfigError::InvalidEscalation(
                    "threshold must be at least 1".to_string(),
                ));
            }
            if let EscalationAction::Mute { minutes } = step.action {
                let in_range = minutes
                    .checked_mul(60)
                    .is_some_and(|secs| secs > 0 && Duration::from_secs(secs) <= MAX_TIMEOUT);
                if !in_range {
                    return Err(ConfigError::InvalidEscalation(format!(
                        "mute at {} must last between 1 and {} minutes",
                        step.at,
                        MAX_TIMEOUT.as_secs() / 60
                    )));
                }
            }
            if !seen.insert(step.at) {
                return Err(ConfigError::InvalidEscalation(format!(
                    "duplicate threshold {}",
                    step.at
                )));
            }
        }
        Ok(())
    }

    /// Path of the strike document
    #[must_use]
    pub fn strikes_path(&self) -> PathBuf {
        self.data_dir.join("warns.json")
    }

    /// Path of the log channel document
    #[must_use]
    pub fn log_config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}

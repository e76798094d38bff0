//! Capability interfaces over the chat platform
//!
//! The moderation core and the log mirror only ever see these traits. The
//! Discord implementation lives in [`crate::discord`]; tests use the
//! `mockall` mocks generated here.

use std::time::Duration;

use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, ChannelId, GuildId, MessageId, UserId};
use thiserror::Error;

/// Errors raised by platform calls
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Discord API error
    #[error("Discord API error: {0}")]
    DiscordApi(#[from] Box<serenity::Error>),

    /// Generic error
    #[error("Platform error: {0}")]
    Other(String),
}

impl From<serenity::Error> for PlatformError {
    fn from(error: serenity::Error) -> Self {
        Self::DiscordApi(Box::new(error))
    }
}

/// Result type for platform calls
pub type PlatformResult<T> = Result<T, PlatformError>;

/// An embed with optional title and named fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbedNotice {
    pub title: Option<String>,
    pub description: String,
    pub fields: Vec<(String, String)>,
}

impl EmbedNotice {
    /// A description-only embed
    pub fn text(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }
}

/// Something to post into a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Plain text, sent as written
    Text(String),
    /// Embed reply to a command
    Embed(EmbedNotice),
    /// Embed mirrored into a log channel, with every mention suppressed
    Log(EmbedNotice),
}

/// Which messages a purge removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeSelector {
    /// The `limit` most recent messages sent before `anchor`
    Before { anchor: MessageId, limit: u8 },
    /// Up to `limit` messages sent after `anchor`
    After { anchor: MessageId, limit: u8 },
}

/// Actions against a server member or user
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Moderatable: Send + Sync {
    async fn kick(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: Option<String>,
    ) -> PlatformResult<()>;

    /// Ban a user. The user need not currently be a member.
    async fn ban(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: Option<String>,
    ) -> PlatformResult<()>;

    /// Time a member out for `duration`, or clear their timeout when `None`
    async fn timeout(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        duration: Option<Duration>,
        reason: String,
    ) -> PlatformResult<()>;
}

/// Channels that accept messages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messageable: Send + Sync {
    async fn send(&self, channel_id: ChannelId, message: OutboundMessage) -> PlatformResult<()>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId)
    -> PlatformResult<()>;

    /// Bulk delete; returns how many messages were removed
    async fn purge(&self, channel_id: ChannelId, selector: PurgeSelector)
    -> PlatformResult<usize>;
}

/// Lookup of a server's channels
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> bool;

    async fn find_channel_by_name(&self, guild_id: GuildId, name: String) -> Option<ChannelId>;
}

/// Anything that carries a set of role names
pub trait RoleBearing {
    fn role_names(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PlatformError::Other("boom".to_string());
        assert_eq!(error.to_string(), "Platform error: boom");
    }

    #[test]
    fn test_text_embed() {
        let notice = EmbedNotice::text("hello");
        assert_eq!(notice.title, None);
        assert_eq!(notice.description, "hello");
        assert!(notice.fields.is_empty());
    }
}

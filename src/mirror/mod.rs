//! Event log mirror
//!
//! Renders membership and message lifecycle events into a server's log
//! channel. Delivery is best-effort: failures are logged and dropped, never
//! retried and never raised to the gateway handler.

pub mod render;
mod snapshot;

use std::sync::Arc;

use chrono::Utc;
use poise::serenity_prelude::{ChannelId, GuildId};
use tracing::debug;

pub use snapshot::{MemberSnapshot, MessageSnapshot};

use crate::EVENT_TARGET;
use crate::config::{BotConfig, RoleDiffMode};
use crate::logging;
use crate::moderation::platform::{ChannelDirectory, EmbedNotice, Messageable, OutboundMessage};
use crate::store::LogConfigStore;

pub struct LogMirror {
    log_config: Arc<LogConfigStore>,
    directory: Arc<dyn ChannelDirectory>,
    messages: Arc<dyn Messageable>,
    fallback_channel: Option<String>,
    role_diff: RoleDiffMode,
}

impl LogMirror {
    pub fn new(
        config: &BotConfig,
        log_config: Arc<LogConfigStore>,
        directory: Arc<dyn ChannelDirectory>,
        messages: Arc<dyn Messageable>,
    ) -> Self {
        Self {
            log_config,
            directory,
            messages,
            fallback_channel: config.fallback_log_channel.clone(),
            role_diff: config.role_diff,
        }
    }

    /// Where this server's notices go. Nothing when logging is off or was
    /// never configured; the fallback channel name when enabled without a
    /// stored id.
    pub async fn destination(&self, guild_id: GuildId) -> Option<ChannelId> {
        let settings = self.log_config.get(guild_id).await?;
        if !settings.enabled {
            return None;
        }
        match settings.channel {
            Some(channel_id) => Some(channel_id),
            None => {
                let name = self.fallback_channel.clone()?;
                self.directory.find_channel_by_name(guild_id, name).await
            }
        }
    }

    pub async fn member_joined(&self, guild_id: GuildId, member: &MemberSnapshot) {
        self.deliver(
            guild_id,
            "member_joined",
            render::member_joined(member, Utc::now()),
        )
        .await;
    }

    pub async fn member_left(&self, guild_id: GuildId, member: &MemberSnapshot) {
        self.deliver(
            guild_id,
            "member_left",
            render::member_left(member, Utc::now()),
        )
        .await;
    }

    /// Emits a nickname notice and a role notice independently; either, both
    /// or neither may fire.
    pub async fn member_updated(
        &self,
        guild_id: GuildId,
        old: &MemberSnapshot,
        new: &MemberSnapshot,
    ) {
        if old.nickname != new.nickname {
            self.deliver(
                guild_id,
                "nickname_changed",
                render::nickname_changed(old, new),
            )
            .await;
        }
        if render::roles_changed(old, new, self.role_diff) {
            self.deliver(guild_id, "roles_updated", render::roles_updated(old, new))
                .await;
        }
    }

    pub async fn message_deleted(&self, guild_id: GuildId, message: &MessageSnapshot) {
        if message.author_is_bot {
            return;
        }
        self.deliver(
            guild_id,
            "message_deleted",
            render::message_deleted(message),
        )
        .await;
    }

    /// Skipped for bot authors and for edits that leave the text unchanged,
    /// such as embed unfurls.
    pub async fn message_edited(&self, guild_id: GuildId, before: &MessageSnapshot, after: &str) {
        if before.author_is_bot || before.content.as_deref() == Some(after) {
            return;
        }
        self.deliver(
            guild_id,
            "message_edited",
            render::message_edited(before, after, before.channel_id),
        )
        .await;
    }

    async fn deliver(&self, guild_id: GuildId, event: &str, notice: EmbedNotice) {
        let Some(channel_id) = self.destination(guild_id).await else {
            return;
        };

        match self
            .messages
            .send(channel_id, OutboundMessage::Log(notice))
            .await
        {
            Ok(()) => {
                debug!(
                    target: EVENT_TARGET,
                    event = %event,
                    guild_id = %guild_id,
                    channel_id = %channel_id,
                    "Log notice delivered"
                );
            }
            Err(e) => logging::log_event_failure(event, &e),
        }
    }
}

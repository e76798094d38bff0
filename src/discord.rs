//! Discord implementation of the capability traits, plus conversions from
//! serenity models into the platform-neutral types the core consumes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{
    Cache, Channel, ChannelId, CreateAllowedMentions, CreateEmbed,
    CreateMessage, EditMember, GetMessages, GuildId, Http, Member, Message, MessageId,
    Permissions, Timestamp, User, UserId,
};
use tracing::debug;

use crate::EVENT_TARGET;
use crate::commands::router::{self, Invocation};
use crate::mirror::{MemberSnapshot, MessageSnapshot};
use crate::moderation::platform::{
    ChannelDirectory, EmbedNotice, Messageable, Moderatable, OutboundMessage, PlatformError,
    PlatformResult, PurgeSelector,
};
use crate::moderation::{Actor, TargetMember};

/// Embed accent colour
pub const EMBED_COLOUR: u32 = 0x5865_F2;

/// Discord refuses to bulk delete messages older than this
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;

/// Whether a message sent at `sent_at` (unix seconds) can still be bulk deleted at `now`
#[must_use]
pub fn is_bulk_deletable(sent_at: i64, now: i64) -> bool {
    now - sent_at < BULK_DELETE_MAX_AGE_SECS
}

/// Convert a serenity timestamp into a chrono one
#[must_use]
pub fn to_datetime(timestamp: Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.unix_timestamp(), 0).unwrap_or_default()
}

/// Build the embed sent for a notice
#[must_use]
pub fn build_embed(notice: &EmbedNotice) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .colour(EMBED_COLOUR)
        .description(&notice.description);
    if let Some(title) = &notice.title {
        embed = embed.title(title);
    }
    for (name, value) in &notice.fields {
        embed = embed.field(name, value, false);
    }
    embed
}

/// Talks to Discord over REST, consulting the gateway cache where it can
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityPlatform {
    #[must_use]
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    fn http(&self) -> &Http {
        &self.http
    }

    /// `Some(answer)` when the guild is cached. The cache guard is dropped
    /// before returning.
    fn cached_channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<bool> {
        self.cache
            .guild(guild_id)
            .map(|guild| guild.channels.contains_key(&channel_id))
    }

    fn cached_channel_by_name(&self, guild_id: GuildId, name: &str) -> Option<Option<ChannelId>> {
        self.cache.guild(guild_id).map(|guild| {
            guild
                .channels
                .values()
                .find(|channel| channel.name == name)
                .map(|channel| channel.id)
        })
    }
}

#[async_trait]
impl Moderatable for SerenityPlatform {
    async fn kick(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: Option<String>,
    ) -> PlatformResult<()> {
        match reason {
            Some(reason) => guild_id.kick_with_reason(self.http(), user_id, &reason).await?,
            None => guild_id.kick(self.http(), user_id).await?,
        }
        Ok(())
    }

    async fn ban(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: Option<String>,
    ) -> PlatformResult<()> {
        match reason {
            Some(reason) => {
                guild_id
                    .ban_with_reason(self.http(), user_id, 0, &reason)
                    .await?;
            }
            None => guild_id.ban(self.http(), user_id, 0).await?,
        }
        Ok(())
    }

    async fn timeout(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        duration: Option<Duration>,
        reason: String,
    ) -> PlatformResult<()> {
        let edit = match duration {
            Some(duration) => {
                let length = chrono::Duration::from_std(duration)
                    .map_err(|e| PlatformError::Other(e.to_string()))?;
                EditMember::new().disable_communication_until_datetime((Utc::now() + length).into())
            }
            None => EditMember::new().enable_communication(),
        };

        guild_id
            .edit_member(self.http(), user_id, edit.audit_log_reason(&reason))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Messageable for SerenityPlatform {
    async fn send(&self, channel_id: ChannelId, message: OutboundMessage) -> PlatformResult<()> {
        let builder = match message {
            OutboundMessage::Text(text) => CreateMessage::new().content(text),
            OutboundMessage::Embed(notice) => CreateMessage::new().embed(build_embed(&notice)),
            OutboundMessage::Log(notice) => CreateMessage::new()
                .embed(build_embed(&notice))
                .allowed_mentions(CreateAllowedMentions::new()),
        };
        channel_id.send_message(self.http(), builder).await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> PlatformResult<()> {
        channel_id.delete_message(self.http(), message_id).await?;
        Ok(())
    }

    async fn purge(&self, channel_id: ChannelId, selector: PurgeSelector) -> PlatformResult<usize> {
        let query = match selector {
            PurgeSelector::Before { anchor, limit } => {
                GetMessages::new().before(anchor).limit(limit)
            }
            PurgeSelector::After { anchor, limit } => GetMessages::new().after(anchor).limit(limit),
        };
        let messages = channel_id.messages(self.http(), query).await?;

        let now = Utc::now().timestamp();
        let ids: Vec<MessageId> = messages
            .iter()
            .filter(|message| is_bulk_deletable(message.timestamp.unix_timestamp(), now))
            .map(|message| message.id)
            .collect();
        let skipped = messages.len() - ids.len();
        if skipped > 0 {
            debug!(
                target: EVENT_TARGET,
                channel_id = %channel_id,
                skipped,
                "Skipped messages too old to bulk delete"
            );
        }

        // The bulk endpoint needs at least two ids
        match ids.as_slice() {
            [] => {}
            [id] => channel_id.delete_message(self.http(), *id).await?,
            _ => channel_id.delete_messages(self.http(), &ids).await?,
        }
        Ok(ids.len())
    }
}

#[async_trait]
impl ChannelDirectory for SerenityPlatform {
    async fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        if let Some(exists) = self.cached_channel_exists(guild_id, channel_id) {
            return exists;
        }
        match channel_id.to_channel(self.http()).await {
            Ok(Channel::Guild(channel)) => channel.guild_id == guild_id,
            _ => false,
        }
    }

    async fn find_channel_by_name(&self, guild_id: GuildId, name: String) -> Option<ChannelId> {
        if let Some(found) = self.cached_channel_by_name(guild_id, &name) {
            return found;
        }
        let channels = guild_id.channels(self.http()).await.ok()?;
        channels
            .into_values()
            .find(|channel| channel.name == name)
            .map(|channel| channel.id)
    }
}

fn target_of(user: &User) -> TargetMember {
    TargetMember {
        id: user.id,
        tag: user.tag(),
    }
}

/// Build the router's view of an inbound message
#[must_use]
pub fn invocation_from_message(cache: &Arc<Cache>, message: &Message) -> Invocation {
    let is_guild_owner = message
        .guild_id
        .and_then(|guild_id| cache.guild(guild_id).map(|guild| guild.owner_id == message.author.id))
        .unwrap_or(false);
    let permissions = message
        .author_permissions(cache)
        .unwrap_or_else(Permissions::empty);

    Invocation {
        guild_id: message.guild_id,
        channel_id: message.channel_id,
        message_id: message.id,
        actor: Actor {
            id: message.author.id,
            tag: message.author.tag(),
            permissions,
            is_guild_owner,
        },
        author_is_bot: message.author.bot,
        content: message.content.clone(),
        mentioned_members: message.mentions.iter().map(target_of).collect(),
        mentioned_channels: router::channel_mentions(&message.content),
    }
}

/// Snapshot a member, resolving role names from the cache. Roles are listed
/// highest first.
#[must_use]
pub fn member_snapshot(cache: &Arc<Cache>, member: &Member) -> MemberSnapshot {
    let mut roles = member.roles(cache).unwrap_or_default();
    roles.sort_by(|a, b| b.position.cmp(&a.position));

    MemberSnapshot {
        user_id: member.user.id,
        tag: member.user.tag(),
        nickname: member.nick.clone(),
        roles: roles.into_iter().map(|role| role.name).collect(),
        joined_at: member.joined_at.map(to_datetime),
        account_created: to_datetime(member.user.id.created_at()),
    }
}

/// Snapshot of a user who is no longer a member and was not cached
#[must_use]
pub fn user_snapshot(user: &User) -> MemberSnapshot {
    MemberSnapshot {
        user_id: user.id,
        tag: user.tag(),
        nickname: None,
        roles: Vec::new(),
        joined_at: None,
        account_created: to_datetime(user.id.created_at()),
    }
}

#[must_use]
pub fn message_snapshot(message: &Message) -> MessageSnapshot {
    MessageSnapshot {
        message_id: message.id,
        channel_id: message.channel_id,
        author_tag: Some(message.author.tag()),
        author_is_bot: message.author.bot,
        content: Some(message.content.clone()),
    }
}

/// Placeholder for a deleted message the cache never saw
#[must_use]
pub fn unknown_message(channel_id: ChannelId, message_id: MessageId) -> MessageSnapshot {
    MessageSnapshot {
        message_id,
        channel_id,
        author_tag: None,
        author_is_bot: false,
        content: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_delete_age_window() {
        let now = 2_000_000_000;
        assert!(is_bulk_deletable(now - 60, now));
        assert!(is_bulk_deletable(now - BULK_DELETE_MAX_AGE_SECS + 1, now));
        assert!(!is_bulk_deletable(now - BULK_DELETE_MAX_AGE_SECS, now));
        assert!(!is_bulk_deletable(now - 30 * 24 * 60 * 60, now));
    }

    #[test]
    fn test_to_datetime() {
        let timestamp = Timestamp::from_unix_timestamp(1_700_000_000).expect("timestamp");
        assert_eq!(to_datetime(timestamp).timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_unknown_message_has_no_author() {
        let snapshot = unknown_message(ChannelId::new(1), MessageId::new(2));
        assert_eq!(snapshot.author_tag, None);
        assert_eq!(snapshot.content, None);
        assert!(!snapshot.author_is_bot);
    }
}

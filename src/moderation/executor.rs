//! Moderation action executor
//!
//! Every action runs the same template: gate, resolve the target, validate
//! arguments, call the platform, then confirm. Platform failures become a
//! generic notice; the underlying error only travels as the error source.

use std::sync::Arc;

use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use serenity::utils::parse_user_mention;
use tracing::info;

use super::duration;
use super::platform::{Messageable, Moderatable, PurgeSelector};
use super::{Actor, Capability, CommandError, PermissionGate};
use crate::COMMAND_TARGET;

/// Largest batch a single purge may remove
pub const PURGE_LIMIT: u8 = 100;

/// A member referenced by a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMember {
    pub id: UserId,
    pub tag: String,
}

/// A parsed `purge` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeRequest {
    Latest(u8),
    After(MessageId),
}

impl PurgeRequest {
    /// Parse `<n>` or `after <messageId>`
    #[must_use]
    pub fn parse(args: &[String]) -> Option<Self> {
        match args {
            [count] => count
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=PURGE_LIMIT).contains(n))
                .map(Self::Latest),
            [keyword, id] if keyword.eq_ignore_ascii_case("after") => {
                id.parse::<MessageId>().ok().map(Self::After)
            }
            _ => None,
        }
    }

    fn selector(self, trigger: MessageId) -> PurgeSelector {
        match self {
            Self::Latest(limit) => PurgeSelector::Before {
                anchor: trigger,
                limit,
            },
            Self::After(anchor) => PurgeSelector::After {
                anchor,
                limit: PURGE_LIMIT,
            },
        }
    }
}

/// Accepts a raw id or a `<@id>` / `<@!id>` mention
fn parse_user_id(raw: &str) -> Option<UserId> {
    parse_user_mention(raw).or_else(|| raw.parse().ok())
}

pub struct ModerationExecutor {
    gate: PermissionGate,
    prefix: char,
    moderator: Arc<dyn Moderatable>,
    messages: Arc<dyn Messageable>,
}

impl ModerationExecutor {
    pub fn new(
        gate: PermissionGate,
        prefix: char,
        moderator: Arc<dyn Moderatable>,
        messages: Arc<dyn Messageable>,
    ) -> Self {
        Self {
            gate,
            prefix,
            moderator,
            messages,
        }
    }

    fn require(
        &self,
        actor: &Actor,
        capability: Capability,
        notice: &str,
    ) -> Result<(), CommandError> {
        if self.gate.authorize(actor, capability) {
            Ok(())
        } else {
            Err(CommandError::denied(notice))
        }
    }

    /// # Errors
    ///
    /// Denied, missing target, or rejected by the platform.
    pub async fn kick(
        &self,
        guild_id: GuildId,
        actor: &Actor,
        target: Option<&TargetMember>,
    ) -> Result<String, CommandError> {
        self.require(
            actor,
            Capability::KickMembers,
            "You do not have permission to kick members.",
        )?;
        let target =
            target.ok_or_else(|| CommandError::validation("Please mention a user to kick."))?;

        self.moderator
            .kick(
                guild_id,
                target.id,
                Some(format!("Kicked by {}", actor.tag)),
            )
            .await
            .map_err(|e| CommandError::platform("I couldn't kick that user.", e))?;

        info!(
            target: COMMAND_TARGET,
            guild_id = %guild_id,
            user_id = %target.id,
            moderator_id = %actor.id,
            action = "kick",
            "Moderation action applied"
        );
        Ok(format!("Kicked {}", target.tag))
    }

    /// # Errors
    ///
    /// Denied, missing target, or rejected by the platform.
    pub async fn ban(
        &self,
        guild_id: GuildId,
        actor: &Actor,
        target: Option<&TargetMember>,
    ) -> Result<String, CommandError> {
        self.require(
            actor,
            Capability::BanMembers,
            "You do not have permission to ban members.",
        )?;
        let target =
            target.ok_or_else(|| CommandError::validation("Please mention a user to ban."))?;

        self.moderator
            .ban(
                guild_id,
                target.id,
                Some(format!("Banned by {}", actor.tag)),
            )
            .await
            .map_err(|e| CommandError::platform("I couldn't ban that user.", e))?;

        info!(
            target: COMMAND_TARGET,
            guild_id = %guild_id,
            user_id = %target.id,
            moderator_id = %actor.id,
            action = "ban",
            "Moderation action applied"
        );
        Ok(format!("Banned {}", target.tag))
    }

    /// Ban by raw id; the user need not be a member.
    ///
    /// # Errors
    ///
    /// Denied, missing or malformed id, or rejected by the platform.
    pub async fn hackban(
        &self,
        guild_id: GuildId,
        actor: &Actor,
        raw_id: Option<&str>,
    ) -> Result<String, CommandError> {
        self.require(
            actor,
            Capability::BanMembers,
            "You do not have permission to ban members.",
        )?;
        let user_id = raw_id
            .and_then(parse_user_id)
            .ok_or_else(|| CommandError::validation("Please provide a user ID to ban."))?;

        self.moderator
            .ban(guild_id, user_id, Some(format!("Banned by {}", actor.tag)))
            .await
            .map_err(|e| CommandError::platform("I couldn't ban that user ID.", e))?;

        info!(
            target: COMMAND_TARGET,
            guild_id = %guild_id,
            user_id = %user_id,
            moderator_id = %actor.id,
            action = "hackban",
            "Moderation action applied"
        );
        Ok(format!("Banned user with ID {user_id}"))
    }

    /// # Errors
    ///
    /// Denied, missing target or duration, invalid duration, or rejected by the platform.
    pub async fn timeout(
        &self,
        guild_id: GuildId,
        actor: &Actor,
        target: Option<&TargetMember>,
        length: Option<&str>,
    ) -> Result<String, CommandError> {
        self.require(
            actor,
            Capability::ModerateMembers,
            "You don't have permission to timeout members.",
        )?;
        let (Some(target), Some(length)) = (target, length) else {
            return Err(CommandError::validation(format!(
                "Usage: {}timeout @user 10m",
                self.prefix
            )));
        };
        let duration = duration::parse_timeout(length).ok_or_else(|| {
            CommandError::validation("Invalid timeout duration (max is 28 days).")
        })?;

        self.moderator
            .timeout(
                guild_id,
                target.id,
                Some(duration),
                format!("Timed out by {}", actor.tag),
            )
            .await
            .map_err(|e| CommandError::platform("I couldn't timeout that user.", e))?;

        info!(
            target: COMMAND_TARGET,
            guild_id = %guild_id,
            user_id = %target.id,
            moderator_id = %actor.id,
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            action = "timeout",
            "Moderation action applied"
        );
        Ok(format!("Timed out {} for {length}", target.tag))
    }

    /// Clear a timeout; modeled as a timeout with no duration.
    ///
    /// # Errors
    ///
    /// Denied, missing target, or rejected by the platform.
    pub async fn untimeout(
        &self,
        guild_id: GuildId,
        actor: &Actor,
        target: Option<&TargetMember>,
    ) -> Result<String, CommandError> {
        self.require(
            actor,
            Capability::ModerateMembers,
            "You don't have permission to remove timeouts.",
        )?;
        let target = target
            .ok_or_else(|| CommandError::validation("Please mention a user to remove timeout."))?;

        self.moderator
            .timeout(
                guild_id,
                target.id,
                None,
                format!("Timeout removed by {}", actor.tag),
            )
            .await
            .map_err(|e| {
                CommandError::platform("I couldn't remove the timeout from that user.", e)
            })?;

        info!(
            target: COMMAND_TARGET,
            guild_id = %guild_id,
            user_id = %target.id,
            moderator_id = %actor.id,
            action = "untimeout",
            "Moderation action applied"
        );
        Ok(format!("Removed timeout from {}", target.tag))
    }

    /// Bulk delete recent messages in `channel_id`
    ///
    /// # Errors
    ///
    /// Denied, malformed arguments, or rejected by the platform.
    pub async fn purge(
        &self,
        actor: &Actor,
        channel_id: ChannelId,
        trigger: MessageId,
        args: &[String],
    ) -> Result<String, CommandError> {
        self.require(
            actor,
            Capability::ManageMessages,
            "You do not have permission to delete messages.",
        )?;
        let request = PurgeRequest::parse(args).ok_or_else(|| {
            CommandError::validation(format!(
                "Usage: {p}purge <1-{PURGE_LIMIT}> or {p}purge after <messageId>",
                p = self.prefix
            ))
        })?;

        let deleted = self
            .messages
            .purge(channel_id, request.selector(trigger))
            .await
            .map_err(|e| CommandError::platform("I couldn't delete those messages.", e))?;

        info!(
            target: COMMAND_TARGET,
            channel_id = %channel_id,
            moderator_id = %actor.id,
            deleted = deleted,
            action = "purge",
            "Moderation action applied"
        );
        Ok(match deleted {
            1 => "Deleted 1 message.".to_string(),
            n => format!("Deleted {n} messages."),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::platform::{MockMessageable, MockModeratable, PlatformError};
    use poise::serenity_prelude::Permissions;
    use std::time::Duration;

    const GUILD: GuildId = GuildId::new(111);
    const CHANNEL: ChannelId = ChannelId::new(333);
    const TRIGGER: MessageId = MessageId::new(444);

    fn actor(permissions: Permissions) -> Actor {
        Actor {
            id: UserId::new(1),
            tag: "mod".to_string(),
            permissions,
            is_guild_owner: false,
        }
    }

    fn target() -> TargetMember {
        TargetMember {
            id: UserId::new(12345),
            tag: "troll".to_string(),
        }
    }

    fn executor(moderator: MockModeratable, messages: MockMessageable) -> ModerationExecutor {
        ModerationExecutor::new(
            PermissionGate::default(),
            '!',
            Arc::new(moderator),
            Arc::new(messages),
        )
    }

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_kick_success() {
        let mut moderator = MockModeratable::new();
        moderator
            .expect_kick()
            .withf(|guild, user, reason| {
                *guild == GUILD
                    && *user == UserId::new(12345)
                    && reason.as_deref() == Some("Kicked by mod")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let executor = executor(moderator, MockMessageable::new());

        let reply = executor
            .kick(GUILD, &actor(Permissions::KICK_MEMBERS), Some(&target()))
            .await
            .expect("kick");
        assert_eq!(reply, "Kicked troll");
    }

    #[tokio::test]
    async fn test_denied_kick_never_calls_platform() {
        // No expectations: any platform call panics the mock
        let executor = executor(MockModeratable::new(), MockMessageable::new());
        let result = executor
            .kick(GUILD, &actor(Permissions::BAN_MEMBERS), Some(&target()))
            .await;
        assert!(matches!(result, Err(CommandError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_missing_target_is_usage_error() {
        let executor = executor(MockModeratable::new(), MockMessageable::new());
        let error = executor
            .ban(GUILD, &actor(Permissions::BAN_MEMBERS), None)
            .await
            .expect_err("no target");
        assert_eq!(error.to_string(), "Please mention a user to ban.");
    }

    #[tokio::test]
    async fn test_platform_failure_is_generic() {
        let mut moderator = MockModeratable::new();
        moderator
            .expect_ban()
            .times(1)
            .returning(|_, _, _| Err(PlatformError::Other("Missing Permissions".to_string())));
        let executor = executor(moderator, MockMessageable::new());

        let error = executor
            .ban(GUILD, &actor(Permissions::BAN_MEMBERS), Some(&target()))
            .await
            .expect_err("rejected");
        assert!(matches!(error, CommandError::PlatformActionFailed { .. }));
        assert_eq!(error.to_string(), "I couldn't ban that user.");
    }

    #[tokio::test]
    async fn test_hackban_by_raw_id() {
        let mut moderator = MockModeratable::new();
        moderator
            .expect_ban()
            .withf(|_, user, _| *user == UserId::new(987_654_321))
            .times(2)
            .returning(|_, _, _| Ok(()));
        let executor = executor(moderator, MockMessageable::new());
        let admin = actor(Permissions::BAN_MEMBERS);

        let reply = executor
            .hackban(GUILD, &admin, Some("987654321"))
            .await
            .expect("hackban");
        assert_eq!(reply, "Banned user with ID 987654321");

        executor
            .hackban(GUILD, &admin, Some("<@!987654321>"))
            .await
            .expect("mention form");
    }

    #[tokio::test]
    async fn test_hackban_rejects_malformed_id() {
        let executor = executor(MockModeratable::new(), MockMessageable::new());
        let admin = actor(Permissions::BAN_MEMBERS);
        for raw in [None, Some("not-an-id"), Some("0")] {
            let error = executor
                .hackban(GUILD, &admin, raw)
                .await
                .expect_err("invalid");
            assert_eq!(error.to_string(), "Please provide a user ID to ban.");
        }
    }

    #[tokio::test]
    async fn test_timeout_applies_parsed_duration() {
        let mut moderator = MockModeratable::new();
        moderator
            .expect_timeout()
            .withf(|_, _, duration, reason| {
                *duration == Some(Duration::from_millis(600_000)) && reason == "Timed out by mod"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let executor = executor(moderator, MockMessageable::new());

        let reply = executor
            .timeout(
                GUILD,
                &actor(Permissions::MODERATE_MEMBERS),
                Some(&target()),
                Some("10m"),
            )
            .await
            .expect("timeout");
        assert_eq!(reply, "Timed out troll for 10m");
    }

    #[tokio::test]
    async fn test_timeout_over_ceiling_is_rejected_before_platform() {
        let executor = executor(MockModeratable::new(), MockMessageable::new());
        let error = executor
            .timeout(
                GUILD,
                &actor(Permissions::MODERATE_MEMBERS),
                Some(&target()),
                Some("29d"),
            )
            .await
            .expect_err("too long");
        assert_eq!(
            error.to_string(),
            "Invalid timeout duration (max is 28 days)."
        );

        let error = executor
            .timeout(
                GUILD,
                &actor(Permissions::MODERATE_MEMBERS),
                Some(&target()),
                Some("soon"),
            )
            .await
            .expect_err("garbage");
        assert_eq!(
            error.to_string(),
            "Invalid timeout duration (max is 28 days)."
        );
    }

    #[tokio::test]
    async fn test_timeout_requires_duration() {
        let executor = executor(MockModeratable::new(), MockMessageable::new());
        let error = executor
            .timeout(
                GUILD,
                &actor(Permissions::MODERATE_MEMBERS),
                Some(&target()),
                None,
            )
            .await
            .expect_err("usage");
        assert_eq!(error.to_string(), "Usage: !timeout @user 10m");
    }

    #[tokio::test]
    async fn test_untimeout_clears_with_no_duration() {
        let mut moderator = MockModeratable::new();
        moderator
            .expect_timeout()
            .withf(|_, _, duration, reason| {
                duration.is_none() && reason == "Timeout removed by mod"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let executor = executor(moderator, MockMessageable::new());

        let reply = executor
            .untimeout(
                GUILD,
                &actor(Permissions::MODERATE_MEMBERS),
                Some(&target()),
            )
            .await
            .expect("untimeout");
        assert_eq!(reply, "Removed timeout from troll");
    }

    #[test]
    fn test_parse_user_id_forms() {
        assert_eq!(parse_user_id("555"), Some(UserId::new(555)));
        assert_eq!(parse_user_id("<@555>"), Some(UserId::new(555)));
        assert_eq!(parse_user_id("<@!555>"), Some(UserId::new(555)));
        assert_eq!(parse_user_id("0"), None);
        assert_eq!(parse_user_id("<#555>"), None);
        assert_eq!(parse_user_id("someone"), None);
    }

    #[test]
    fn test_purge_request_parse() {
        assert_eq!(
            PurgeRequest::parse(&args(&["10"])),
            Some(PurgeRequest::Latest(10))
        );
        assert_eq!(
            PurgeRequest::parse(&args(&["100"])),
            Some(PurgeRequest::Latest(100))
        );
        assert_eq!(PurgeRequest::parse(&args(&["0"])), None);
        assert_eq!(PurgeRequest::parse(&args(&["101"])), None);
        assert_eq!(
            PurgeRequest::parse(&args(&["after", "555"])),
            Some(PurgeRequest::After(MessageId::new(555)))
        );
        assert_eq!(PurgeRequest::parse(&args(&["after"])), None);
        assert_eq!(PurgeRequest::parse(&args(&["after", "0"])), None);
        assert_eq!(PurgeRequest::parse(&args(&[])), None);
    }

    #[tokio::test]
    async fn test_purge_latest_anchors_on_trigger() {
        let mut messages = MockMessageable::new();
        messages
            .expect_purge()
            .withf(|channel, selector| {
                *channel == CHANNEL
                    && *selector == PurgeSelector::Before { anchor: TRIGGER, limit: 25 }
            })
            .times(1)
            .returning(|_, _| Ok(25));
        let executor = executor(MockModeratable::new(), messages);

        let reply = executor
            .purge(
                &actor(Permissions::MANAGE_MESSAGES),
                CHANNEL,
                TRIGGER,
                &args(&["25"]),
            )
            .await
            .expect("purge");
        assert_eq!(reply, "Deleted 25 messages.");
    }

    #[tokio::test]
    async fn test_purge_requires_manage_messages() {
        let executor = executor(MockModeratable::new(), MockMessageable::new());
        let result = executor
            .purge(
                &actor(Permissions::KICK_MEMBERS),
                CHANNEL,
                TRIGGER,
                &args(&["5"]),
            )
            .await;
        assert!(matches!(result, Err(CommandError::PermissionDenied(_))));
    }
}

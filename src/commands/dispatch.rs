//! Command dispatch
//!
//! Runs a routed command and returns the replies to post in the originating
//! channel. Failures are turned into exactly one notice here; nothing
//! propagates past a single invocation.

use std::sync::Arc;
use std::time::Instant;

use poise::serenity_prelude::{ChannelId, GuildId, UserId};

use super::router::{self, CommandKind, Invocation, Routed};
use crate::config::BotConfig;
use crate::logging;
use crate::moderation::platform::{ChannelDirectory, Messageable, Moderatable};
use crate::moderation::{
    Capability, CommandError, EscalationLadder, ModerationExecutor, PermissionGate, StrikeEngine,
};
use crate::store::{LogConfigStore, StrikeStore};

/// Something to post back after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Embed notice
    Notice(String),
    /// Plain text broadcast as the bot
    Say(String),
    /// Delete the message that triggered the command
    DeleteTrigger,
    /// Latency check; measured by the gateway layer
    Ping,
}

pub struct CommandDispatcher {
    prefix: char,
    gate: PermissionGate,
    log_gate: Capability,
    say_deletes_trigger: bool,
    executor: ModerationExecutor,
    strikes: StrikeEngine,
    log_config: Arc<LogConfigStore>,
    directory: Arc<dyn ChannelDirectory>,
}

impl CommandDispatcher {
    pub fn new(
        config: &BotConfig,
        strikes: Arc<StrikeStore>,
        log_config: Arc<LogConfigStore>,
        moderator: Arc<dyn Moderatable>,
        messages: Arc<dyn Messageable>,
        directory: Arc<dyn ChannelDirectory>,
    ) -> Self {
        let gate = PermissionGate::new(config.owner_id.filter(|id| *id != 0).map(UserId::new));
        Self {
            prefix: config.prefix,
            gate,
            log_gate: Capability::from(config.log_config_gate),
            say_deletes_trigger: config.say_deletes_trigger,
            executor: ModerationExecutor::new(
                gate,
                config.prefix,
                Arc::clone(&moderator),
                messages,
            ),
            strikes: StrikeEngine::new(
                gate,
                strikes,
                moderator,
                EscalationLadder::new(config.escalation.clone()),
            ),
            log_config,
            directory,
        }
    }

    /// Handle one inbound message. `None` means it was not a command and
    /// nothing should be posted.
    pub async fn dispatch(&self, invocation: &Invocation) -> Option<Vec<Reply>> {
        let routed = router::route(invocation, self.prefix)?;
        let started = Instant::now();
        logging::log_command_start(&routed, invocation);

        let replies = match self.run(&routed, invocation).await {
            Ok(replies) => replies,
            Err(error) => {
                logging::log_command_error(&routed, invocation, &error);
                vec![Reply::Notice(error.to_string())]
            }
        };

        logging::log_command_end(&routed, invocation, started.elapsed());
        Some(replies)
    }

    async fn run(
        &self,
        routed: &Routed,
        invocation: &Invocation,
    ) -> Result<Vec<Reply>, CommandError> {
        let guild_id = routed.guild_id;
        let actor = &invocation.actor;
        let target = invocation.target();
        let first_arg = routed.args.first().map(String::as_str);

        let notice = match routed.kind {
            CommandKind::Kick => self.executor.kick(guild_id, actor, target).await?,
            CommandKind::Ban => self.executor.ban(guild_id, actor, target).await?,
            CommandKind::Hackban => self.executor.hackban(guild_id, actor, first_arg).await?,
            CommandKind::Timeout => {
                let length = routed.args.get(1).map(String::as_str);
                self.executor.timeout(guild_id, actor, target, length).await?
            }
            CommandKind::Untimeout => self.executor.untimeout(guild_id, actor, target).await?,
            CommandKind::Purge => {
                self.executor
                    .purge(
                        actor,
                        invocation.channel_id,
                        invocation.message_id,
                        &routed.args,
                    )
                    .await?
            }
            CommandKind::Warn => {
                let outcome = self.strikes.warn(guild_id, actor, target).await?;
                return Ok(outcome.notices().into_iter().map(Reply::Notice).collect());
            }
            CommandKind::Say => return self.say(invocation, &routed.args),
            CommandKind::Ping => return Ok(vec![Reply::Ping]),
            CommandKind::Help => self.help(),
            CommandKind::SetLogChannel => {
                self.set_log_channel(guild_id, invocation, first_arg)
                    .await?
            }
            CommandKind::ClearLogChannel => self.clear_log_channel(guild_id, invocation).await?,
            CommandKind::ViewLogChannel => self.view_log_channel(guild_id, invocation).await?,
            CommandKind::EnableLogs => self.toggle_logs(guild_id, invocation, true).await?,
            CommandKind::DisableLogs => self.toggle_logs(guild_id, invocation, false).await?,
        };
        Ok(vec![Reply::Notice(notice)])
    }

    fn require(
        &self,
        invocation: &Invocation,
        capability: Capability,
        notice: &str,
    ) -> Result<(), CommandError> {
        if self.gate.authorize(&invocation.actor, capability) {
            Ok(())
        } else {
            Err(CommandError::denied(notice))
        }
    }

    fn say(&self, invocation: &Invocation, args: &[String]) -> Result<Vec<Reply>, CommandError> {
        self.require(
            invocation,
            Capability::Administrator,
            "You do not have permission to use this command.",
        )?;
        let text = args.join(" ");
        if text.is_empty() {
            return Err(CommandError::validation("Please provide a message for me to say."));
        }

        let mut replies = Vec::with_capacity(2);
        if self.say_deletes_trigger {
            replies.push(Reply::DeleteTrigger);
        }
        replies.push(Reply::Say(text));
        Ok(replies)
    }

    fn help(&self) -> String {
        let names: Vec<&str> = CommandKind::ALL.iter().map(|kind| kind.name()).collect();
        format!("Available commands:\n{}", names.join(", "))
    }

    async fn set_log_channel(
        &self,
        guild_id: GuildId,
        invocation: &Invocation,
        first_arg: Option<&str>,
    ) -> Result<String, CommandError> {
        self.require(
            invocation,
            self.log_gate,
            "You do not have permission to set the log channel.",
        )?;

        let candidate = invocation
            .mentioned_channels
            .first()
            .copied()
            .or_else(|| first_arg.and_then(|raw| raw.parse::<ChannelId>().ok()));
        let invalid =
            || CommandError::validation("Please mention a valid channel or provide its ID.");
        let channel_id = candidate.ok_or_else(invalid)?;
        if !self.directory.channel_exists(guild_id, channel_id).await {
            return Err(invalid());
        }

        self.log_config
            .set_channel(guild_id, channel_id)
            .await
            .map_err(|e| CommandError::persistence("I couldn't save the log channel.", e))?;
        Ok(format!("Log channel set to <#{channel_id}>."))
    }

    async fn clear_log_channel(
        &self,
        guild_id: GuildId,
        invocation: &Invocation,
    ) -> Result<String, CommandError> {
        self.require(
            invocation,
            self.log_gate,
            "You do not have permission to clear the log channel.",
        )?;
        let removed = self
            .log_config
            .clear(guild_id)
            .await
            .map_err(|e| CommandError::persistence("I couldn't clear the log channel.", e))?;
        Ok(if removed {
            "Log channel cleared.".to_string()
        } else {
            "No log channel has been set for this server.".to_string()
        })
    }

    async fn view_log_channel(
        &self,
        guild_id: GuildId,
        invocation: &Invocation,
    ) -> Result<String, CommandError> {
        self.require(
            invocation,
            self.log_gate,
            "You do not have permission to view the log channel.",
        )?;

        let Some(settings) = self.log_config.get(guild_id).await else {
            return Ok("No log channel has been set for this server.".to_string());
        };
        let Some(channel_id) = settings.channel else {
            return Ok("No log channel has been set for this server.".to_string());
        };
        if !self.directory.channel_exists(guild_id, channel_id).await {
            return Ok("The saved log channel no longer exists.".to_string());
        }

        let mut notice = format!("The current log channel is <#{channel_id}>.");
        if !settings.enabled {
            notice.push_str(" Logging is currently **disabled**.");
        }
        Ok(notice)
    }

    async fn toggle_logs(
        &self,
        guild_id: GuildId,
        invocation: &Invocation,
        enabled: bool,
    ) -> Result<String, CommandError> {
        let verb = if enabled { "enable" } else { "disable" };
        self.require(
            invocation,
            self.log_gate,
            &format!("You do not have permission to {verb} logs."),
        )?;
        self.log_config
            .set_enabled(guild_id, enabled)
            .await
            .map_err(|e| CommandError::persistence("I couldn't save the logging setting.", e))?;
        Ok(format!("Logging has been **{verb}d** for this server."))
    }
}

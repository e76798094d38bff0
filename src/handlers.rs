//! Gateway event handling
//!
//! Every event poise delivers lands in [`event_handler`]. Messages go to the
//! command dispatcher; membership and message lifecycle events go to the log
//! mirror. Nothing returned from here is fatal.

use std::time::{Duration, Instant};

use poise::serenity_prelude::{
    ActivityData, ChannelId, Context, EditMessage, FullEvent, Message,
};
use tracing::{info, warn};

use crate::commands::Reply;
use crate::discord::{self, build_embed};
use crate::logging;
use crate::moderation::platform::{EmbedNotice, OutboundMessage};
use crate::{CONSOLE_TARGET, Data, EVENT_TARGET, Error};

/// Presence shown once connected
pub const ACTIVITY: &str = "you sleep";

pub async fn event_handler(
    ctx: &Context,
    event: &FullEvent,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            let user_name = data_about_bot.user.name.clone();
            let shard_id = ctx.shard_id;
            info!(target: CONSOLE_TARGET, "Connected as {user_name}, shard {shard_id}");
            ctx.set_activity(Some(ActivityData::watching(ACTIVITY)));
        }
        FullEvent::CacheReady { guilds } => {
            let guild_count_cache = ctx.cache.guild_count();
            let guild_count = guilds.len();
            if guild_count != guild_count_cache {
                warn!(
                    target: EVENT_TARGET,
                    "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
                );
            }
            info!(target: CONSOLE_TARGET, "Cache ready! The bot is in {guild_count} guild(s)");
        }
        FullEvent::Message { new_message } => {
            handle_message(ctx, framework, data, new_message).await;
        }
        FullEvent::GuildMemberAddition { new_member } => {
            let snapshot = discord::member_snapshot(&ctx.cache, new_member);
            data.mirror.member_joined(new_member.guild_id, &snapshot).await;
        }
        FullEvent::GuildMemberRemoval {
            guild_id,
            user,
            member_data_if_available,
        } => {
            let snapshot = member_data_if_available.as_ref().map_or_else(
                || discord::user_snapshot(user),
                |member| discord::member_snapshot(&ctx.cache, member),
            );
            data.mirror.member_left(*guild_id, &snapshot).await;
        }
        FullEvent::GuildMemberUpdate {
            old_if_available,
            new,
            ..
        } => {
            // Without the cached prior state there is nothing to diff against
            let (Some(old), Some(new)) = (old_if_available, new) else {
                return Ok(());
            };
            let before = discord::member_snapshot(&ctx.cache, old);
            let after = discord::member_snapshot(&ctx.cache, new);
            data.mirror.member_updated(new.guild_id, &before, &after).await;
        }
        FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            guild_id,
        } => {
            let Some(guild_id) = guild_id else {
                return Ok(());
            };
            let snapshot = ctx
                .cache
                .message(*channel_id, *deleted_message_id)
                .map(|message| discord::message_snapshot(&message))
                .unwrap_or_else(|| discord::unknown_message(*channel_id, *deleted_message_id));
            data.mirror.message_deleted(*guild_id, &snapshot).await;
        }
        FullEvent::MessageUpdate {
            old_if_available,
            new,
            event,
        } => {
            let (Some(guild_id), Some(old)) = (event.guild_id, old_if_available) else {
                return Ok(());
            };
            let after = new
                .as_ref()
                .map(|message| message.content.clone())
                .or_else(|| event.content.clone());
            if let Some(after) = after {
                let before = discord::message_snapshot(old);
                data.mirror.message_edited(guild_id, &before, &after).await;
            }
        }
        _ => {}
    }
    Ok(())
}

/// What to post for a reply, if it is a plain message
#[must_use]
pub fn outbound_for(reply: &Reply) -> Option<OutboundMessage> {
    match reply {
        Reply::Notice(text) => Some(OutboundMessage::Embed(EmbedNotice::text(text.clone()))),
        Reply::Say(text) => Some(OutboundMessage::Text(text.clone())),
        Reply::DeleteTrigger | Reply::Ping => None,
    }
}

/// Text of the edited ping reply
#[must_use]
pub fn ping_report(bot: Duration, api: Option<Duration>) -> String {
    let api = api.map_or_else(|| "N/A".to_string(), |api| format!("{}ms", api.as_millis()));
    format!("Bot Latency: {}ms | API Latency: {api}", bot.as_millis())
}

async fn handle_message(
    ctx: &Context,
    framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
    message: &Message,
) {
    let invocation = discord::invocation_from_message(&ctx.cache, message);
    let Some(replies) = data.dispatcher.dispatch(&invocation).await else {
        return;
    };

    for reply in replies {
        let result = match &reply {
            Reply::DeleteTrigger => data
                .messages
                .delete_message(message.channel_id, message.id)
                .await
                .map_err(Error::from),
            Reply::Ping => ping(ctx, framework, message.channel_id).await,
            other => match outbound_for(other) {
                Some(outbound) => data
                    .messages
                    .send(message.channel_id, outbound)
                    .await
                    .map_err(Error::from),
                None => Ok(()),
            },
        };

        if let Err(e) = result {
            logging::log_event_failure("command_reply", &e);
        }
    }
}

async fn ping(
    ctx: &Context,
    framework: poise::FrameworkContext<'_, Data, Error>,
    channel_id: ChannelId,
) -> Result<(), Error> {
    let started = Instant::now();
    let mut sent = channel_id.say(ctx, "Pinging...").await?;
    let bot = started.elapsed();

    let api = {
        let shard_manager = framework.shard_manager();
        let runners = shard_manager.runners.lock().await;
        runners.get(&ctx.shard_id).and_then(|runner| runner.latency)
    };

    let report = EmbedNotice::text(ping_report(bot, api));
    sent.edit(ctx, EditMessage::new().embed(build_embed(&report)))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_report() {
        assert_eq!(
            ping_report(Duration::from_millis(120), Some(Duration::from_millis(45))),
            "Bot Latency: 120ms | API Latency: 45ms"
        );
        assert_eq!(
            ping_report(Duration::from_millis(7), None),
            "Bot Latency: 7ms | API Latency: N/A"
        );
    }

    #[test]
    fn test_outbound_for_replies() {
        assert_eq!(
            outbound_for(&Reply::Notice("Kicked troll".to_string())),
            Some(OutboundMessage::Embed(EmbedNotice::text("Kicked troll")))
        );
        assert_eq!(
            outbound_for(&Reply::Say("hello".to_string())),
            Some(OutboundMessage::Text("hello".to_string()))
        );
        assert_eq!(outbound_for(&Reply::Ping), None);
        assert_eq!(outbound_for(&Reply::DeleteTrigger), None);
    }
}

//! Command router

use poise::serenity_prelude::{ChannelId, GuildId, MessageId};
use serenity::utils::parse_channel_mention;

use crate::moderation::{Actor, TargetMember};

/// Every command the bot answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Kick,
    Ban,
    Hackban,
    Timeout,
    Untimeout,
    Say,
    Ping,
    Warn,
    Help,
    SetLogChannel,
    ClearLogChannel,
    ViewLogChannel,
    EnableLogs,
    DisableLogs,
    Purge,
}

impl CommandKind {
    /// All commands, in the order `help` lists them
    pub const ALL: [Self; 15] = [
        Self::Kick,
        Self::Ban,
        Self::Hackban,
        Self::Timeout,
        Self::Untimeout,
        Self::Say,
        Self::Ping,
        Self::Warn,
        Self::Purge,
        Self::Help,
        Self::SetLogChannel,
        Self::ClearLogChannel,
        Self::ViewLogChannel,
        Self::EnableLogs,
        Self::DisableLogs,
    ];

    /// Look a command up by its (already case-folded) name or alias
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "kick" => Self::Kick,
            "ban" => Self::Ban,
            "hackban" => Self::Hackban,
            "timeout" => Self::Timeout,
            "untimeout" => Self::Untimeout,
            "say" => Self::Say,
            "ping" => Self::Ping,
            "warn" => Self::Warn,
            "help" => Self::Help,
            "setlog" | "setlogchannel" => Self::SetLogChannel,
            "clearlog" | "clearlogchannel" | "clearlchannel" => Self::ClearLogChannel,
            "viewlogchannel" => Self::ViewLogChannel,
            "enablelogs" => Self::EnableLogs,
            "disablelogs" => Self::DisableLogs,
            "purge" => Self::Purge,
            _ => return None,
        })
    }

    /// Canonical name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::Hackban => "hackban",
            Self::Timeout => "timeout",
            Self::Untimeout => "untimeout",
            Self::Say => "say",
            Self::Ping => "ping",
            Self::Warn => "warn",
            Self::Help => "help",
            Self::SetLogChannel => "setlogchannel",
            Self::ClearLogChannel => "clearlog",
            Self::ViewLogChannel => "viewlogchannel",
            Self::EnableLogs => "enablelogs",
            Self::DisableLogs => "disablelogs",
            Self::Purge => "purge",
        }
    }
}

/// A prefixed line split into name and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Split `line` into a lowercase command name and whitespace-separated arguments.
///
/// Returns `None` when the line does not start with `prefix` or has nothing after it.
#[must_use]
pub fn parse(line: &str, prefix: char) -> Option<ParsedCommand> {
    let rest = line.strip_prefix(prefix)?;
    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?.to_lowercase();
    Some(ParsedCommand {
        name,
        args: tokens.map(ToString::to_string).collect(),
    })
}

/// Channel ids mentioned as `<#id>` in `content`, in order
#[must_use]
pub fn channel_mentions(content: &str) -> Vec<ChannelId> {
    content
        .split_whitespace()
        .filter_map(parse_channel_mention)
        .collect()
}

/// One inbound message, as the router sees it
#[derive(Debug, Clone)]
pub struct Invocation {
    /// `None` outside a server
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub actor: Actor,
    pub author_is_bot: bool,
    pub content: String,
    pub mentioned_members: Vec<TargetMember>,
    pub mentioned_channels: Vec<ChannelId>,
}

impl Invocation {
    /// First mentioned member, the target of member commands
    #[must_use]
    pub fn target(&self) -> Option<&TargetMember> {
        self.mentioned_members.first()
    }
}

/// A message that resolved to a known command in a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub guild_id: GuildId,
    pub kind: CommandKind,
    pub args: Vec<String>,
}

/// Decide whether `invocation` is a command. Bot authors, direct messages,
/// unprefixed lines and unknown names all yield `None`.
#[must_use]
pub fn route(invocation: &Invocation, prefix: char) -> Option<Routed> {
    if invocation.author_is_bot {
        return None;
    }
    let guild_id = invocation.guild_id?;
    let parsed = parse(&invocation.content, prefix)?;
    let kind = CommandKind::from_name(&parsed.name)?;
    Some(Routed {
        guild_id,
        kind,
        args: parsed.args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::{Permissions, UserId};

    fn invocation(content: &str) -> Invocation {
        Invocation {
            guild_id: Some(GuildId::new(111)),
            channel_id: ChannelId::new(333),
            message_id: MessageId::new(444),
            actor: Actor {
                id: UserId::new(1),
                tag: "mod".to_string(),
                permissions: Permissions::empty(),
                is_guild_owner: false,
            },
            author_is_bot: false,
            content: content.to_string(),
            mentioned_members: Vec::new(),
            mentioned_channels: Vec::new(),
        }
    }

    #[test]
    fn test_parse_splits_on_whitespace_runs() {
        let parsed = parse("!TimeOut   <@12>\t10m ", '!').expect("command");
        assert_eq!(parsed.name, "timeout");
        assert_eq!(parsed.args, vec!["<@12>".to_string(), "10m".to_string()]);
    }

    #[test]
    fn test_parse_requires_prefix() {
        assert_eq!(parse("ping", '!'), None);
        assert_eq!(parse(" !ping", '!'), None);
        assert_eq!(parse("!", '!'), None);
        assert_eq!(parse("!   ", '!'), None);
        assert!(parse("?ping", '?').is_some());
    }

    #[test]
    fn test_aliases() {
        assert_eq!(CommandKind::from_name("setlog"), Some(CommandKind::SetLogChannel));
        assert_eq!(CommandKind::from_name("setlogchannel"), Some(CommandKind::SetLogChannel));
        assert_eq!(CommandKind::from_name("clearlchannel"), Some(CommandKind::ClearLogChannel));
        assert_eq!(CommandKind::from_name("dance"), None);
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_route_ignores_bots_dms_and_unknown() {
        assert!(route(&invocation("!ping"), '!').is_some());

        let mut from_bot = invocation("!ping");
        from_bot.author_is_bot = true;
        assert!(route(&from_bot, '!').is_none());

        let mut in_dm = invocation("!ping");
        in_dm.guild_id = None;
        assert!(route(&in_dm, '!').is_none());

        assert!(route(&invocation("!dance now"), '!').is_none());
        assert!(route(&invocation("hello there"), '!').is_none());
    }

    #[test]
    fn test_route_keeps_args() {
        let routed = route(&invocation("!purge after 555"), '!').expect("routed");
        assert_eq!(routed.kind, CommandKind::Purge);
        assert_eq!(routed.args, vec!["after".to_string(), "555".to_string()]);
    }

    #[test]
    fn test_channel_mentions() {
        assert_eq!(
            channel_mentions("!setlog <#123> and <#456>"),
            vec![ChannelId::new(123), ChannelId::new(456)]
        );
        assert!(channel_mentions("!setlog <#abc> <@123>").is_empty());
        assert!(channel_mentions("!setlog <#0>").is_empty());
    }
}

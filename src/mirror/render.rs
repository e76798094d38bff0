//! Log mirror notices
//!
//! Pure functions from snapshots to embeds. Nothing here touches the
//! platform, so every shape is tested directly.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use poise::serenity_prelude::ChannelId;

use super::snapshot::{MemberSnapshot, MessageSnapshot};
use crate::config::RoleDiffMode;
use crate::moderation::platform::{EmbedNotice, RoleBearing};

/// Discord rejects embed field values longer than this
pub const FIELD_LIMIT: usize = 1024;

const NONE: &str = "None";

/// Cut `value` to at most `FIELD_LIMIT` characters, marking the cut
#[must_use]
pub fn truncate_field(value: &str) -> String {
    if value.chars().count() <= FIELD_LIMIT {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(FIELD_LIMIT - 1).collect();
    cut.push('…');
    cut
}

/// Whole days from `from` to `to`, never negative
#[must_use]
pub fn whole_days(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_days().max(0)
}

fn role_list(roles: &[String]) -> String {
    if roles.is_empty() {
        NONE.to_string()
    } else {
        roles.join(", ")
    }
}

fn field(name: &str, value: &str) -> (String, String) {
    let value = if value.is_empty() { NONE } else { value };
    (name.to_string(), truncate_field(value))
}

/// Whether the member's roles changed under `mode`.
///
/// `Count` compares only how many roles are held, so swapping one role for
/// another goes unnoticed. `Membership` compares the sets.
pub fn roles_changed(old: &impl RoleBearing, new: &impl RoleBearing, mode: RoleDiffMode) -> bool {
    let (old, new) = (old.role_names(), new.role_names());
    match mode {
        RoleDiffMode::Count => old.len() != new.len(),
        RoleDiffMode::Membership => {
            old.iter().collect::<BTreeSet<_>>() != new.iter().collect::<BTreeSet<_>>()
        }
    }
}

#[must_use]
pub fn member_joined(member: &MemberSnapshot, now: DateTime<Utc>) -> EmbedNotice {
    let age = whole_days(member.account_created, now);
    EmbedNotice {
        title: Some("Member Joined".to_string()),
        description: format!("**{}** (Account age: {age} days)", member.tag),
        fields: Vec::new(),
    }
}

#[must_use]
pub fn member_left(member: &MemberSnapshot, now: DateTime<Utc>) -> EmbedNotice {
    let stayed = member.joined_at.map_or_else(
        || "Unknown".to_string(),
        |joined| format!("{} days", whole_days(joined, now)),
    );
    EmbedNotice {
        title: Some("Member Left".to_string()),
        description: format!("**{}**", member.tag),
        fields: vec![
            field("Roles", &role_list(&member.roles)),
            field("Time in server", &stayed),
        ],
    }
}

#[must_use]
pub fn nickname_changed(old: &MemberSnapshot, new: &MemberSnapshot) -> EmbedNotice {
    EmbedNotice {
        title: Some("Nickname changed".to_string()),
        description: format!("**{}**", new.tag),
        fields: vec![
            field("Before", old.nickname.as_deref().unwrap_or(NONE)),
            field("After", new.nickname.as_deref().unwrap_or(NONE)),
        ],
    }
}

#[must_use]
pub fn roles_updated(old: &MemberSnapshot, new: &MemberSnapshot) -> EmbedNotice {
    EmbedNotice {
        title: Some("Roles updated".to_string()),
        description: format!("**{}**", new.tag),
        fields: vec![
            field("Before", &role_list(&old.roles)),
            field("After", &role_list(&new.roles)),
        ],
    }
}

fn author(message: &MessageSnapshot) -> &str {
    message.author_tag.as_deref().unwrap_or("Unknown")
}

#[must_use]
pub fn message_deleted(message: &MessageSnapshot) -> EmbedNotice {
    let content = message
        .content
        .as_deref()
        .filter(|content| !content.is_empty())
        .unwrap_or("No content");
    EmbedNotice {
        title: Some("Message deleted".to_string()),
        description: format!(
            "Message deleted in <#{}>\n\nBy **{}**",
            message.channel_id,
            author(message)
        ),
        fields: vec![field("Content", content)],
    }
}

#[must_use]
pub fn message_edited(before: &MessageSnapshot, after: &str, channel_id: ChannelId) -> EmbedNotice {
    EmbedNotice {
        title: Some("Message edited".to_string()),
        description: format!("Message edited in <#{channel_id}>\n\nBy **{}**", author(before)),
        fields: vec![
            field("Before", before.content.as_deref().unwrap_or_default()),
            field("After", after),
        ],
    }
}

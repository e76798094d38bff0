//! Platform-neutral views of members and messages

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, MessageId, UserId};

use crate::moderation::platform::RoleBearing;

/// A server member at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub user_id: UserId,
    pub tag: String,
    pub nickname: Option<String>,
    /// Role names in the server's display order, `@everyone` excluded
    pub roles: Vec<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub account_created: DateTime<Utc>,
}

impl RoleBearing for MemberSnapshot {
    fn role_names(&self) -> Vec<String> {
        self.roles.clone()
    }
}

/// A message as last seen. Author and content are unknown when the message
/// was never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSnapshot {
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub author_tag: Option<String>,
    pub author_is_bot: bool,
    pub content: Option<String>,
}

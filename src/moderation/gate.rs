//! Permission gate

use poise::serenity_prelude::{Permissions, UserId};

use crate::config::LogConfigGate;

/// What an actor must hold for a command to proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    KickMembers,
    BanMembers,
    ModerateMembers,
    ManageMessages,
    Administrator,
    ServerOwner,
}

impl Capability {
    /// The Discord permission bit backing this capability, if any
    #[must_use]
    pub fn permission(self) -> Option<Permissions> {
        match self {
            Self::KickMembers => Some(Permissions::KICK_MEMBERS),
            Self::BanMembers => Some(Permissions::BAN_MEMBERS),
            Self::ModerateMembers => Some(Permissions::MODERATE_MEMBERS),
            Self::ManageMessages => Some(Permissions::MANAGE_MESSAGES),
            Self::Administrator => Some(Permissions::ADMINISTRATOR),
            Self::ServerOwner => None,
        }
    }
}

impl From<LogConfigGate> for Capability {
    fn from(gate: LogConfigGate) -> Self {
        match gate {
            LogConfigGate::Administrator => Self::Administrator,
            LogConfigGate::ServerOwner => Self::ServerOwner,
        }
    }
}

/// The member who invoked a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub tag: String,
    pub permissions: Permissions,
    pub is_guild_owner: bool,
}

/// Decides whether an actor holds a capability. Denial is a plain `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionGate {
    /// When set, only this user passes the `ServerOwner` check
    owner_id: Option<UserId>,
}

impl PermissionGate {
    #[must_use]
    pub fn new(owner_id: Option<UserId>) -> Self {
        Self { owner_id }
    }

    #[must_use]
    pub fn authorize(&self, actor: &Actor, required: Capability) -> bool {
        match required.permission() {
            // The server owner implicitly holds every permission
            Some(permission) => {
                actor.is_guild_owner
                    || actor.permissions.administrator()
                    || actor.permissions.contains(permission)
            }
            None => match self.owner_id {
                Some(owner_id) => actor.id == owner_id,
                None => actor.is_guild_owner,
            },
        }
    }
}

//! Moderation core
//!
//! Permission gating, the moderation action executor, and the strike engine
//! with its escalation ladder. Everything here talks to Discord only through
//! the capability traits in [`platform`].

pub mod duration;
mod error;
mod executor;
mod gate;
pub mod platform;
mod strikes;

pub use error::CommandError;
pub use executor::{ModerationExecutor, PurgeRequest, TargetMember};
pub use gate::{Actor, Capability, PermissionGate};
pub use strikes::{Escalated, EscalationLadder, StrikeEngine, WarnOutcome};

//! Strike engine
//!
//! Each `warn` adds one strike, persists it, and then looks the new count up
//! in the escalation ladder. Only an exact match fires, and at most one step
//! fires per warn. A failed escalation is logged and dropped; the strike
//! itself stands.

use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude::GuildId;
use tracing::{info, warn};

use super::duration::humanize;
use super::platform::Moderatable;
use super::{Actor, Capability, CommandError, PermissionGate, TargetMember};
use crate::config::{EscalationAction, EscalationStep};
use crate::store::StrikeStore;
use crate::{COMMAND_TARGET, ERROR_TARGET};

/// Thresholds in ascending order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationLadder {
    steps: Vec<EscalationStep>,
}

impl EscalationLadder {
    #[must_use]
    pub fn new(mut steps: Vec<EscalationStep>) -> Self {
        steps.sort_by_key(|step| step.at);
        Self { steps }
    }

    /// The step whose threshold equals `count`, if any
    #[must_use]
    pub fn step_for(&self, count: u64) -> Option<&EscalationStep> {
        self.steps.iter().find(|step| step.at == count)
    }

    #[must_use]
    pub fn steps(&self) -> &[EscalationStep] {
        &self.steps
    }
}

/// An escalation that was actually applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalated {
    Muted { duration: Duration, threshold: u64 },
    Banned { threshold: u64 },
}

/// Result of a successful warn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarnOutcome {
    pub target: TargetMember,
    pub count: u64,
    pub escalation: Option<Escalated>,
}

impl WarnOutcome {
    /// Notices to show, the warn confirmation first
    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        let tag = &self.target.tag;
        let mut notices = vec![format!("{tag} has been warned. Total warns: {}", self.count)];
        match self.escalation {
            Some(Escalated::Muted { duration, threshold }) => notices.push(format!(
                "{tag} has been muted for {} due to {threshold} warnings.",
                humanize(duration)
            )),
            Some(Escalated::Banned { threshold }) => {
                notices.push(format!("{tag} has been banned due to {threshold} warnings."));
            }
            None => {}
        }
        notices
    }
}

pub struct StrikeEngine {
    gate: PermissionGate,
    store: Arc<StrikeStore>,
    moderator: Arc<dyn Moderatable>,
    ladder: EscalationLadder,
}

impl StrikeEngine {
    pub fn new(
        gate: PermissionGate,
        store: Arc<StrikeStore>,
        moderator: Arc<dyn Moderatable>,
        ladder: EscalationLadder,
    ) -> Self {
        Self {
            gate,
            store,
            moderator,
            ladder,
        }
    }

    /// Record a strike against `target` and apply any escalation it triggers
    ///
    /// # Errors
    ///
    /// Denied, missing target, or the new count could not be persisted. A
    /// rejected escalation is not an error.
    pub async fn warn(
        &self,
        guild_id: GuildId,
        actor: &Actor,
        target: Option<&TargetMember>,
    ) -> Result<WarnOutcome, CommandError> {
        if !self.gate.authorize(actor, Capability::ModerateMembers) {
            return Err(CommandError::denied("You do not have permission to warn members."));
        }
        let target =
            target.ok_or_else(|| CommandError::validation("Please mention a user to warn."))?;

        let count = self
            .store
            .increment(guild_id, target.id)
            .await
            .map_err(|e| CommandError::persistence("I couldn't record that warning.", e))?;

        info!(
            target: COMMAND_TARGET,
            guild_id = %guild_id,
            user_id = %target.id,
            moderator_id = %actor.id,
            count = count,
            action = "warn",
            "Strike recorded"
        );

        let escalation = match self.ladder.step_for(count) {
            Some(step) => self.escalate(guild_id, target, step).await,
            None => None,
        };

        Ok(WarnOutcome {
            target: target.clone(),
            count,
            escalation,
        })
    }

    async fn escalate(
        &self,
        guild_id: GuildId,
        target: &TargetMember,
        step: &EscalationStep,
    ) -> Option<Escalated> {
        let reason = format!("Reached {} warns", step.at);
        let (result, escalated) = match &step.action {
            EscalationAction::Mute { .. } => {
                let duration = step.action.mute_duration().unwrap_or_default();
                (
                    self.moderator
                        .timeout(guild_id, target.id, Some(duration), reason)
                        .await,
                    Escalated::Muted {
                        duration,
                        threshold: step.at,
                    },
                )
            }
            EscalationAction::Ban => (
                self.moderator.ban(guild_id, target.id, Some(reason)).await,
                Escalated::Banned { threshold: step.at },
            ),
        };

        match result {
            Ok(()) => {
                info!(
                    target: COMMAND_TARGET,
                    guild_id = %guild_id,
                    user_id = %target.id,
                    threshold = step.at,
                    escalation = ?escalated,
                    "Escalation applied"
                );
                Some(escalated)
            }
            Err(e) => {
                warn!(
                    target: ERROR_TARGET,
                    guild_id = %guild_id,
                    user_id = %target.id,
                    threshold = step.at,
                    error = %e,
                    "Escalation failed, strike kept"
                );
                None
            }
        }
    }
}

//! Reward ledger: moderation of created rewards.
//!
//! Every action is checked against the transition table on
//! [`RewardStatus::apply`] and written with an optimistic version check, so
//! two moderators acting on the same reward cannot both succeed.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::audit::{with_details, AuditRecorder};
use super::calculator::ceil2;
use crate::auth::Actor;
use crate::clock::Clock;
use crate::error::{EngineError, FieldErrors, Result};
use crate::interfaces::{CampaignStore, EngineStore, RewardQuery, RewardStore, StorageError};
use crate::model::{
    actions, AuditLogEntry, InviterBalance, ModerationAction, Page, PageRequest, Reward,
    RewardStatus, TargetType,
};
use crate::validation::{validate_non_negative, validate_reason};

#[derive(Clone)]
pub struct RewardLedger {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
}

impl RewardLedger {
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            store,
            clock,
            audit,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<Reward> {
        self.store
            .get_reward(id)
            .await?
            .ok_or_else(|| EngineError::not_found("reward", id))
    }

    pub async fn approve(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Reward> {
        self.moderate(actor, id, ModerationAction::Approve, actions::REWARD_APPROVE, reason)
            .await
    }

    pub async fn reject(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Reward> {
        self.moderate(actor, id, ModerationAction::Reject, actions::REWARD_REJECT, reason)
            .await
    }

    pub async fn reverse(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Reward> {
        self.moderate(actor, id, ModerationAction::Reverse, actions::REWARD_REVERSE, reason)
            .await
    }

    async fn moderate(
        &self,
        actor: &Actor,
        id: Uuid,
        action: ModerationAction,
        audit_action: &str,
        reason: &str,
    ) -> Result<Reward> {
        validate_reason(reason)?;
        let current = self.get(id).await?;
        let next = transition(&current, action)?;

        let updated = current.moderated(next, &actor.id, reason, self.clock.now());
        let entry = with_details(
            self.audit
                .entry(audit_action, TargetType::Reward, id, actor, reason),
            json!({ "from": current.status, "to": next }),
        );
        self.save(&updated, current.version, &entry, action).await?;

        info!(
            campaign_id = %updated.campaign_id,
            reward_id = %id,
            actor = %actor.id,
            action = %action,
            status = %next,
            "Reward moderated"
        );
        Ok(updated)
    }

    /// Supersede a REJECTED or REVERSED reward with a fresh one.
    ///
    /// The original moves to REISSUED. The replacement keeps the original's
    /// points and transaction reference, and starts PENDING or APPROVED per
    /// the campaign's policy. Returns the replacement.
    pub async fn reissue(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Reward> {
        validate_reason(reason)?;
        let current = self.get(id).await?;
        let next = transition(&current, ModerationAction::Reissue)?;
        let campaign = self
            .store
            .get_campaign(current.campaign_id)
            .await?
            .ok_or_else(|| EngineError::not_found("campaign", current.campaign_id))?;

        let now = self.clock.now();
        let superseded = current.moderated(next, &actor.id, reason, now);
        let replacement = Reward {
            id: Uuid::new_v4(),
            status: if campaign.mark_suspicious_as_pending {
                RewardStatus::Pending
            } else {
                RewardStatus::Approved
            },
            flagged: false,
            created_at: now,
            moderated_at: None,
            moderated_by: None,
            reason: None,
            reissued_from: Some(current.id),
            version: 1,
            ..current.clone()
        };

        let entry = with_details(
            self.audit
                .entry(actions::REWARD_REISSUE, TargetType::Reward, id, actor, reason),
            json!({
                "from": current.status,
                "replacementId": replacement.id,
                "replacementStatus": replacement.status,
            }),
        );
        self.store
            .reissue_reward(&superseded, current.version, &replacement, &entry)
            .await
            .map_err(|e| lost_race(e, id, ModerationAction::Reissue))?;

        info!(
            campaign_id = %current.campaign_id,
            reward_id = %id,
            replacement_id = %replacement.id,
            actor = %actor.id,
            "Reward reissued"
        );
        Ok(replacement)
    }

    /// Overwrite a reward's points, keeping its status.
    pub async fn recompute(
        &self,
        actor: &Actor,
        id: Uuid,
        points: Decimal,
        reason: &str,
    ) -> Result<Reward> {
        validate_reason(reason)?;
        let mut errors = FieldErrors::new();
        validate_non_negative("points", points, &mut errors);
        errors.into_result()?;

        let current = self.get(id).await?;
        let status = transition(&current, ModerationAction::Recompute)?;
        let new_points = ceil2(points);
        let updated = Reward {
            points: new_points,
            ..current.moderated(status, &actor.id, reason, self.clock.now())
        };

        let entry = with_details(
            self.audit
                .entry(actions::REWARD_RECOMPUTE, TargetType::Reward, id, actor, reason),
            json!({ "previousPoints": current.points, "newPoints": new_points }),
        );
        self.save(&updated, current.version, &entry, ModerationAction::Recompute)
            .await?;

        info!(
            campaign_id = %updated.campaign_id,
            reward_id = %id,
            actor = %actor.id,
            previous_points = %current.points,
            new_points = %new_points,
            "Reward recomputed"
        );
        Ok(updated)
    }

    /// PENDING rewards, plus flagged rewards not yet moderated when
    /// `include_flagged` is set. Oldest first.
    pub async fn review_queue(
        &self,
        include_flagged: bool,
        page: PageRequest,
    ) -> Result<Page<Reward>> {
        let query = RewardQuery::review_queue(include_flagged);
        Ok(self.store.list_rewards(&query, page).await?)
    }

    pub async fn list(&self, query: &RewardQuery, page: PageRequest) -> Result<Page<Reward>> {
        Ok(self.store.list_rewards(query, page).await?)
    }

    /// Pending and available points for one inviter across all campaigns.
    pub async fn balance(&self, inviter_account_id: &str) -> Result<InviterBalance> {
        let rewards = self
            .store
            .find_rewards(&RewardQuery::for_inviter(inviter_account_id))
            .await?;
        Ok(InviterBalance::from_rewards(&rewards))
    }

    async fn save(
        &self,
        reward: &Reward,
        expected_version: u32,
        entry: &AuditLogEntry,
        action: ModerationAction,
    ) -> Result<()> {
        self.store
            .update_reward(reward, expected_version, entry)
            .await
            .map_err(|e| lost_race(e, reward.id, action))
    }
}

fn transition(reward: &Reward, action: ModerationAction) -> Result<RewardStatus> {
    reward
        .status
        .apply(action)
        .ok_or_else(|| EngineError::invalid_transition("reward", reward.status, action))
}

/// A version conflict means another moderator got there first.
fn lost_race(error: StorageError, id: Uuid, action: ModerationAction) -> EngineError {
    match error {
        StorageError::VersionConflict { .. } => {
            warn!(reward_id = %id, action = %action, "Lost moderation race");
            EngineError::Conflict(format!("reward {} was moderated concurrently", id))
        }
        other => other.into(),
    }
}

//! Reward creation for qualifying transactions.
//!
//! Flow per event: find the invitee's referral, answer redeliveries with
//! the reward already on file, confirm the campaign is live, resolve the
//! inviter's rule, compute points, then hand the reward to the eligibility
//! tracker which rechecks idempotency, checks the cap and inserts it
//! together with its audit entry.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::audit::{with_details, AuditRecorder};
use super::calculator;
use super::eligibility::EligibilityTracker;
use super::resolver;
use crate::auth::Actor;
use crate::clock::Clock;
use crate::error::{EngineError, FieldErrors, Result};
use crate::interfaces::{
    CampaignStore, EngineStore, ReferralStore, RewardCreation, RewardInsert, RewardStore,
};
use crate::model::{
    actions, Campaign, NoRewardReason, QualifyingTransaction, Reward, RewardOutcome, RewardStatus,
    TargetType,
};
use crate::validation::{validate_non_negative, validate_reference};

#[derive(Clone)]
pub struct RewardIssuer {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
    eligibility: EligibilityTracker,
}

impl RewardIssuer {
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            audit: AuditRecorder::new(Arc::clone(&store), Arc::clone(&clock)),
            eligibility: EligibilityTracker::new(Arc::clone(&store)),
            store,
            clock,
        }
    }

    /// Process one qualifying transaction.
    ///
    /// Redelivery of an already rewarded transaction returns the existing
    /// reward as `Duplicate`. "No reward" is a normal outcome, not an error.
    pub async fn process_transaction(
        &self,
        actor: &Actor,
        tx: &QualifyingTransaction,
    ) -> Result<RewardOutcome> {
        validate_transaction(tx)?;

        let Some(referral) = self
            .store
            .find_referral_by_invitee(&tx.invitee_account_id)
            .await?
        else {
            return Ok(no_reward(tx, NoRewardReason::NotReferred));
        };

        // Redelivery keeps its first outcome even if the campaign or rule changed since.
        if let Some(existing) = self
            .store
            .find_reward_by_reference(
                referral.campaign_id,
                &referral.inviter_account_id,
                &tx.invitee_account_id,
                &tx.transaction_reference,
            )
            .await?
        {
            return Ok(duplicate(tx, existing));
        }

        let campaign = self
            .store
            .get_campaign(referral.campaign_id)
            .await?
            .ok_or_else(|| EngineError::not_found("campaign", referral.campaign_id))?;
        let now = self.clock.now();
        if !self.eligibility.is_eligible(&campaign, now) {
            return Ok(no_reward(tx, NoRewardReason::CampaignNotLive));
        }

        let resolved = resolver::resolve(&campaign, &referral.inviter_account_id);
        let fallback = fallback_base_points(&campaign);
        let Some(points) = calculator::compute(tx, &resolved.rule, fallback) else {
            return Ok(no_reward(tx, NoRewardReason::NonPositiveRevenue));
        };

        let status = if campaign.mark_suspicious_as_pending {
            RewardStatus::Pending
        } else {
            RewardStatus::Approved
        };
        let reward = Reward {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            inviter_account_id: referral.inviter_account_id.clone(),
            invitee_account_id: tx.invitee_account_id.clone(),
            transaction_reference: tx.transaction_reference.clone(),
            points,
            status,
            flagged: tx.suspicious || resolved.conflict,
            created_at: now,
            moderated_at: None,
            moderated_by: None,
            reason: None,
            reissued_from: None,
            version: 1,
        };

        let audit = with_details(
            self.audit
                .entry(actions::REWARD_CREATE, TargetType::Reward, reward.id, actor, ""),
            json!({
                "transactionReference": reward.transaction_reference,
                "points": reward.points,
                "status": reward.status,
                "ruleSource": resolved.source,
            }),
        );
        let creation = RewardCreation {
            reward,
            max_transactions: resolved.rule.cap(),
            referral_id: referral.id,
            audit,
        };

        match self.eligibility.check_and_reserve(&creation).await? {
            RewardInsert::Inserted(reward) => {
                info!(
                    campaign_id = %reward.campaign_id,
                    reward_id = %reward.id,
                    actor = %actor.id,
                    points = %reward.points,
                    status = %reward.status,
                    "Reward created"
                );
                Ok(RewardOutcome::Created(reward))
            }
            RewardInsert::Duplicate(existing) => Ok(duplicate(tx, existing)),
            RewardInsert::CapReached { used } => {
                debug!(
                    campaign_id = %campaign.id,
                    used,
                    cap = resolved.rule.cap(),
                    "Reward cap reached"
                );
                Ok(no_reward(tx, NoRewardReason::CapReached))
            }
        }
    }
}

fn validate_transaction(tx: &QualifyingTransaction) -> std::result::Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    validate_reference("transactionReference", &tx.transaction_reference, &mut errors);
    validate_reference("inviteeAccountId", &tx.invitee_account_id, &mut errors);
    validate_non_negative("internalFee", tx.internal_fee, &mut errors);
    validate_non_negative("commission", tx.commission, &mut errors);
    validate_non_negative("otherFees", tx.other_fees, &mut errors);
    errors.into_result()
}

fn no_reward(tx: &QualifyingTransaction, reason: NoRewardReason) -> RewardOutcome {
    debug!(
        transaction_reference = %tx.transaction_reference,
        invitee = %tx.invitee_account_id,
        reason = ?reason,
        "No reward for transaction"
    );
    RewardOutcome::NoReward(reason)
}

fn duplicate(tx: &QualifyingTransaction, existing: Reward) -> RewardOutcome {
    debug!(
        reward_id = %existing.id,
        transaction_reference = %tx.transaction_reference,
        "Transaction already rewarded"
    );
    RewardOutcome::Duplicate(existing)
}

/// Base points for FIXED rules that set none: the campaign default rule's
/// base, else the campaign's own `baseRewardPoints`.
fn fallback_base_points(campaign: &Campaign) -> Option<i64> {
    campaign
        .eligibility_rules
        .defaults
        .base_reward_points
        .or(Some(i64::from(campaign.base_reward_points)))
}

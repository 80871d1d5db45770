//! Reward ledger storage interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Result;
use crate::model::{AuditLogEntry, Page, PageRequest, Reward, RewardStatus};

/// A reward to insert, guarded by idempotency and the per-pair cap.
#[derive(Debug, Clone)]
pub struct RewardCreation {
    pub reward: Reward,
    /// Rewarded transactions allowed for the reward's campaign/inviter/invitee triple.
    pub max_transactions: u32,
    /// Referral to mark qualified if it is not already.
    pub referral_id: Uuid,
    pub audit: AuditLogEntry,
}

/// Result of an atomic reward insertion.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardInsert {
    Inserted(Reward),
    /// Transaction reference already rewarded for this triple; latest record returned.
    Duplicate(Reward),
    /// The triple already holds `used` capped rewards.
    CapReached { used: u32 },
}

/// Filter for reward listings. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewardQuery {
    pub campaign_id: Option<Uuid>,
    pub inviter_account_id: Option<String>,
    pub invitee_account_id: Option<String>,
    pub statuses: Vec<RewardStatus>,
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub created_to: Option<DateTime<Utc>>,
    /// `Some(include_flagged)` restricts to the moderation review queue.
    pub review_queue: Option<bool>,
}

impl RewardQuery {
    pub fn review_queue(include_flagged: bool) -> Self {
        Self {
            review_queue: Some(include_flagged),
            ..Self::default()
        }
    }

    pub fn for_inviter(inviter_account_id: impl Into<String>) -> Self {
        Self {
            inviter_account_id: Some(inviter_account_id.into()),
            ..Self::default()
        }
    }

    pub fn created_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            created_from: Some(from),
            created_to: Some(to),
            ..Self::default()
        }
    }

    pub fn matches(&self, reward: &Reward) -> bool {
        if let Some(id) = self.campaign_id {
            if reward.campaign_id != id {
                return false;
            }
        }
        if let Some(inviter) = self.inviter_account_id.as_deref() {
            if reward.inviter_account_id != inviter {
                return false;
            }
        }
        if let Some(invitee) = self.invitee_account_id.as_deref() {
            if reward.invitee_account_id != invitee {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&reward.status) {
            return false;
        }
        if self.created_from.is_some_and(|from| reward.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| reward.created_at >= to) {
            return false;
        }
        match self.review_queue {
            Some(include_flagged) => {
                reward.status == RewardStatus::Pending
                    || (include_flagged && reward.flagged && reward.moderated_at.is_none())
            }
            None => true,
        }
    }
}

/// Interface for reward ledger persistence.
#[async_trait]
pub trait RewardStore: Send + Sync {
    /// Insert a reward atomically with its idempotency check, cap check,
    /// referral qualification and audit entry.
    ///
    /// Concurrent calls for the same triple never exceed the cap, and a
    /// repeated transaction reference never produces a second row.
    async fn create_reward(&self, creation: &RewardCreation) -> Result<RewardInsert>;

    async fn get_reward(&self, id: Uuid) -> Result<Option<Reward>>;

    /// Latest reward for a transaction reference within one
    /// campaign/inviter/invitee triple. After a reissue this is the replacement.
    async fn find_reward_by_reference(
        &self,
        campaign_id: Uuid,
        inviter_account_id: &str,
        invitee_account_id: &str,
        transaction_reference: &str,
    ) -> Result<Option<Reward>>;

    /// Replace a reward whose stored version is `expected_version`.
    async fn update_reward(
        &self,
        reward: &Reward,
        expected_version: u32,
        audit: &AuditLogEntry,
    ) -> Result<()>;

    /// Supersede `original` (stored at `expected_version`) and insert `replacement`.
    async fn reissue_reward(
        &self,
        original: &Reward,
        expected_version: u32,
        replacement: &Reward,
        audit: &AuditLogEntry,
    ) -> Result<()>;

    /// Rewards oldest first.
    async fn list_rewards(&self, query: &RewardQuery, page: PageRequest) -> Result<Page<Reward>>;

    /// Every reward matching `query`, oldest first.
    async fn find_rewards(&self, query: &RewardQuery) -> Result<Vec<Reward>>;

    /// Rewards counting toward the cap for one campaign/inviter/invitee triple.
    async fn count_capped_rewards(
        &self,
        campaign_id: Uuid,
        inviter_account_id: &str,
        invitee_account_id: &str,
    ) -> Result<u32>;
}

//! Reward records and the moderation state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Moderation status of a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardStatus {
    Pending,
    Approved,
    Rejected,
    Reversed,
    Reissued,
}

impl RewardStatus {
    pub const ALL: [RewardStatus; 5] = [
        RewardStatus::Pending,
        RewardStatus::Approved,
        RewardStatus::Rejected,
        RewardStatus::Reversed,
        RewardStatus::Reissued,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RewardStatus::Pending => "PENDING",
            RewardStatus::Approved => "APPROVED",
            RewardStatus::Rejected => "REJECTED",
            RewardStatus::Reversed => "REVERSED",
            RewardStatus::Reissued => "REISSUED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Whether a reward in this status occupies a slot of the per-pair cap.
    ///
    /// Rejected rewards never paid out, and a reissued reward's slot is
    /// carried by its replacement.
    pub fn counts_toward_cap(&self) -> bool {
        !matches!(self, RewardStatus::Rejected | RewardStatus::Reissued)
    }

    /// Next status for `action`, looked up in [`TRANSITIONS`].
    pub fn apply(self, action: ModerationAction) -> Option<RewardStatus> {
        TRANSITIONS
            .iter()
            .find(|(from, a, _)| *from == self && *a == action)
            .map(|(_, _, to)| *to)
    }
}

impl fmt::Display for RewardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin moderation action on a reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
    Reverse,
    Reissue,
    Recompute,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Reverse => "reverse",
            ModerationAction::Reissue => "reissue",
            ModerationAction::Recompute => "recompute",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (current status, action) -> next status. Anything absent is illegal.
pub const TRANSITIONS: &[(RewardStatus, ModerationAction, RewardStatus)] = {
    use ModerationAction::*;
    use RewardStatus::*;
    &[
        (Pending, Approve, Approved),
        (Pending, Reject, Rejected),
        (Approved, Reverse, Reversed),
        (Rejected, Reissue, Reissued),
        (Reversed, Reissue, Reissued),
        // Recompute rewrites points and keeps the status.
        (Pending, Recompute, Pending),
        (Approved, Recompute, Approved),
        (Rejected, Recompute, Rejected),
        (Reversed, Recompute, Reversed),
        (Reissued, Recompute, Reissued),
    ]
};

/// One computed payout tied to a qualifying transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub inviter_account_id: String,
    pub invitee_account_id: String,
    pub transaction_reference: String,
    pub points: Decimal,
    pub status: RewardStatus,
    /// Needs a moderator's eye: suspicious source event or conflicting rule storage.
    pub flagged: bool,
    pub created_at: DateTime<Utc>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub moderated_by: Option<String>,
    pub reason: Option<String>,
    /// Set on replacements created by `reissue`.
    pub reissued_from: Option<Uuid>,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: u32,
}

impl Reward {
    /// Apply a moderation step, returning the updated record.
    ///
    /// Callers validate the transition first; this only stamps the fields.
    pub fn moderated(
        &self,
        status: RewardStatus,
        actor: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Reward {
        Reward {
            status,
            moderated_at: Some(at),
            moderated_by: Some(actor.to_string()),
            reason: Some(reason.to_string()),
            version: self.version + 1,
            ..self.clone()
        }
    }
}

/// A transaction by an invitee that may earn their inviter a reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifyingTransaction {
    /// Idempotency key supplied by the transaction pipeline.
    pub transaction_reference: String,
    pub invitee_account_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub internal_fee: Decimal,
    #[serde(default)]
    pub commission: Decimal,
    #[serde(default)]
    pub other_fees: Decimal,
    /// Net amount after settlement; falls back to `amount`.
    #[serde(default)]
    pub settlement_net: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
    /// Raised upstream by fraud screening.
    #[serde(default)]
    pub suspicious: bool,
}

/// Why a qualifying transaction produced no reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoRewardReason {
    /// The invitee has no referral record.
    NotReferred,
    /// The campaign is not ACTIVE or outside its window.
    CampaignNotLive,
    /// The inviter/invitee pair already used every rewarded slot.
    CapReached,
    /// The transaction generated no revenue for a percentage rule.
    NonPositiveRevenue,
}

/// Result of processing a qualifying transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardOutcome {
    Created(Reward),
    /// Same transaction reference was already rewarded; nothing new written.
    Duplicate(Reward),
    NoReward(NoRewardReason),
}

impl RewardOutcome {
    pub fn reward(&self) -> Option<&Reward> {
        match self {
            RewardOutcome::Created(r) | RewardOutcome::Duplicate(r) => Some(r),
            RewardOutcome::NoReward(_) => None,
        }
    }
}

/// Derived balance of an inviter across all campaigns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviterBalance {
    pub pending: Decimal,
    pub available: Decimal,
}

impl InviterBalance {
    pub fn from_rewards<'a>(rewards: impl IntoIterator<Item = &'a Reward>) -> Self {
        rewards
            .into_iter()
            .fold(InviterBalance::default(), |mut acc, reward| {
                match reward.status {
                    RewardStatus::Pending => acc.pending += reward.points,
                    RewardStatus::Approved => acc.available += reward.points,
                    _ => {}
                }
                acc
            })
    }
}

//! Append-only audit trail entries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit action names. Grouped by dotted prefix so listings can filter on
/// `campaign.`, `reward.` and so on.
pub mod actions {
    pub const CAMPAIGN_CREATE: &str = "campaign.create";
    pub const CAMPAIGN_UPDATE: &str = "campaign.update";
    pub const CAMPAIGN_ACTIVATE: &str = "campaign.activate";
    pub const CAMPAIGN_PAUSE: &str = "campaign.pause";
    pub const CAMPAIGN_ARCHIVE: &str = "campaign.archive";

    pub const INVITER_RULE_UPSERT: &str = "inviter_rule.upsert";
    pub const INVITER_RULE_DELETE: &str = "inviter_rule.delete";

    pub const REWARD_CREATE: &str = "reward.create";
    pub const REWARD_APPROVE: &str = "reward.approve";
    pub const REWARD_REJECT: &str = "reward.reject";
    pub const REWARD_REVERSE: &str = "reward.reverse";
    pub const REWARD_REISSUE: &str = "reward.reissue";
    pub const REWARD_RECOMPUTE: &str = "reward.recompute";

    pub const REFERRAL_INVITE: &str = "referral.invite";
    pub const REFERRAL_SIGNUP: &str = "referral.signup";
    pub const ACCOUNT_REGISTER: &str = "account.register";
}

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Campaign,
    InviterRule,
    Reward,
    Referral,
    Account,
}

impl TargetType {
    pub const ALL: [TargetType; 5] = [
        TargetType::Campaign,
        TargetType::InviterRule,
        TargetType::Reward,
        TargetType::Referral,
        TargetType::Account,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Campaign => "CAMPAIGN",
            TargetType::InviterRule => "INVITER_RULE",
            TargetType::Reward => "REWARD",
            TargetType::Referral => "REFERRAL",
            TargetType::Account => "ACCOUNT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit record. Never mutated or deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub action: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub actor: String,
    pub reason: String,
    /// Action-specific payload, e.g. prior and new points for a recompute.
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

//! Campaign entity and its lifecycle table.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rule::RewardRule;

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Archived,
}

impl CampaignStatus {
    pub const ALL: [CampaignStatus; 4] = [
        CampaignStatus::Draft,
        CampaignStatus::Active,
        CampaignStatus::Paused,
        CampaignStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "DRAFT",
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Paused => "PAUSED",
            CampaignStatus::Archived => "ARCHIVED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Next status for a lifecycle action, or `None` when the move is illegal.
    pub fn apply(self, action: LifecycleAction) -> Option<CampaignStatus> {
        use CampaignStatus::*;
        use LifecycleAction::*;

        match (self, action) {
            (Draft, Activate) | (Paused, Activate) => Some(Active),
            (Active, Pause) => Some(Paused),
            (Draft, Archive) | (Active, Archive) | (Paused, Archive) => Some(Archived),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Archived)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin-initiated campaign status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Activate,
    Pause,
    Archive,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Activate => "activate",
            LifecycleAction::Pause => "pause",
            LifecycleAction::Archive => "archive",
        }
    }
}

/// Reward rules attached to a campaign: the default plus per-inviter overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityRules {
    pub defaults: RewardRule,
    #[serde(default)]
    pub inviter_overrides: BTreeMap<String, RewardRule>,
}

/// Admin-supplied campaign configuration, validated on create and update.
///
/// Integer fields are signed so out-of-range input reaches validation
/// instead of failing at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub target_actions: i64,
    #[serde(default)]
    pub base_reward_points: i64,
    #[serde(default)]
    pub activation_reward_points: i64,
    #[serde(default)]
    pub passport_bonus_points: i64,
    #[serde(default)]
    pub mark_suspicious_as_pending: bool,
    pub eligibility_rules: EligibilityRules,
    /// Raw JSON text; must parse as an object when present.
    #[serde(default)]
    pub milestone_rules: Option<String>,
}

/// A configured referral promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: CampaignStatus,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub target_actions: u32,
    pub base_reward_points: u32,
    pub activation_reward_points: u32,
    pub passport_bonus_points: u32,
    pub mark_suspicious_as_pending: bool,
    pub eligibility_rules: EligibilityRules,
    pub milestone_rules: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: u32,
}

impl Campaign {
    /// True when rewards may be created for this campaign at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == CampaignStatus::Active
            && self.starts_at.map_or(true, |start| now >= start)
            && self.ends_at.map_or(true, |end| now <= end)
    }
}

//! Reward rules: payout formula plus per-pair caps and clamps.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payout formula selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardMode {
    Fixed,
    RevenueShare,
    NetAmountShare,
}

impl RewardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardMode::Fixed => "FIXED",
            RewardMode::RevenueShare => "REVENUE_SHARE",
            RewardMode::NetAmountShare => "NET_AMOUNT_SHARE",
        }
    }
}

impl fmt::Display for RewardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reward rule, used either as a campaign default or a per-inviter override.
///
/// Overrides replace the default wholesale; fields are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRule {
    pub reward_mode: RewardMode,
    /// FIXED only. `None` falls back to the campaign default.
    #[serde(default)]
    pub base_reward_points: Option<i64>,
    /// REVENUE_SHARE only, percent.
    #[serde(default)]
    pub revenue_share_pct: Option<Decimal>,
    /// NET_AMOUNT_SHARE only, percent.
    #[serde(default)]
    pub net_amount_share_pct: Option<Decimal>,
    /// Rewarded transactions allowed per inviter/invitee pair.
    pub max_transactions: i64,
    #[serde(default)]
    pub min_points: Option<Decimal>,
    #[serde(default)]
    pub max_points: Option<Decimal>,
    #[serde(default)]
    pub include_other_fees_in_revenue: bool,
}

impl RewardRule {
    /// A FIXED rule paying `points` for up to `max_transactions` transactions.
    pub fn fixed(points: i64, max_transactions: i64) -> Self {
        Self {
            reward_mode: RewardMode::Fixed,
            base_reward_points: Some(points),
            revenue_share_pct: None,
            net_amount_share_pct: None,
            max_transactions,
            min_points: None,
            max_points: None,
            include_other_fees_in_revenue: false,
        }
    }

    pub fn revenue_share(pct: Decimal, max_transactions: i64) -> Self {
        Self {
            reward_mode: RewardMode::RevenueShare,
            revenue_share_pct: Some(pct),
            ..Self::fixed(0, max_transactions)
        }
        .without_base()
    }

    pub fn net_amount_share(pct: Decimal, max_transactions: i64) -> Self {
        Self {
            reward_mode: RewardMode::NetAmountShare,
            net_amount_share_pct: Some(pct),
            ..Self::fixed(0, max_transactions)
        }
        .without_base()
    }

    pub fn with_clamp(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_points = min;
        self.max_points = max;
        self
    }

    pub fn with_other_fees(mut self, include: bool) -> Self {
        self.include_other_fees_in_revenue = include;
        self
    }

    fn without_base(mut self) -> Self {
        self.base_reward_points = None;
        self
    }

    /// Cap as an unsigned count. Validated rules always have `max_transactions >= 1`.
    pub fn cap(&self) -> u32 {
        u32::try_from(self.max_transactions.max(1)).unwrap_or(u32::MAX)
    }
}

/// Where an effective rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleSource {
    /// `eligibilityRules.defaults`
    CampaignDefault,
    /// `eligibilityRules.inviterOverrides`
    InviterOverride,
    /// `milestoneRules.inviterOverrides` (legacy location)
    LegacyMilestoneOverride,
}

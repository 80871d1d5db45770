//! Read-only rollups over the ledger and referral funnel.
//!
//! Nothing here writes, not even an audit entry.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{FieldErrors, Result};
use crate::interfaces::{CampaignStore, EngineStore, ReferralStore, RewardQuery, RewardStore};
use crate::model::{Referral, Reward, RewardStatus};
use crate::validation::errmsg;

/// Column order of the ledger export.
pub const CSV_HEADER: [&str; 13] = [
    "reward_id",
    "campaign_id",
    "inviter_account_id",
    "invitee_account_id",
    "transaction_reference",
    "points",
    "status",
    "flagged",
    "created_at",
    "moderated_at",
    "moderated_by",
    "reason",
    "reissued_from",
];

/// Funnel and point totals for one window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelTotals {
    pub invites: u64,
    pub signups: u64,
    pub qualified: u64,
    /// Sum of APPROVED points created in the window.
    pub issued_points: Decimal,
    /// Sum of PENDING points created in the window.
    pub pending_points: Decimal,
}

impl FunnelTotals {
    fn add_referral(&mut self, referral: &Referral, from: DateTime<Utc>, to: DateTime<Utc>) {
        let inside = |at: DateTime<Utc>| at >= from && at < to;
        if inside(referral.invited_at) {
            self.invites += 1;
        }
        if referral.signed_up_at.is_some_and(inside) {
            self.signups += 1;
        }
        if referral.qualified_at.is_some_and(inside) {
            self.qualified += 1;
        }
    }

    fn add_reward(&mut self, reward: &Reward) {
        match reward.status {
            RewardStatus::Approved => self.issued_points += reward.points,
            RewardStatus::Pending => self.pending_points += reward.points,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignBreakdown {
    pub campaign_id: Uuid,
    /// Empty when the campaign row is missing.
    pub campaign_name: String,
    #[serde(flatten)]
    pub totals: FunnelTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde(flatten)]
    pub totals: FunnelTotals,
    /// Campaigns with any activity in the window, by name.
    pub campaigns: Vec<CampaignBreakdown>,
}

#[derive(Clone)]
pub struct AnalyticsAggregator {
    store: Arc<dyn EngineStore>,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<dyn EngineStore>) -> Self {
        Self { store }
    }

    /// Funnel and points for `[from, to)`, overall and per campaign.
    pub async fn summary(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<AnalyticsSummary> {
        validate_window(from, to)?;

        let reward_query = RewardQuery::created_between(from, to);
        let (referrals, rewards, all_campaigns) = futures::try_join!(
            self.store.referrals_touching(from, to),
            self.store.find_rewards(&reward_query),
            self.store.all_campaigns(),
        )?;

        let mut totals = FunnelTotals::default();
        let mut per_campaign: BTreeMap<Uuid, FunnelTotals> = BTreeMap::new();
        for referral in &referrals {
            totals.add_referral(referral, from, to);
            per_campaign
                .entry(referral.campaign_id)
                .or_default()
                .add_referral(referral, from, to);
        }
        for reward in &rewards {
            totals.add_reward(reward);
            per_campaign
                .entry(reward.campaign_id)
                .or_default()
                .add_reward(reward);
        }

        let names: BTreeMap<Uuid, String> = all_campaigns
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let mut campaigns: Vec<CampaignBreakdown> = per_campaign
            .into_iter()
            .map(|(campaign_id, totals)| CampaignBreakdown {
                campaign_name: names.get(&campaign_id).cloned().unwrap_or_default(),
                campaign_id,
                totals,
            })
            .collect();
        campaigns.sort_by(|a, b| {
            a.campaign_name
                .cmp(&b.campaign_name)
                .then(a.campaign_id.cmp(&b.campaign_id))
        });

        debug!(
            referrals = referrals.len(),
            rewards = rewards.len(),
            campaigns = campaigns.len(),
            "Analytics summary computed"
        );
        Ok(AnalyticsSummary {
            from,
            to,
            totals,
            campaigns,
        })
    }

    /// Write every reward created in `[from, to)` as CSV, oldest first.
    /// Returns the number of data rows written.
    pub async fn write_csv<W: io::Write>(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        sink: W,
    ) -> Result<usize> {
        validate_window(from, to)?;
        let rewards = self
            .store
            .find_rewards(&RewardQuery::created_between(from, to))
            .await?;

        let mut writer = csv::Writer::from_writer(sink);
        writer.write_record(CSV_HEADER)?;
        for reward in &rewards {
            writer.write_record(csv_row(reward))?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(rewards.len())
    }

    /// CSV export as a string.
    pub async fn export_csv(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(from, to, &mut buffer).await?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn validate_window(from: DateTime<Utc>, to: DateTime<Utc>) -> std::result::Result<(), FieldErrors> {
    if to <= from {
        return Err(FieldErrors::single("to", errmsg::WINDOW_ORDER));
    }
    Ok(())
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn csv_row(reward: &Reward) -> [String; 13] {
    [
        reward.id.to_string(),
        reward.campaign_id.to_string(),
        reward.inviter_account_id.clone(),
        reward.invitee_account_id.clone(),
        reward.transaction_reference.clone(),
        reward.points.to_string(),
        reward.status.to_string(),
        reward.flagged.to_string(),
        timestamp(reward.created_at),
        reward.moderated_at.map(timestamp).unwrap_or_default(),
        reward.moderated_by.clone().unwrap_or_default(),
        reward.reason.clone().unwrap_or_default(),
        reward
            .reissued_from
            .map(|id| id.to_string())
            .unwrap_or_default(),
    ]
}

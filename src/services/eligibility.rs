//! Eligibility and cap tracking.
//!
//! The window check reads the campaign; the cap check and the reward insert
//! it guards run as one atomic store call so concurrent deliveries for the
//! same inviter/invitee pair can never exceed the cap.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::interfaces::{EngineStore, RewardCreation, RewardInsert, RewardStore};
use crate::model::Campaign;

#[derive(Clone)]
pub struct EligibilityTracker {
    store: Arc<dyn EngineStore>,
}

impl EligibilityTracker {
    pub fn new(store: Arc<dyn EngineStore>) -> Self {
        Self { store }
    }

    /// Whether the campaign accepts new rewards at `now`.
    pub fn is_eligible(&self, campaign: &Campaign, now: DateTime<Utc>) -> bool {
        campaign.is_live(now)
    }

    /// Atomically check idempotency and the cap, then insert the reward.
    pub async fn check_and_reserve(&self, creation: &RewardCreation) -> Result<RewardInsert> {
        Ok(self.store.create_reward(creation).await?)
    }
}

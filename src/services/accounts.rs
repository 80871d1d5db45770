//! Account inspection: one inviter's referrals, rewards and balance.

use std::sync::Arc;

use serde::Serialize;

use super::referrals::normalize_email;
use crate::error::{EngineError, Result};
use crate::interfaces::{EngineStore, ReferralQuery, ReferralStore, RewardQuery, RewardStore};
use crate::model::{Account, InviterBalance, Page, PageRequest, Referral, Reward};

/// Everything the admin screen shows for one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSummary {
    pub account_id: String,
    /// Directory record, when the account has been registered.
    pub account: Option<Account>,
    /// The referral through which this account signed up.
    pub referred_by: Option<Referral>,
    pub invitees: Page<Referral>,
    pub rewards: Page<Reward>,
    pub balance: InviterBalance,
}

#[derive(Clone)]
pub struct AccountInspector {
    store: Arc<dyn EngineStore>,
}

impl AccountInspector {
    pub fn new(store: Arc<dyn EngineStore>) -> Self {
        Self { store }
    }

    /// Summary for an account id. Unknown accounts with no referral
    /// footprint are `NotFound`.
    pub async fn summary_by_id(&self, account_id: &str, page: PageRequest) -> Result<ReferralSummary> {
        let account = self.store.get_account(account_id).await?;
        let summary = self.summarize(account_id, account, page).await?;
        if summary.account.is_none()
            && summary.referred_by.is_none()
            && summary.invitees.total_elements == 0
            && summary.rewards.total_elements == 0
        {
            return Err(EngineError::not_found("account", account_id));
        }
        Ok(summary)
    }

    /// Summary for the account registered under `email`.
    pub async fn summary_by_email(&self, email: &str, page: PageRequest) -> Result<ReferralSummary> {
        let normalized = normalize_email(email);
        let account = self
            .store
            .find_account_by_email(&normalized)
            .await?
            .ok_or_else(|| EngineError::not_found("account", &normalized))?;
        let account_id = account.account_id.clone();
        self.summarize(&account_id, Some(account), page).await
    }

    async fn summarize(
        &self,
        account_id: &str,
        account: Option<Account>,
        page: PageRequest,
    ) -> Result<ReferralSummary> {
        let referred_by = self.store.find_referral_by_invitee(account_id).await?;
        let invitees = self
            .store
            .list_referrals(&ReferralQuery::for_inviter(account_id), page)
            .await?;
        let query = RewardQuery::for_inviter(account_id);
        let rewards = self.store.list_rewards(&query, page).await?;
        let all_rewards = self.store.find_rewards(&query).await?;

        Ok(ReferralSummary {
            account_id: account_id.to_string(),
            account,
            referred_by,
            invitees,
            rewards,
            balance: InviterBalance::from_rewards(&all_rewards),
        })
    }
}

//! In-memory storage used by tests and the `memory` storage type.
//!
//! A single async mutex guards all tables, so every trait call is atomic
//! with respect to every other, which gives the same guarantees as the
//! SQLite backend's `BEGIN IMMEDIATE` transactions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::interfaces::{
    AuditStore, CampaignStore, ReferralQuery, ReferralStore, Result, RewardCreation, RewardInsert,
    RewardQuery, RewardStore, StorageError,
};
use crate::model::{
    Account, AuditLogEntry, Campaign, CampaignStatus, Page, PageRequest, Referral, Reward,
};


/// Tables, each kept in insertion order.
#[derive(Default)]
struct State {
    campaigns: Vec<Campaign>,
    rewards: Vec<Reward>,
    audit: Vec<AuditLogEntry>,
    referrals: Vec<Referral>,
    accounts: BTreeMap<String, Account>,
}

impl State {
    fn append_audit(&mut self, entry: &AuditLogEntry) {
        self.audit.push(entry.clone());
    }

    /// Latest reward for a reference within one triple.
    fn by_reference(
        &self,
        campaign_id: Uuid,
        inviter_account_id: &str,
        invitee_account_id: &str,
        transaction_reference: &str,
    ) -> Option<&Reward> {
        self.rewards.iter().rev().find(|r| {
            r.campaign_id == campaign_id
                && r.inviter_account_id == inviter_account_id
                && r.invitee_account_id == invitee_account_id
                && r.transaction_reference == transaction_reference
        })
    }
}

/// Mock store holding every table in memory.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<State>,
    fail_on_audit: RwLock<bool>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every audit write fail, which must abort the mutation it belongs to.
    pub async fn set_fail_on_audit(&self, fail: bool) {
        *self.fail_on_audit.write().await = fail;
    }

    /// Number of audit entries written so far.
    pub async fn audit_len(&self) -> usize {
        self.state.lock().await.audit.len()
    }

    async fn check_audit(&self) -> Result<()> {
        if *self.fail_on_audit.read().await {
            return Err(StorageError::AuditWrite(
                "audit store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn version_conflict(entity: &'static str, id: impl ToString, expected: u32) -> StorageError {
    StorageError::VersionConflict {
        entity,
        id: id.to_string(),
        expected,
    }
}

fn in_window(at: Option<DateTime<Utc>>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    at.is_some_and(|t| t >= from && t < to)
}

#[async_trait]
impl CampaignStore for MockStore {
    async fn insert_campaign(&self, campaign: &Campaign, audit: &AuditLogEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.campaigns.iter().any(|c| c.id == campaign.id) {
            return Err(StorageError::DuplicateKey(campaign.id.to_string()));
        }
        self.check_audit().await?;
        state.campaigns.push(campaign.clone());
        state.append_audit(audit);
        Ok(())
    }

    async fn update_campaign(
        &self,
        campaign: &Campaign,
        expected_version: u32,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(index) = state.campaigns.iter().position(|c| c.id == campaign.id) else {
            return Err(StorageError::NotFound {
                entity: "campaign",
                id: campaign.id.to_string(),
            });
        };
        if state.campaigns[index].version != expected_version {
            return Err(version_conflict("campaign", campaign.id, expected_version));
        }
        self.check_audit().await?;
        state.campaigns[index] = campaign.clone();
        state.append_audit(audit);
        Ok(())
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        let state = self.state.lock().await;
        Ok(state.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn list_campaigns(
        &self,
        status: Option<CampaignStatus>,
        page: PageRequest,
    ) -> Result<Page<Campaign>> {
        let state = self.state.lock().await;
        let matching: Vec<Campaign> = state
            .campaigns
            .iter()
            .rev()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }

    async fn all_campaigns(&self) -> Result<Vec<Campaign>> {
        let state = self.state.lock().await;
        Ok(state.campaigns.clone())
    }
}

#[async_trait]
impl RewardStore for MockStore {
    async fn create_reward(&self, creation: &RewardCreation) -> Result<RewardInsert> {
        let mut state = self.state.lock().await;
        let reward = &creation.reward;
        let same_triple = |r: &&Reward| {
            r.campaign_id == reward.campaign_id
                && r.inviter_account_id == reward.inviter_account_id
                && r.invitee_account_id == reward.invitee_account_id
        };

        if let Some(existing) = state.by_reference(
            reward.campaign_id,
            &reward.inviter_account_id,
            &reward.invitee_account_id,
            &reward.transaction_reference,
        ) {
            return Ok(RewardInsert::Duplicate(existing.clone()));
        }

        let used = state
            .rewards
            .iter()
            .filter(same_triple)
            .filter(|r| r.status.counts_toward_cap())
            .count() as u32;
        if used >= creation.max_transactions {
            return Ok(RewardInsert::CapReached { used });
        }

        self.check_audit().await?;
        state.rewards.push(reward.clone());
        if let Some(referral) = state
            .referrals
            .iter_mut()
            .find(|r| r.id == creation.referral_id)
        {
            if referral.qualified_at.is_none() {
                referral.qualified_at = Some(reward.created_at);
            }
        }
        state.append_audit(&creation.audit);
        Ok(RewardInsert::Inserted(reward.clone()))
    }

    async fn get_reward(&self, id: Uuid) -> Result<Option<Reward>> {
        let state = self.state.lock().await;
        Ok(state.rewards.iter().find(|r| r.id == id).cloned())
    }

    async fn find_reward_by_reference(
        &self,
        campaign_id: Uuid,
        inviter_account_id: &str,
        invitee_account_id: &str,
        transaction_reference: &str,
    ) -> Result<Option<Reward>> {
        let state = self.state.lock().await;
        Ok(state
            .by_reference(
                campaign_id,
                inviter_account_id,
                invitee_account_id,
                transaction_reference,
            )
            .cloned())
    }

    async fn update_reward(
        &self,
        reward: &Reward,
        expected_version: u32,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(index) = state.rewards.iter().position(|r| r.id == reward.id) else {
            return Err(StorageError::NotFound {
                entity: "reward",
                id: reward.id.to_string(),
            });
        };
        if state.rewards[index].version != expected_version {
            return Err(version_conflict("reward", reward.id, expected_version));
        }
        self.check_audit().await?;
        state.rewards[index] = reward.clone();
        state.append_audit(audit);
        Ok(())
    }

    async fn reissue_reward(
        &self,
        original: &Reward,
        expected_version: u32,
        replacement: &Reward,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(index) = state.rewards.iter().position(|r| r.id == original.id) else {
            return Err(StorageError::NotFound {
                entity: "reward",
                id: original.id.to_string(),
            });
        };
        if state.rewards[index].version != expected_version {
            return Err(version_conflict("reward", original.id, expected_version));
        }
        if state.rewards.iter().any(|r| r.id == replacement.id) {
            return Err(StorageError::DuplicateKey(replacement.id.to_string()));
        }
        self.check_audit().await?;
        state.rewards[index] = original.clone();
        state.rewards.push(replacement.clone());
        state.append_audit(audit);
        Ok(())
    }

    async fn list_rewards(&self, query: &RewardQuery, page: PageRequest) -> Result<Page<Reward>> {
        let matching = self.find_rewards(query).await?;
        Ok(page.slice(&matching))
    }

    async fn find_rewards(&self, query: &RewardQuery) -> Result<Vec<Reward>> {
        let state = self.state.lock().await;
        Ok(state
            .rewards
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    async fn count_capped_rewards(
        &self,
        campaign_id: Uuid,
        inviter_account_id: &str,
        invitee_account_id: &str,
    ) -> Result<u32> {
        let state = self.state.lock().await;
        Ok(state
            .rewards
            .iter()
            .filter(|r| {
                r.campaign_id == campaign_id
                    && r.inviter_account_id == inviter_account_id
                    && r.invitee_account_id == invitee_account_id
                    && r.status.counts_toward_cap()
            })
            .count() as u32)
    }
}

#[async_trait]
impl AuditStore for MockStore {
    async fn append_audit(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        self.check_audit().await?;
        state.append_audit(entry);
        Ok(())
    }

    async fn list_audit(
        &self,
        action_prefix: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<AuditLogEntry>> {
        let state = self.state.lock().await;
        let matching: Vec<AuditLogEntry> = state
            .audit
            .iter()
            .rev()
            .filter(|e| action_prefix.map_or(true, |p| e.action.starts_with(p)))
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }
}

#[async_trait]
impl ReferralStore for MockStore {
    async fn insert_referral(&self, referral: &Referral, audit: &AuditLogEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.referrals.iter().any(|r| r.id == referral.id) {
            return Err(StorageError::DuplicateKey(referral.id.to_string()));
        }
        self.check_audit().await?;
        state.referrals.push(referral.clone());
        state.append_audit(audit);
        Ok(())
    }

    async fn mark_signed_up(
        &self,
        referral_id: Uuid,
        invitee_account_id: &str,
        at: DateTime<Utc>,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(index) = state.referrals.iter().position(|r| r.id == referral_id) else {
            return Err(StorageError::NotFound {
                entity: "referral",
                id: referral_id.to_string(),
            });
        };
        if state.referrals[index].signed_up_at.is_some() {
            return Err(version_conflict("referral", referral_id, 0));
        }
        self.check_audit().await?;
        let referral = &mut state.referrals[index];
        referral.invitee_account_id = Some(invitee_account_id.to_string());
        referral.signed_up_at = Some(at);
        state.append_audit(audit);
        Ok(())
    }

    async fn get_referral(&self, id: Uuid) -> Result<Option<Referral>> {
        let state = self.state.lock().await;
        Ok(state.referrals.iter().find(|r| r.id == id).cloned())
    }

    async fn find_referral_by_invitee(
        &self,
        invitee_account_id: &str,
    ) -> Result<Option<Referral>> {
        let state = self.state.lock().await;
        Ok(state
            .referrals
            .iter()
            .filter(|r| r.invitee_account_id.as_deref() == Some(invitee_account_id))
            .max_by_key(|r| r.signed_up_at)
            .cloned())
    }

    async fn list_referrals(
        &self,
        query: &ReferralQuery,
        page: PageRequest,
    ) -> Result<Page<Referral>> {
        let state = self.state.lock().await;
        let matching: Vec<Referral> = state
            .referrals
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }

    async fn referrals_touching(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Referral>> {
        let state = self.state.lock().await;
        Ok(state
            .referrals
            .iter()
            .filter(|r| {
                in_window(Some(r.invited_at), from, to)
                    || in_window(r.signed_up_at, from, to)
                    || in_window(r.qualified_at, from, to)
            })
            .cloned()
            .collect())
    }

    async fn upsert_account(&self, account: &Account, audit: &AuditLogEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        let email_taken = state
            .accounts
            .values()
            .any(|a| a.email == account.email && a.account_id != account.account_id);
        if email_taken {
            return Err(StorageError::DuplicateKey(account.email.clone()));
        }
        self.check_audit().await?;
        state
            .accounts
            .insert(account.account_id.clone(), account.clone());
        state.append_audit(audit);
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(account_id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state.accounts.values().find(|a| a.email == email).cloned())
    }
}

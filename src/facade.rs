//! Referral engine facade for in-process library usage.
//!
//! Wires every service around one store and one clock, and checks the
//! caller's permissions before delegating.
//!
//! # Example
//!
//! ```ignore
//! use referral_engine::auth::Actor;
//! use referral_engine::config::Config;
//! use referral_engine::facade::ReferralEngine;
//!
//! let engine = ReferralEngine::from_config(&Config::load(None)?).await?;
//!
//! let admin = Actor::admin("ops@example.com");
//! let campaign = engine.create_campaign(&admin, &spec).await?;
//! engine.activate_campaign(&admin, campaign.id).await?;
//!
//! let outcome = engine
//!     .process_transaction(&Actor::system("tx-pipeline"), &event)
//!     .await?;
//! ```

use std::io;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::auth::{Actor, Permission};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, EngineConfig};
use crate::error::Result;
use crate::interfaces::{EngineStore, RewardQuery};
use crate::model::{
    Account, AuditLogEntry, Campaign, CampaignSpec, CampaignStatus, InviterBalance, Page,
    PageRequest, QualifyingTransaction, Referral, Reward, RewardOutcome, RewardRule,
};
use crate::services::{
    AccountInspector, AnalyticsAggregator, AnalyticsSummary, AuditRecorder,
    CampaignLifecycleManager, InviterRuleAdmin, InviterRuleEntry, ReferralRegistry,
    ReferralSummary, RewardIssuer, RewardLedger,
};
use crate::storage::{init_storage, MockStore};
use crate::validation::validate_page;

/// Builder for a [`ReferralEngine`].
pub struct ReferralEngineBuilder {
    store: Option<Arc<dyn EngineStore>>,
    clock: Option<Arc<dyn Clock>>,
    config: EngineConfig,
}

impl ReferralEngineBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            clock: None,
            config: EngineConfig::default(),
        }
    }

    /// Use this store. Defaults to an in-memory store.
    pub fn with_store(mut self, store: Arc<dyn EngineStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this clock. Defaults to the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ReferralEngine {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MockStore::new()) as Arc<dyn EngineStore>);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        ReferralEngine {
            lifecycle: CampaignLifecycleManager::new(Arc::clone(&store), Arc::clone(&clock)),
            rules: InviterRuleAdmin::new(Arc::clone(&store), Arc::clone(&clock)),
            issuer: RewardIssuer::new(Arc::clone(&store), Arc::clone(&clock)),
            ledger: RewardLedger::new(Arc::clone(&store), Arc::clone(&clock)),
            referrals: ReferralRegistry::new(Arc::clone(&store), Arc::clone(&clock)),
            audit: AuditRecorder::new(Arc::clone(&store), clock),
            accounts: AccountInspector::new(Arc::clone(&store)),
            analytics: AnalyticsAggregator::new(Arc::clone(&store)),
            store,
            config: self.config,
        }
    }
}

impl Default for ReferralEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The engine's full operation surface.
///
/// Every operation takes the calling [`Actor`]; mutations attach its id to
/// the audit entry they write.
#[derive(Clone)]
pub struct ReferralEngine {
    store: Arc<dyn EngineStore>,
    config: EngineConfig,
    lifecycle: CampaignLifecycleManager,
    rules: InviterRuleAdmin,
    issuer: RewardIssuer,
    ledger: RewardLedger,
    referrals: ReferralRegistry,
    audit: AuditRecorder,
    accounts: AccountInspector,
    analytics: AnalyticsAggregator,
}

impl ReferralEngine {
    pub fn builder() -> ReferralEngineBuilder {
        ReferralEngineBuilder::new()
    }

    /// Build an engine on the storage named by `config`.
    pub async fn from_config(config: &Config) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let store = init_storage(&config.storage).await?;
        Ok(Self::builder()
            .with_store(store)
            .with_config(config.engine.clone())
            .build())
    }

    /// Direct access to the underlying store.
    pub fn store(&self) -> &Arc<dyn EngineStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Page `page` at the configured default size.
    pub fn page(&self, page: u32) -> PageRequest {
        PageRequest::new(page, self.config.default_page_size)
    }

    fn check_page(&self, page: PageRequest) -> Result<()> {
        validate_page(page, self.config.max_page_size)?;
        Ok(())
    }

    // Campaigns

    pub async fn list_campaigns(
        &self,
        actor: &Actor,
        status: Option<CampaignStatus>,
        page: PageRequest,
    ) -> Result<Page<Campaign>> {
        actor.require(Permission::ReadCampaigns)?;
        self.check_page(page)?;
        self.lifecycle.list(status, page).await
    }

    pub async fn get_campaign(&self, actor: &Actor, id: Uuid) -> Result<Campaign> {
        actor.require(Permission::ReadCampaigns)?;
        self.lifecycle.get(id).await
    }

    pub async fn create_campaign(&self, actor: &Actor, spec: &CampaignSpec) -> Result<Campaign> {
        actor.require(Permission::ManageCampaigns)?;
        self.lifecycle.create(actor, spec).await
    }

    pub async fn update_campaign(
        &self,
        actor: &Actor,
        id: Uuid,
        spec: &CampaignSpec,
    ) -> Result<Campaign> {
        actor.require(Permission::ManageCampaigns)?;
        self.lifecycle.update(actor, id, spec).await
    }

    pub async fn activate_campaign(&self, actor: &Actor, id: Uuid) -> Result<Campaign> {
        actor.require(Permission::ManageCampaigns)?;
        self.lifecycle.activate(actor, id).await
    }

    pub async fn pause_campaign(&self, actor: &Actor, id: Uuid) -> Result<Campaign> {
        actor.require(Permission::ManageCampaigns)?;
        self.lifecycle.pause(actor, id).await
    }

    pub async fn archive_campaign(&self, actor: &Actor, id: Uuid) -> Result<Campaign> {
        actor.require(Permission::ManageCampaigns)?;
        self.lifecycle.archive(actor, id).await
    }

    // Inviter rules

    pub async fn get_inviter_rule(
        &self,
        actor: &Actor,
        campaign_id: Uuid,
        inviter_account_id: &str,
    ) -> Result<InviterRuleEntry> {
        actor.require(Permission::ReadCampaigns)?;
        self.rules.get(campaign_id, inviter_account_id).await
    }

    pub async fn list_inviter_rules(
        &self,
        actor: &Actor,
        campaign_id: Uuid,
    ) -> Result<Vec<InviterRuleEntry>> {
        actor.require(Permission::ReadCampaigns)?;
        self.rules.list(campaign_id).await
    }

    pub async fn upsert_inviter_rule(
        &self,
        actor: &Actor,
        campaign_id: Uuid,
        inviter_account_id: &str,
        rule: RewardRule,
    ) -> Result<InviterRuleEntry> {
        actor.require(Permission::ManageCampaigns)?;
        self.rules
            .upsert(actor, campaign_id, inviter_account_id, rule)
            .await
    }

    pub async fn delete_inviter_rule(
        &self,
        actor: &Actor,
        campaign_id: Uuid,
        inviter_account_id: &str,
    ) -> Result<()> {
        actor.require(Permission::ManageCampaigns)?;
        self.rules.delete(actor, campaign_id, inviter_account_id).await
    }

    // Reward creation

    pub async fn process_transaction(
        &self,
        actor: &Actor,
        tx: &QualifyingTransaction,
    ) -> Result<RewardOutcome> {
        actor.require(Permission::IssueRewards)?;
        self.issuer.process_transaction(actor, tx).await
    }

    // Moderation

    /// The moderation review queue, honouring `review_queue_includes_flagged`.
    pub async fn review_queue(&self, actor: &Actor, page: PageRequest) -> Result<Page<Reward>> {
        actor.require(Permission::ModerateRewards)?;
        self.check_page(page)?;
        self.ledger
            .review_queue(self.config.review_queue_includes_flagged, page)
            .await
    }

    pub async fn approve_reward(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Reward> {
        actor.require(Permission::ModerateRewards)?;
        self.ledger.approve(actor, id, reason).await
    }

    pub async fn reject_reward(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Reward> {
        actor.require(Permission::ModerateRewards)?;
        self.ledger.reject(actor, id, reason).await
    }

    pub async fn reverse_reward(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Reward> {
        actor.require(Permission::ModerateRewards)?;
        self.ledger.reverse(actor, id, reason).await
    }

    /// Returns the replacement reward.
    pub async fn reissue_reward(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Reward> {
        actor.require(Permission::ModerateRewards)?;
        self.ledger.reissue(actor, id, reason).await
    }

    pub async fn recompute_reward(
        &self,
        actor: &Actor,
        id: Uuid,
        points: Decimal,
        reason: &str,
    ) -> Result<Reward> {
        actor.require(Permission::ModerateRewards)?;
        self.ledger.recompute(actor, id, points, reason).await
    }

    pub async fn get_reward(&self, actor: &Actor, id: Uuid) -> Result<Reward> {
        actor.require(Permission::ViewReports)?;
        self.ledger.get(id).await
    }

    pub async fn list_rewards(
        &self,
        actor: &Actor,
        query: &RewardQuery,
        page: PageRequest,
    ) -> Result<Page<Reward>> {
        actor.require(Permission::ViewReports)?;
        self.check_page(page)?;
        self.ledger.list(query, page).await
    }

    pub async fn inviter_balance(
        &self,
        actor: &Actor,
        inviter_account_id: &str,
    ) -> Result<InviterBalance> {
        actor.require(Permission::ViewReports)?;
        self.ledger.balance(inviter_account_id).await
    }

    // Referrals and accounts

    pub async fn record_invite(
        &self,
        actor: &Actor,
        campaign_id: Uuid,
        inviter_account_id: &str,
        invitee_email: &str,
    ) -> Result<Referral> {
        actor.require(Permission::ManageReferrals)?;
        self.referrals
            .record_invite(actor, campaign_id, inviter_account_id, invitee_email)
            .await
    }

    pub async fn record_signup(
        &self,
        actor: &Actor,
        referral_id: Uuid,
        invitee_account_id: &str,
    ) -> Result<Referral> {
        actor.require(Permission::ManageReferrals)?;
        self.referrals
            .record_signup(actor, referral_id, invitee_account_id)
            .await
    }

    pub async fn register_account(
        &self,
        actor: &Actor,
        account_id: &str,
        email: &str,
    ) -> Result<Account> {
        actor.require(Permission::ManageReferrals)?;
        self.referrals.register_account(actor, account_id, email).await
    }

    pub async fn account_summary(
        &self,
        actor: &Actor,
        account_id: &str,
        page: PageRequest,
    ) -> Result<ReferralSummary> {
        actor.require(Permission::ViewReports)?;
        self.check_page(page)?;
        self.accounts.summary_by_id(account_id, page).await
    }

    pub async fn account_summary_by_email(
        &self,
        actor: &Actor,
        email: &str,
        page: PageRequest,
    ) -> Result<ReferralSummary> {
        actor.require(Permission::ViewReports)?;
        self.check_page(page)?;
        self.accounts.summary_by_email(email, page).await
    }

    // Reporting

    pub async fn analytics_summary(
        &self,
        actor: &Actor,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<AnalyticsSummary> {
        actor.require(Permission::ViewReports)?;
        self.analytics.summary(from, to).await
    }

    pub async fn export_ledger_csv(
        &self,
        actor: &Actor,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<String> {
        actor.require(Permission::ViewReports)?;
        self.analytics.export_csv(from, to).await
    }

    /// Stream the ledger export into `sink`; returns the row count.
    pub async fn write_ledger_csv<W: io::Write>(
        &self,
        actor: &Actor,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        sink: W,
    ) -> Result<usize> {
        actor.require(Permission::ViewReports)?;
        self.analytics.write_csv(from, to, sink).await
    }

    pub async fn list_audit(
        &self,
        actor: &Actor,
        action_prefix: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<AuditLogEntry>> {
        actor.require(Permission::ViewReports)?;
        self.check_page(page)?;
        self.audit.list(action_prefix, page).await
    }
}

//! Referral and account directory storage interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Result;
use crate::model::{Account, AuditLogEntry, Page, PageRequest, Referral};

/// Filter for referral listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferralQuery {
    pub campaign_id: Option<Uuid>,
    pub inviter_account_id: Option<String>,
}

impl ReferralQuery {
    pub fn for_inviter(inviter_account_id: impl Into<String>) -> Self {
        Self {
            inviter_account_id: Some(inviter_account_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, referral: &Referral) -> bool {
        self.campaign_id.map_or(true, |id| referral.campaign_id == id)
            && self
                .inviter_account_id
                .as_deref()
                .map_or(true, |id| referral.inviter_account_id == id)
    }
}

/// Interface for referral and account persistence.
#[async_trait]
pub trait ReferralStore: Send + Sync {
    async fn insert_referral(&self, referral: &Referral, audit: &AuditLogEntry) -> Result<()>;

    /// Attach the invitee account to a referral that has not signed up yet.
    ///
    /// Fails with `VersionConflict` when the referral already has a signup.
    async fn mark_signed_up(
        &self,
        referral_id: Uuid,
        invitee_account_id: &str,
        at: DateTime<Utc>,
        audit: &AuditLogEntry,
    ) -> Result<()>;

    async fn get_referral(&self, id: Uuid) -> Result<Option<Referral>>;

    /// The most recent signed-up referral for an invitee account.
    async fn find_referral_by_invitee(&self, invitee_account_id: &str)
        -> Result<Option<Referral>>;

    /// Referrals oldest first.
    async fn list_referrals(
        &self,
        query: &ReferralQuery,
        page: PageRequest,
    ) -> Result<Page<Referral>>;

    /// Referrals with any funnel timestamp in `[from, to)`.
    async fn referrals_touching(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Referral>>;

    /// Insert or refresh an account's email.
    async fn upsert_account(&self, account: &Account, audit: &AuditLogEntry) -> Result<()>;

    async fn get_account(&self, account_id: &str) -> Result<Option<Account>>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;
}

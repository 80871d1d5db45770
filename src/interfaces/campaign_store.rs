//! Campaign storage interface.

use async_trait::async_trait;
use uuid::Uuid;

use super::Result;
use crate::model::{AuditLogEntry, Campaign, CampaignStatus, Page, PageRequest};

/// Interface for campaign persistence.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Store a new campaign together with its audit entry.
    async fn insert_campaign(&self, campaign: &Campaign, audit: &AuditLogEntry) -> Result<()>;

    /// Replace a campaign whose stored version is `expected_version`.
    ///
    /// Fails with `VersionConflict` when another writer got there first.
    async fn update_campaign(
        &self,
        campaign: &Campaign,
        expected_version: u32,
        audit: &AuditLogEntry,
    ) -> Result<()>;

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>>;

    /// Campaigns newest first, optionally filtered by status.
    async fn list_campaigns(
        &self,
        status: Option<CampaignStatus>,
        page: PageRequest,
    ) -> Result<Page<Campaign>>;

    /// Every campaign, archived included.
    async fn all_campaigns(&self) -> Result<Vec<Campaign>>;
}

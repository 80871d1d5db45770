//! Campaign lifecycle manager.
//!
//! Owns campaign configuration and status. Campaigns are created in DRAFT,
//! move through ACTIVE and PAUSED, and end in ARCHIVED, which is terminal
//! and retained for history.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::audit::{with_details, AuditRecorder};
use crate::auth::Actor;
use crate::clock::Clock;
use crate::error::{EngineError, Result};
use crate::interfaces::{CampaignStore, EngineStore, StorageError};
use crate::model::{
    actions, AuditLogEntry, Campaign, CampaignSpec, CampaignStatus, LifecycleAction, Page,
    PageRequest, TargetType,
};
use crate::validation::validate_campaign_spec;

/// Validated counts are within `0..=u32::MAX`.
fn count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[derive(Clone)]
pub struct CampaignLifecycleManager {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
}

impl CampaignLifecycleManager {
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>) -> Self {
        let audit = AuditRecorder::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            store,
            clock,
            audit,
        }
    }

    /// Validate `spec` and store it as a new DRAFT campaign.
    pub async fn create(&self, actor: &Actor, spec: &CampaignSpec) -> Result<Campaign> {
        let milestone_rules = validate_campaign_spec(spec)?;
        let now = self.clock.now();

        let campaign = Campaign {
            id: Uuid::new_v4(),
            name: spec.name.trim().to_string(),
            description: spec.description.clone(),
            status: CampaignStatus::Draft,
            starts_at: spec.starts_at,
            ends_at: spec.ends_at,
            target_actions: count(spec.target_actions),
            base_reward_points: count(spec.base_reward_points),
            activation_reward_points: count(spec.activation_reward_points),
            passport_bonus_points: count(spec.passport_bonus_points),
            mark_suspicious_as_pending: spec.mark_suspicious_as_pending,
            eligibility_rules: spec.eligibility_rules.clone(),
            milestone_rules,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        let entry = self.audit.entry(
            actions::CAMPAIGN_CREATE,
            TargetType::Campaign,
            campaign.id,
            actor,
            "",
        );
        self.store.insert_campaign(&campaign, &entry).await?;

        info!(campaign_id = %campaign.id, actor = %actor.id, "Campaign created");
        Ok(campaign)
    }

    /// Replace a campaign's configuration. Status is left unchanged.
    pub async fn update(&self, actor: &Actor, id: Uuid, spec: &CampaignSpec) -> Result<Campaign> {
        let current = self.get(id).await?;
        if current.status.is_terminal() {
            return Err(EngineError::invalid_transition(
                "campaign",
                current.status,
                "update",
            ));
        }
        let milestone_rules = validate_campaign_spec(spec)?;

        let updated = Campaign {
            name: spec.name.trim().to_string(),
            description: spec.description.clone(),
            starts_at: spec.starts_at,
            ends_at: spec.ends_at,
            target_actions: count(spec.target_actions),
            base_reward_points: count(spec.base_reward_points),
            activation_reward_points: count(spec.activation_reward_points),
            passport_bonus_points: count(spec.passport_bonus_points),
            mark_suspicious_as_pending: spec.mark_suspicious_as_pending,
            eligibility_rules: spec.eligibility_rules.clone(),
            milestone_rules,
            updated_at: self.clock.now(),
            version: current.version + 1,
            ..current.clone()
        };

        let entry = self
            .audit
            .entry(actions::CAMPAIGN_UPDATE, TargetType::Campaign, id, actor, "");
        self.save(&updated, current.version, &entry).await?;

        info!(campaign_id = %id, actor = %actor.id, "Campaign updated");
        Ok(updated)
    }

    pub async fn activate(&self, actor: &Actor, id: Uuid) -> Result<Campaign> {
        self.transition(actor, id, LifecycleAction::Activate).await
    }

    pub async fn pause(&self, actor: &Actor, id: Uuid) -> Result<Campaign> {
        self.transition(actor, id, LifecycleAction::Pause).await
    }

    pub async fn archive(&self, actor: &Actor, id: Uuid) -> Result<Campaign> {
        self.transition(actor, id, LifecycleAction::Archive).await
    }

    async fn transition(
        &self,
        actor: &Actor,
        id: Uuid,
        action: LifecycleAction,
    ) -> Result<Campaign> {
        let current = self.get(id).await?;
        let next = current.status.apply(action).ok_or_else(|| {
            EngineError::invalid_transition("campaign", current.status, action.as_str())
        })?;

        let updated = Campaign {
            status: next,
            updated_at: self.clock.now(),
            version: current.version + 1,
            ..current.clone()
        };

        let audit_action = match action {
            LifecycleAction::Activate => actions::CAMPAIGN_ACTIVATE,
            LifecycleAction::Pause => actions::CAMPAIGN_PAUSE,
            LifecycleAction::Archive => actions::CAMPAIGN_ARCHIVE,
        };
        let entry = with_details(
            self.audit
                .entry(audit_action, TargetType::Campaign, id, actor, ""),
            json!({ "from": current.status, "to": next }),
        );
        self.save(&updated, current.version, &entry).await?;

        info!(
            campaign_id = %id,
            actor = %actor.id,
            from = %current.status,
            to = %next,
            "Campaign status changed"
        );
        Ok(updated)
    }

    pub async fn get(&self, id: Uuid) -> Result<Campaign> {
        self.store
            .get_campaign(id)
            .await?
            .ok_or_else(|| EngineError::not_found("campaign", id))
    }

    /// Campaigns newest first, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<CampaignStatus>,
        page: PageRequest,
    ) -> Result<Page<Campaign>> {
        Ok(self.store.list_campaigns(status, page).await?)
    }

    /// Versioned write; a lost race surfaces as `Conflict`.
    pub(crate) async fn save(
        &self,
        campaign: &Campaign,
        expected_version: u32,
        entry: &AuditLogEntry,
    ) -> Result<()> {
        match self
            .store
            .update_campaign(campaign, expected_version, entry)
            .await
        {
            Ok(()) => Ok(()),
            Err(StorageError::VersionConflict { .. }) => Err(EngineError::Conflict(format!(
                "campaign {} was modified concurrently",
                campaign.id
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

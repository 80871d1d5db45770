//! Inviter rule administration.
//!
//! Writes always go to `eligibilityRules.inviterOverrides`. Deletes clear
//! both override locations so the inviter falls back to the campaign
//! default on the next computation.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::audit::{with_details, AuditRecorder};
use super::lifecycle::CampaignLifecycleManager;
use super::resolver::{self, InviterRuleEntry};
use crate::auth::Actor;
use crate::clock::Clock;
use crate::error::{EngineError, FieldErrors, Result};
use crate::interfaces::EngineStore;
use crate::model::{actions, Campaign, RewardRule, TargetType};
use crate::validation::{validate_reference, validate_rule};

#[derive(Clone)]
pub struct InviterRuleAdmin {
    campaigns: CampaignLifecycleManager,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
}

impl InviterRuleAdmin {
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            campaigns: CampaignLifecycleManager::new(Arc::clone(&store), Arc::clone(&clock)),
            audit: AuditRecorder::new(store, Arc::clone(&clock)),
            clock,
        }
    }

    /// The override for one inviter and where it is stored.
    pub async fn get(
        &self,
        campaign_id: Uuid,
        inviter_account_id: &str,
    ) -> Result<InviterRuleEntry> {
        let campaign = self.campaigns.get(campaign_id).await?;
        resolver::find_override(&campaign, inviter_account_id)
            .ok_or_else(|| EngineError::not_found("inviter rule", inviter_account_id))
    }

    /// Every overridden inviter for a campaign, sorted by inviter id.
    pub async fn list(&self, campaign_id: Uuid) -> Result<Vec<InviterRuleEntry>> {
        let campaign = self.campaigns.get(campaign_id).await?;
        Ok(resolver::list_overrides(&campaign))
    }

    pub async fn upsert(
        &self,
        actor: &Actor,
        campaign_id: Uuid,
        inviter_account_id: &str,
        rule: RewardRule,
    ) -> Result<InviterRuleEntry> {
        let mut errors = FieldErrors::new();
        validate_reference("inviterAccountId", inviter_account_id, &mut errors);
        validate_rule("rule", &rule, &mut errors);
        errors.into_result()?;

        let current = self.writable(campaign_id).await?;
        let mut updated = self.next_version(&current);
        let replaced = updated
            .eligibility_rules
            .inviter_overrides
            .insert(inviter_account_id.to_string(), rule)
            .is_some();

        let entry = with_details(
            self.audit.entry(
                actions::INVITER_RULE_UPSERT,
                TargetType::InviterRule,
                rule_target(campaign_id, inviter_account_id),
                actor,
                "",
            ),
            json!({ "replaced": replaced }),
        );
        self.campaigns.save(&updated, current.version, &entry).await?;

        info!(
            campaign_id = %campaign_id,
            inviter = %inviter_account_id,
            actor = %actor.id,
            "Inviter rule saved"
        );
        resolver::find_override(&updated, inviter_account_id)
            .ok_or_else(|| EngineError::not_found("inviter rule", inviter_account_id))
    }

    /// Remove an inviter's override from both locations.
    pub async fn delete(
        &self,
        actor: &Actor,
        campaign_id: Uuid,
        inviter_account_id: &str,
    ) -> Result<()> {
        let current = self.writable(campaign_id).await?;
        let mut updated = self.next_version(&current);
        let primary = updated
            .eligibility_rules
            .inviter_overrides
            .remove(inviter_account_id)
            .is_some();
        let legacy = resolver::remove_legacy_override(&mut updated, inviter_account_id);
        if !primary && !legacy {
            return Err(EngineError::not_found("inviter rule", inviter_account_id));
        }

        let entry = with_details(
            self.audit.entry(
                actions::INVITER_RULE_DELETE,
                TargetType::InviterRule,
                rule_target(campaign_id, inviter_account_id),
                actor,
                "",
            ),
            json!({ "eligibilityRules": primary, "milestoneRules": legacy }),
        );
        self.campaigns.save(&updated, current.version, &entry).await?;

        info!(
            campaign_id = %campaign_id,
            inviter = %inviter_account_id,
            actor = %actor.id,
            "Inviter rule deleted"
        );
        Ok(())
    }

    async fn writable(&self, campaign_id: Uuid) -> Result<Campaign> {
        let campaign = self.campaigns.get(campaign_id).await?;
        if campaign.status.is_terminal() {
            return Err(EngineError::invalid_transition(
                "campaign",
                campaign.status,
                "edit inviter rules of",
            ));
        }
        Ok(campaign)
    }

    fn next_version(&self, campaign: &Campaign) -> Campaign {
        Campaign {
            updated_at: self.clock.now(),
            version: campaign.version + 1,
            ..campaign.clone()
        }
    }
}

fn rule_target(campaign_id: Uuid, inviter_account_id: &str) -> String {
    format!("{}/{}", campaign_id, inviter_account_id)
}

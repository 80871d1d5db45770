//! Referral funnel records and the account directory.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::audit::AuditRecorder;
use super::lifecycle::CampaignLifecycleManager;
use crate::auth::Actor;
use crate::clock::Clock;
use crate::error::{EngineError, FieldErrors, Result};
use crate::interfaces::{EngineStore, ReferralStore, StorageError};
use crate::model::{actions, Account, Referral, TargetType};
use crate::validation::{validate_email, validate_reference};

/// Emails are compared case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct ReferralRegistry {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
    audit: AuditRecorder,
    campaigns: CampaignLifecycleManager,
}

impl ReferralRegistry {
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            audit: AuditRecorder::new(Arc::clone(&store), Arc::clone(&clock)),
            campaigns: CampaignLifecycleManager::new(Arc::clone(&store), Arc::clone(&clock)),
            store,
            clock,
        }
    }

    /// Record that an inviter invited someone under a campaign.
    pub async fn record_invite(
        &self,
        actor: &Actor,
        campaign_id: Uuid,
        inviter_account_id: &str,
        invitee_email: &str,
    ) -> Result<Referral> {
        let mut errors = FieldErrors::new();
        validate_reference("inviterAccountId", inviter_account_id, &mut errors);
        validate_email("inviteeEmail", invitee_email, &mut errors);
        errors.into_result()?;

        let campaign = self.campaigns.get(campaign_id).await?;
        if campaign.status.is_terminal() {
            return Err(EngineError::invalid_transition(
                "campaign",
                campaign.status,
                "invite into",
            ));
        }

        let referral = Referral {
            id: Uuid::new_v4(),
            campaign_id,
            inviter_account_id: inviter_account_id.to_string(),
            invitee_email: normalize_email(invitee_email),
            invitee_account_id: None,
            invited_at: self.clock.now(),
            signed_up_at: None,
            qualified_at: None,
        };
        let entry = self.audit.entry(
            actions::REFERRAL_INVITE,
            TargetType::Referral,
            referral.id,
            actor,
            "",
        );
        self.store.insert_referral(&referral, &entry).await?;

        info!(
            campaign_id = %campaign_id,
            referral_id = %referral.id,
            inviter = %inviter_account_id,
            actor = %actor.id,
            "Referral invite recorded"
        );
        Ok(referral)
    }

    /// Attach the invitee's new account to an invite.
    ///
    /// An account can be the invitee of only one referral, and a referral
    /// signs up once.
    pub async fn record_signup(
        &self,
        actor: &Actor,
        referral_id: Uuid,
        invitee_account_id: &str,
    ) -> Result<Referral> {
        let mut errors = FieldErrors::new();
        validate_reference("inviteeAccountId", invitee_account_id, &mut errors);
        errors.into_result()?;

        let referral = self.get(referral_id).await?;
        if referral.inviter_account_id == invitee_account_id {
            return Err(FieldErrors::single("inviteeAccountId", "must differ from the inviter").into());
        }
        if let Some(existing) = self.store.find_referral_by_invitee(invitee_account_id).await? {
            return Err(EngineError::Conflict(format!(
                "account {} already signed up through referral {}",
                invitee_account_id, existing.id
            )));
        }

        let at = self.clock.now();
        let entry = self.audit.entry(
            actions::REFERRAL_SIGNUP,
            TargetType::Referral,
            referral_id,
            actor,
            "",
        );
        match self
            .store
            .mark_signed_up(referral_id, invitee_account_id, at, &entry)
            .await
        {
            Ok(()) => {}
            Err(StorageError::VersionConflict { .. }) => {
                return Err(EngineError::Conflict(format!(
                    "referral {} already signed up",
                    referral_id
                )))
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            campaign_id = %referral.campaign_id,
            referral_id = %referral_id,
            invitee = %invitee_account_id,
            actor = %actor.id,
            "Referral signup recorded"
        );
        Ok(Referral {
            invitee_account_id: Some(invitee_account_id.to_string()),
            signed_up_at: Some(at),
            ..referral
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Referral> {
        self.store
            .get_referral(id)
            .await?
            .ok_or_else(|| EngineError::not_found("referral", id))
    }

    /// Register or refresh an account mirrored from the accounts service.
    pub async fn register_account(
        &self,
        actor: &Actor,
        account_id: &str,
        email: &str,
    ) -> Result<Account> {
        let mut errors = FieldErrors::new();
        validate_reference("accountId", account_id, &mut errors);
        validate_email("email", email, &mut errors);
        errors.into_result()?;

        let account = match self.store.get_account(account_id).await? {
            Some(existing) => Account {
                email: normalize_email(email),
                ..existing
            },
            None => Account {
                account_id: account_id.to_string(),
                email: normalize_email(email),
                registered_at: self.clock.now(),
            },
        };
        let entry = self.audit.entry(
            actions::ACCOUNT_REGISTER,
            TargetType::Account,
            account_id,
            actor,
            "",
        );
        self.store.upsert_account(&account, &entry).await?;

        info!(account_id = %account_id, actor = %actor.id, "Account registered");
        Ok(account)
    }
}

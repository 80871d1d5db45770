//! Referral relationships and the account directory used for lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An invitation from an inviter under a campaign.
///
/// Moves through invited -> signed up -> qualified; qualification is set
/// when the first reward for the pair is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub inviter_account_id: String,
    pub invitee_email: String,
    pub invitee_account_id: Option<String>,
    pub invited_at: DateTime<Utc>,
    pub signed_up_at: Option<DateTime<Utc>>,
    pub qualified_at: Option<DateTime<Utc>>,
}

/// Account known to the engine, mirrored from the accounts service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

//! Actor identity and permission checks.
//!
//! Authentication happens outside the engine; callers hand in the resolved
//! actor and every lifecycle or moderation entry point checks it here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Moderator,
    Analyst,
    /// Service identity of the transaction pipeline.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadCampaigns,
    ManageCampaigns,
    ModerateRewards,
    IssueRewards,
    ManageReferrals,
    ViewReports,
}

impl Permission {
    fn granted_to(&self) -> &'static [Role] {
        match self {
            Permission::ReadCampaigns => &[Role::Admin, Role::Moderator, Role::Analyst, Role::System],
            Permission::ManageCampaigns => &[Role::Admin],
            Permission::ModerateRewards => &[Role::Admin, Role::Moderator],
            Permission::IssueRewards => &[Role::Admin, Role::System],
            Permission::ManageReferrals => &[Role::Admin, Role::System],
            Permission::ViewReports => &[Role::Admin, Role::Moderator, Role::Analyst, Role::System],
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadCampaigns => "read campaigns",
            Permission::ManageCampaigns => "manage campaigns",
            Permission::ModerateRewards => "moderate rewards",
            Permission::IssueRewards => "issue rewards",
            Permission::ManageReferrals => "manage referrals",
            Permission::ViewReports => "view reports",
        }
    }
}

/// An authenticated caller. The id is written to every audit entry it causes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub roles: BTreeSet<Role>,
}

impl Actor {
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id: id.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, [Role::Admin])
    }

    pub fn moderator(id: impl Into<String>) -> Self {
        Self::new(id, [Role::Moderator])
    }

    pub fn analyst(id: impl Into<String>) -> Self {
        Self::new(id, [Role::Analyst])
    }

    pub fn system(id: impl Into<String>) -> Self {
        Self::new(id, [Role::System])
    }

    /// Fails unless the actor is identified and holds a role granting `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::Authorization(
                "unauthenticated actor".to_string(),
            ));
        }
        if permission
            .granted_to()
            .iter()
            .any(|role| self.roles.contains(role))
        {
            Ok(())
        } else {
            Err(EngineError::Authorization(format!(
                "{} may not {}",
                self.id,
                permission.as_str()
            )))
        }
    }
}

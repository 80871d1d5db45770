//! Abstract interfaces for the engine's persistence.
//!
//! These traits define the contracts for:
//! - Campaign storage (configuration and lifecycle status)
//! - Reward storage (ledger rows and their moderation state)
//! - Audit storage (append-only trail)
//! - Referral storage (invitations and the account directory)
//!
//! Every mutating call takes the audit entry describing it and must commit
//! both together or neither.

pub mod audit_store;
pub mod campaign_store;
pub mod referral_store;
pub mod reward_store;

pub use audit_store::AuditStore;
pub use campaign_store::CampaignStore;
pub use referral_store::{ReferralQuery, ReferralStore};
pub use reward_store::{RewardCreation, RewardInsert, RewardQuery, RewardStore};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Version conflict on {entity} {id}: expected version {expected}")]
    VersionConflict {
        entity: &'static str,
        id: String,
        expected: u32,
    },

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Audit write failed: {0}")]
    AuditWrite(String),

    #[error("Invalid stored value in {column}: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Full persistence surface the engine runs on.
pub trait EngineStore: CampaignStore + RewardStore + AuditStore + ReferralStore {}

impl<T> EngineStore for T where T: CampaignStore + RewardStore + AuditStore + ReferralStore {}

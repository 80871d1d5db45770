//! Domain entities for the referral engine.

pub mod audit;
pub mod campaign;
pub mod page;
pub mod referral;
pub mod reward;
pub mod rule;

pub use audit::{actions, AuditLogEntry, TargetType};
pub use campaign::{Campaign, CampaignSpec, CampaignStatus, EligibilityRules, LifecycleAction};
pub use page::{Page, PageRequest};
pub use referral::{Account, Referral};
pub use reward::{
    InviterBalance, ModerationAction, NoRewardReason, QualifyingTransaction, Reward,
    RewardOutcome, RewardStatus, TRANSITIONS,
};
pub use rule::{RewardMode, RewardRule, RuleSource};

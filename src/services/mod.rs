//! Engine services.
//!
//! Each service owns one concern and talks to persistence only through
//! [`EngineStore`](crate::interfaces::EngineStore). The facade wires them
//! around a shared store and clock.

pub mod accounts;
pub mod analytics;
pub mod audit;
pub mod calculator;
pub mod eligibility;
pub mod issuance;
pub mod ledger;
pub mod lifecycle;
pub mod referrals;
pub mod resolver;
pub mod rules;

pub use accounts::{AccountInspector, ReferralSummary};
pub use analytics::{AnalyticsAggregator, AnalyticsSummary, CampaignBreakdown, FunnelTotals};
pub use audit::AuditRecorder;
pub use eligibility::EligibilityTracker;
pub use issuance::RewardIssuer;
pub use ledger::RewardLedger;
pub use lifecycle::CampaignLifecycleManager;
pub use referrals::ReferralRegistry;
pub use resolver::{InviterRuleEntry, ResolvedRule};
pub use rules::InviterRuleAdmin;

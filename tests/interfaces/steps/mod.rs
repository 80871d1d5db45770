//! Cucumber step definitions for interface tests.

pub mod campaign_flow;
pub mod moderation;

use chrono::Duration;
use referral_engine::model::{CampaignSpec, EligibilityRules, RewardRule};
use referral_engine::ErrorKind;

use crate::backend::scenario_now;

/// Error kind named the way scenarios spell it.
pub fn parse_kind(name: &str) -> ErrorKind {
    match name {
        "VALIDATION" => ErrorKind::Validation,
        "NOT_FOUND" => ErrorKind::NotFound,
        "INVALID_STATE_TRANSITION" => ErrorKind::InvalidStateTransition,
        "CONFLICT" => ErrorKind::Conflict,
        "AUTHORIZATION" => ErrorKind::Authorization,
        "INTERNAL" => ErrorKind::Internal,
        other => panic!("Unknown error kind: {}", other),
    }
}

/// A campaign running a month around the scenario clock.
pub fn campaign_spec(defaults: RewardRule, hold_for_review: bool) -> CampaignSpec {
    CampaignSpec {
        name: "Autumn referrals".to_string(),
        description: String::new(),
        starts_at: Some(scenario_now() - Duration::days(1)),
        ends_at: Some(scenario_now() + Duration::days(30)),
        target_actions: 3,
        base_reward_points: 20,
        activation_reward_points: 0,
        passport_bonus_points: 0,
        mark_suspicious_as_pending: hold_for_review,
        eligibility_rules: EligibilityRules {
            defaults,
            inviter_overrides: Default::default(),
        },
        milestone_rules: None,
    }
}

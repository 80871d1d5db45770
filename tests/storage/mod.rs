//! Shared storage integration tests.
//!
//! Tests the CampaignStore, RewardStore, AuditStore and ReferralStore
//! contracts against all implementations. Each implementation module imports
//! these test functions and runs them.

#![allow(dead_code)]

pub mod audit_store_tests;
pub mod campaign_store_tests;
pub mod referral_store_tests;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use referral_engine::model::{
    AuditLogEntry, Campaign, CampaignStatus, EligibilityRules, Referral, Reward, RewardRule,
    RewardStatus, TargetType,
};

/// Fixed base time; whole seconds so every backend round-trips it exactly.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

pub fn make_audit(action: &str, target_type: TargetType, target_id: impl ToString) -> AuditLogEntry {
    AuditLogEntry {
        id: Uuid::new_v4(),
        action: action.to_string(),
        target_type,
        target_id: target_id.to_string(),
        actor: "contract-test".to_string(),
        reason: String::new(),
        details: None,
        created_at: t0(),
    }
}

pub fn make_campaign(name: &str, status: CampaignStatus, created_at: DateTime<Utc>) -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: format!("{} description", name),
        status,
        starts_at: Some(t0()),
        ends_at: Some(t0() + Duration::days(30)),
        target_actions: 3,
        base_reward_points: 20,
        activation_reward_points: 0,
        passport_bonus_points: 0,
        mark_suspicious_as_pending: false,
        eligibility_rules: EligibilityRules {
            defaults: RewardRule::fixed(20, 3),
            inviter_overrides: Default::default(),
        },
        milestone_rules: Default::default(),
        created_at,
        updated_at: created_at,
        version: 1,
    }
}

pub fn make_reward(campaign_id: Uuid, inviter: &str, invitee: &str, tx: &str) -> Reward {
    Reward {
        id: Uuid::new_v4(),
        campaign_id,
        inviter_account_id: inviter.to_string(),
        invitee_account_id: invitee.to_string(),
        transaction_reference: tx.to_string(),
        points: Decimal::new(2000, 2),
        status: RewardStatus::Approved,
        flagged: false,
        created_at: t0(),
        moderated_at: None,
        moderated_by: None,
        reason: None,
        reissued_from: None,
        version: 1,
    }
}

pub fn make_referral(campaign_id: Uuid, inviter: &str, email: &str) -> Referral {
    Referral {
        id: Uuid::new_v4(),
        campaign_id,
        inviter_account_id: inviter.to_string(),
        invitee_email: email.to_string(),
        invitee_account_id: None,
        invited_at: t0(),
        signed_up_at: None,
        qualified_at: None,
    }
}

/// Generate one `#[tokio::test]` per store contract test. `$fresh` is an
/// async fn returning a new, empty store.
#[macro_export]
macro_rules! store_contract_tests {
    (@each $fresh:path; $($module:ident :: $test:ident),* $(,)?) => {
        $(
            #[tokio::test]
            async fn $test() {
                let store = $fresh().await;
                $crate::storage::$module::$test(&store).await;
            }
        )*
    };
    ($fresh:path) => {
        $crate::store_contract_tests!(@each $fresh;
            campaign_store_tests::test_insert_and_get_round_trip,
            campaign_store_tests::test_get_missing_is_none,
            campaign_store_tests::test_campaign_versioned_update,
            campaign_store_tests::test_campaign_update_missing,
            campaign_store_tests::test_list_filters_and_pages,
            campaign_store_tests::test_insert_writes_audit,
            reward_store_tests::test_create_then_duplicate,
            reward_store_tests::test_find_by_reference,
            reward_store_tests::test_same_reference_other_pair_is_independent,
            reward_store_tests::test_cap_enforced,
            reward_store_tests::test_rejected_reward_frees_cap,
            reward_store_tests::test_reward_versioned_update,
            reward_store_tests::test_reward_update_missing,
            reward_store_tests::test_reissue_supersedes_original,
            reward_store_tests::test_review_queue,
            reward_store_tests::test_created_window_is_half_open,
            reward_store_tests::test_filters_by_inviter_and_status,
            reward_store_tests::test_create_marks_referral_qualified,
            audit_store_tests::test_append_round_trip,
            audit_store_tests::test_prefix_filter_newest_first,
            audit_store_tests::test_prefix_is_case_sensitive_and_literal,
            referral_store_tests::test_invite_and_signup,
            referral_store_tests::test_second_signup_conflicts,
            referral_store_tests::test_list_by_inviter_oldest_first,
            referral_store_tests::test_referrals_touching_window,
            referral_store_tests::test_account_upsert_and_lookup,
            referral_store_tests::test_email_is_unique,
        );
    };
}

//! ReferralStore interface tests: referrals and the account directory.

use chrono::Utc;
use uuid::Uuid;

use referral_engine::interfaces::{ReferralQuery, ReferralStore, StorageError};
use referral_engine::model::{Account, AuditLogEntry, PageRequest, TargetType};

use super::{at, make_audit, make_referral, t0};

fn invite_audit(id: Uuid) -> AuditLogEntry {
    make_audit("referral.invite", TargetType::Referral, id)
}

fn signup_audit(id: Uuid) -> AuditLogEntry {
    make_audit("referral.signup", TargetType::Referral, id)
}

fn account_audit(id: &str) -> AuditLogEntry {
    make_audit("account.register", TargetType::Account, id)
}

pub async fn test_invite_and_signup<S: ReferralStore>(store: &S) {
    let referral = make_referral(Uuid::new_v4(), "inv-A", "b@example.com");
    store
        .insert_referral(&referral, &invite_audit(referral.id))
        .await
        .unwrap();

    store
        .mark_signed_up(referral.id, "inv-B", at(5), &signup_audit(referral.id))
        .await
        .expect("first signup should succeed");

    let loaded = store.get_referral(referral.id).await.unwrap().unwrap();
    assert_eq!(loaded.invitee_account_id.as_deref(), Some("inv-B"));
    assert_eq!(loaded.signed_up_at, Some(at(5)));
    assert_eq!(loaded.qualified_at, None);

    let found = store.find_referral_by_invitee("inv-B").await.unwrap();
    assert_eq!(found, Some(loaded));
}

pub async fn test_second_signup_conflicts<S: ReferralStore>(store: &S) {
    let referral = make_referral(Uuid::new_v4(), "dup-A", "dup@example.com");
    store
        .insert_referral(&referral, &invite_audit(referral.id))
        .await
        .unwrap();
    store
        .mark_signed_up(referral.id, "dup-B", at(1), &signup_audit(referral.id))
        .await
        .unwrap();

    let err = store
        .mark_signed_up(referral.id, "dup-C", at(2), &signup_audit(referral.id))
        .await
        .expect_err("second signup must fail");
    assert!(matches!(err, StorageError::VersionConflict { .. }), "got {err:?}");

    let err = store
        .mark_signed_up(Uuid::new_v4(), "dup-C", at(2), &signup_audit(referral.id))
        .await
        .expect_err("unknown referral must fail");
    assert!(matches!(err, StorageError::NotFound { .. }), "got {err:?}");
}

pub async fn test_list_by_inviter_oldest_first<S: ReferralStore>(store: &S) {
    let campaign = Uuid::new_v4();
    let mut ids = Vec::new();
    for email in ["one@example.com", "two@example.com", "three@example.com"] {
        let referral = make_referral(campaign, "list-A", email);
        store
            .insert_referral(&referral, &invite_audit(referral.id))
            .await
            .unwrap();
        ids.push(referral.id);
    }
    let stranger = make_referral(campaign, "list-Z", "z@example.com");
    store
        .insert_referral(&stranger, &invite_audit(stranger.id))
        .await
        .unwrap();

    let page = store
        .list_referrals(&ReferralQuery::for_inviter("list-A"), PageRequest::new(0, 2))
        .await
        .unwrap();
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.items.iter().map(|r| r.id).collect::<Vec<_>>(), ids[..2].to_vec());
}

pub async fn test_referrals_touching_window<S: ReferralStore>(store: &S) {
    let campaign = Uuid::new_v4();
    let mut early = make_referral(campaign, "win-A", "early@example.com");
    early.invited_at = t0() - chrono::Duration::days(3);
    let mut signed_in_window = make_referral(campaign, "win-A", "mid@example.com");
    signed_in_window.invited_at = t0() - chrono::Duration::days(2);
    let mut late = make_referral(campaign, "win-A", "late@example.com");
    late.invited_at = at(600);

    for referral in [&early, &signed_in_window, &late] {
        store
            .insert_referral(referral, &invite_audit(referral.id))
            .await
            .unwrap();
    }
    store
        .mark_signed_up(signed_in_window.id, "win-B", at(30), &signup_audit(signed_in_window.id))
        .await
        .unwrap();

    let touching = store.referrals_touching(at(0), at(600)).await.unwrap();
    let ids: Vec<Uuid> = touching
        .iter()
        .filter(|r| r.campaign_id == campaign)
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![signed_in_window.id]);
}

pub async fn test_account_upsert_and_lookup<S: ReferralStore>(store: &S) {
    let account = Account {
        account_id: "acct-1".into(),
        email: "owner@example.com".into(),
        registered_at: t0(),
    };
    store
        .upsert_account(&account, &account_audit("acct-1"))
        .await
        .unwrap();

    let moved = Account {
        email: "new-owner@example.com".into(),
        ..account.clone()
    };
    store
        .upsert_account(&moved, &account_audit("acct-1"))
        .await
        .expect("email change should succeed");

    assert_eq!(store.get_account("acct-1").await.unwrap(), Some(moved.clone()));
    assert_eq!(
        store
            .find_account_by_email("new-owner@example.com")
            .await
            .unwrap(),
        Some(moved)
    );
    assert!(store
        .find_account_by_email("owner@example.com")
        .await
        .unwrap()
        .is_none());
}

pub async fn test_email_is_unique<S: ReferralStore>(store: &S) {
    let first = Account {
        account_id: "uniq-1".into(),
        email: "shared@example.com".into(),
        registered_at: Utc::now(),
    };
    store
        .upsert_account(&first, &account_audit("uniq-1"))
        .await
        .unwrap();

    let second = Account {
        account_id: "uniq-2".into(),
        ..first.clone()
    };
    let err = store
        .upsert_account(&second, &account_audit("uniq-2"))
        .await
        .expect_err("email already owned");
    assert!(matches!(err, StorageError::DuplicateKey(_)), "got {err:?}");
    assert!(store.get_account("uniq-2").await.unwrap().is_none());
}

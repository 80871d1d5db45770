//! AuditStore interface tests.

use serde_json::json;

use referral_engine::interfaces::AuditStore;
use referral_engine::model::{PageRequest, TargetType};

use super::make_audit;

pub async fn test_append_round_trip<S: AuditStore>(store: &S) {
    let mut entry = make_audit("reward.recompute", TargetType::Reward, "r-1");
    entry.reason = "fee correction".into();
    entry.details = Some(json!({ "previousPoints": "20.00", "newPoints": "15.50" }));
    store.append_audit(&entry).await.expect("append should succeed");

    let page = store
        .list_audit(Some("reward.recompute"), PageRequest::new(0, 10))
        .await
        .unwrap();
    assert_eq!(page.items, vec![entry]);
}

/// Run against a fresh store.
pub async fn test_prefix_filter_newest_first<S: AuditStore>(store: &S) {
    let actions = [
        "campaign.create",
        "reward.create",
        "campaign.activate",
        "reward.approve",
        "referral.invite",
    ];
    for action in actions {
        store
            .append_audit(&make_audit(action, TargetType::Campaign, action))
            .await
            .unwrap();
    }

    let campaign = store
        .list_audit(Some("campaign."), PageRequest::new(0, 10))
        .await
        .unwrap();
    let names: Vec<&str> = campaign.items.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(names, vec!["campaign.activate", "campaign.create"]);

    let everything = store
        .list_audit(None, PageRequest::new(0, 2))
        .await
        .unwrap();
    assert_eq!(everything.total_elements, 5);
    assert_eq!(everything.total_pages, 3);
    assert_eq!(everything.items[0].action, "referral.invite");

    let none = store
        .list_audit(Some("account."), PageRequest::new(0, 10))
        .await
        .unwrap();
    assert!(none.items.is_empty());
    assert_eq!(none.total_elements, 0);
}

/// Prefixes match literally: no case folding, no wildcards.
pub async fn test_prefix_is_case_sensitive_and_literal<S: AuditStore>(store: &S) {
    for action in ["reward.approve", "inviter_rule.update", "inviterXrule.update"] {
        store
            .append_audit(&make_audit(action, TargetType::Reward, action))
            .await
            .unwrap();
    }

    for prefix in ["REWARD.", "reward_", "reward%"] {
        let page = store
            .list_audit(Some(prefix), PageRequest::new(0, 10))
            .await
            .unwrap();
        assert_eq!(page.total_elements, 0, "prefix {:?}", prefix);
    }

    let rewards = store
        .list_audit(Some("reward."), PageRequest::new(0, 10))
        .await
        .unwrap();
    assert_eq!(rewards.total_elements, 1);

    let underscored = store
        .list_audit(Some("inviter_rule."), PageRequest::new(0, 10))
        .await
        .unwrap();
    let names: Vec<&str> = underscored.items.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(names, vec!["inviter_rule.update"]);
}

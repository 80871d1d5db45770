//! CampaignStore interface tests.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::json;

use referral_engine::interfaces::{AuditStore, CampaignStore, StorageError};
use referral_engine::model::{CampaignStatus, PageRequest, RewardRule, TargetType};

use super::{at, make_audit, make_campaign};

pub async fn test_insert_and_get_round_trip<S: CampaignStore>(store: &S) {
    let mut campaign = make_campaign("round-trip", CampaignStatus::Draft, at(0));
    campaign.eligibility_rules.inviter_overrides.insert(
        "vip".into(),
        RewardRule::revenue_share(Decimal::from_str("12.5").unwrap(), 4),
    );
    campaign.milestone_rules = json!({ "tiers": [1, 5, 10] })
        .as_object()
        .cloned()
        .unwrap();

    store
        .insert_campaign(&campaign, &make_audit("campaign.create", TargetType::Campaign, campaign.id))
        .await
        .expect("insert should succeed");

    let loaded = store
        .get_campaign(campaign.id)
        .await
        .expect("get should succeed")
        .expect("campaign should exist");
    assert_eq!(loaded, campaign);
}

pub async fn test_get_missing_is_none<S: CampaignStore>(store: &S) {
    let loaded = store.get_campaign(uuid::Uuid::new_v4()).await.unwrap();
    assert!(loaded.is_none());
}

pub async fn test_campaign_versioned_update<S: CampaignStore>(store: &S) {
    let campaign = make_campaign("versioned", CampaignStatus::Draft, at(1));
    store
        .insert_campaign(&campaign, &make_audit("campaign.create", TargetType::Campaign, campaign.id))
        .await
        .unwrap();

    let mut active = campaign.clone();
    active.status = CampaignStatus::Active;
    active.version = 2;
    store
        .update_campaign(&active, 1, &make_audit("campaign.activate", TargetType::Campaign, campaign.id))
        .await
        .expect("update at current version should succeed");

    let mut stale = campaign.clone();
    stale.status = CampaignStatus::Archived;
    stale.version = 2;
    let err = store
        .update_campaign(&stale, 1, &make_audit("campaign.archive", TargetType::Campaign, campaign.id))
        .await
        .expect_err("stale version must fail");
    assert!(matches!(err, StorageError::VersionConflict { .. }), "got {err:?}");

    let loaded = store.get_campaign(campaign.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, CampaignStatus::Active);
    assert_eq!(loaded.version, 2);
}

pub async fn test_campaign_update_missing<S: CampaignStore>(store: &S) {
    let campaign = make_campaign("ghost", CampaignStatus::Draft, at(2));
    let err = store
        .update_campaign(&campaign, 1, &make_audit("campaign.update", TargetType::Campaign, campaign.id))
        .await
        .expect_err("missing campaign must fail");
    assert!(matches!(err, StorageError::NotFound { .. }), "got {err:?}");
}

/// Run against a fresh store: totals count every campaign.
pub async fn test_list_filters_and_pages<S: CampaignStore>(store: &S) {
    let names = ["list-a", "list-b", "list-c"];
    for (i, name) in names.iter().enumerate() {
        let status = if i == 1 {
            CampaignStatus::Paused
        } else {
            CampaignStatus::Draft
        };
        let campaign = make_campaign(name, status, at(10 + i as i64));
        store
            .insert_campaign(&campaign, &make_audit("campaign.create", TargetType::Campaign, campaign.id))
            .await
            .unwrap();
    }

    let drafts = store
        .list_campaigns(Some(CampaignStatus::Draft), PageRequest::new(0, 10))
        .await
        .unwrap();
    let draft_names: Vec<&str> = drafts.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(draft_names, vec!["list-c", "list-a"], "newest first");

    let second_page = store
        .list_campaigns(None, PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(second_page.total_elements, 3);
    assert_eq!(second_page.total_pages, 2);
    assert_eq!(second_page.items.len(), 1);
    assert_eq!(second_page.items[0].name, "list-a");

    assert_eq!(store.all_campaigns().await.unwrap().len(), 3);
}

pub async fn test_insert_writes_audit<S: CampaignStore + AuditStore>(store: &S) {
    let campaign = make_campaign("audited", CampaignStatus::Draft, at(20));
    let entry = make_audit("campaign.create", TargetType::Campaign, campaign.id);
    store.insert_campaign(&campaign, &entry).await.unwrap();

    let trail = store
        .list_audit(Some("campaign."), PageRequest::new(0, 100))
        .await
        .unwrap();
    assert!(trail.items.iter().any(|e| e.id == entry.id));
}

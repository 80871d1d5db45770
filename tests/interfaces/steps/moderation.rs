//! Reward moderation step definitions.

use std::str::FromStr;

use cucumber::{given, then, when, World};
use rust_decimal::Decimal;
use uuid::Uuid;

use referral_engine::model::{QualifyingTransaction, Reward, RewardOutcome, RewardRule, RewardStatus};
use referral_engine::{Actor, EngineError};

use super::{campaign_spec, parse_kind};
use crate::backend::{scenario_now, EngineContext, StorageBackend};

/// Test context for moderation scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct ModerationWorld {
    backend: StorageBackend,
    context: Option<EngineContext>,
    admin: Actor,
    moderator: Actor,
    pipeline: Actor,
    campaign_id: Option<Uuid>,
    reward_id: Option<Uuid>,
    replacement_id: Option<Uuid>,
    last_error: Option<EngineError>,
}

impl ModerationWorld {
    fn new() -> Self {
        Self {
            backend: StorageBackend::from_env(),
            context: None,
            admin: Actor::admin("ops"),
            moderator: Actor::moderator("moderator-1"),
            pipeline: Actor::system("tx-pipeline"),
            campaign_id: None,
            reward_id: None,
            replacement_id: None,
            last_error: None,
        }
    }

    fn ctx(&self) -> &EngineContext {
        self.context
            .as_ref()
            .expect("Engine context not initialized")
    }

    fn reward_id(&self) -> Uuid {
        self.reward_id.expect("No reward created")
    }

    async fn reward(&self, id: Uuid) -> Reward {
        self.ctx()
            .engine
            .get_reward(&self.admin, id)
            .await
            .expect("Reward should load")
    }

    async fn moderate(&self, action: &str, reason: &str) -> Result<Reward, EngineError> {
        let engine = &self.ctx().engine;
        let id = self.reward_id();
        match action {
            "approve" => engine.approve_reward(&self.moderator, id, reason).await,
            "reject" => engine.reject_reward(&self.moderator, id, reason).await,
            "reverse" => engine.reverse_reward(&self.moderator, id, reason).await,
            "reissue" => engine.reissue_reward(&self.moderator, id, reason).await,
            other => panic!("Unknown moderation action: {}", other),
        }
    }
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("Invalid decimal")
}

// --- Background ---

#[given("a referral engine backend")]
async fn given_engine_backend(world: &mut ModerationWorld) {
    println!("Using backend: {}", world.backend.name());
    world.context = Some(EngineContext::new(world.backend).await);
}

#[given("an active campaign that holds new rewards for review")]
async fn given_review_campaign(world: &mut ModerationWorld) {
    let engine = &world.ctx().engine;
    let campaign = engine
        .create_campaign(&world.admin, &campaign_spec(RewardRule::fixed(20, 5), true))
        .await
        .expect("Campaign should be created");
    engine
        .activate_campaign(&world.admin, campaign.id)
        .await
        .expect("Campaign should activate");
    world.campaign_id = Some(campaign.id);
}

#[given(expr = "inviter {string} referred invitee {string}")]
async fn given_referral(world: &mut ModerationWorld, inviter: String, invitee: String) {
    let engine = &world.ctx().engine;
    let campaign_id = world.campaign_id.expect("No campaign");
    let email = format!("{}@example.com", invitee.to_lowercase());
    let referral = engine
        .record_invite(&world.pipeline, campaign_id, &inviter, &email)
        .await
        .expect("Invite should be recorded");
    engine
        .record_signup(&world.pipeline, referral.id, &invitee)
        .await
        .expect("Signup should be recorded");
}

// --- Given steps ---

#[given(expr = "a reward for transaction {string}")]
async fn given_reward(world: &mut ModerationWorld, reference: String) {
    let tx = QualifyingTransaction {
        transaction_reference: reference,
        invitee_account_id: "B".to_string(),
        amount: dec("250"),
        internal_fee: dec("2.50"),
        commission: Decimal::ZERO,
        other_fees: Decimal::ZERO,
        settlement_net: None,
        occurred_at: scenario_now(),
        suspicious: false,
    };
    let outcome = world
        .ctx()
        .engine
        .process_transaction(&world.pipeline, &tx)
        .await
        .expect("Transaction should process");
    match outcome {
        RewardOutcome::Created(reward) => world.reward_id = Some(reward.id),
        other => panic!("Expected a new reward, got {:?}", other),
    }
}

#[given(expr = "the reward has been moved to {string}")]
async fn given_reward_moved(world: &mut ModerationWorld, status: String) {
    let steps: &[&str] = match status.as_str() {
        "PENDING" => &[],
        "APPROVED" => &["approve"],
        "REJECTED" => &["reject"],
        "REVERSED" => &["approve", "reverse"],
        other => panic!("Cannot set up status {}", other),
    };
    for action in steps {
        world
            .moderate(action, "scenario setup")
            .await
            .expect("Setup moderation should succeed");
    }
}

// --- When steps ---

#[when(regex = r#"^the moderator (approves|rejects|reverses|reissues) the reward with reason "([^"]*)"$"#)]
async fn when_moderate(world: &mut ModerationWorld, verb: String, reason: String) {
    let action = verb.strip_suffix('s').unwrap_or(&verb).to_string();
    match world.moderate(&action, &reason).await {
        Ok(reward) if action == "reissue" => world.replacement_id = Some(reward.id),
        Ok(_) => {}
        Err(e) => world.last_error = Some(e),
    }
}

#[when(expr = "the moderator tries to {string} the reward")]
async fn when_try_moderate(world: &mut ModerationWorld, action: String) {
    world.last_error = world.moderate(&action, "scenario").await.err();
}

#[when(expr = "the moderator tries to {string} the reward without a reason")]
async fn when_moderate_without_reason(world: &mut ModerationWorld, action: String) {
    world.last_error = world.moderate(&action, "   ").await.err();
}

#[when(expr = "the moderator recomputes the reward to {string} points")]
async fn when_recompute(world: &mut ModerationWorld, points: String) {
    let result = world
        .ctx()
        .engine
        .recompute_reward(&world.moderator, world.reward_id(), dec(&points), "fee correction")
        .await;
    world.last_error = result.err();
}

// --- Then steps ---

#[then(expr = "the reward status is {string}")]
async fn then_reward_status(world: &mut ModerationWorld, status: String) {
    let reward = world.reward(world.reward_id()).await;
    assert_eq!(reward.status.as_str(), status);
}

#[then(expr = "the reward is worth {string} points")]
async fn then_reward_points(world: &mut ModerationWorld, points: String) {
    let reward = world.reward(world.reward_id()).await;
    assert_eq!(reward.points.to_string(), points);
}

#[then(expr = "the replacement status is {string}")]
async fn then_replacement_status(world: &mut ModerationWorld, status: String) {
    let id = world.replacement_id.expect("No replacement reward");
    let replacement = world.reward(id).await;
    assert_eq!(replacement.status.as_str(), status);
    assert_eq!(replacement.reissued_from, world.reward_id);
    assert_ne!(replacement.id, world.reward_id());
}

#[then(expr = "the request fails with {string}")]
async fn then_request_fails(world: &mut ModerationWorld, kind: String) {
    let err = world.last_error.as_ref().expect("Expected an error");
    assert_eq!(err.kind(), parse_kind(&kind), "got {}", err);
}

#[then("the request succeeds")]
async fn then_request_succeeds(world: &mut ModerationWorld) {
    if let Some(err) = &world.last_error {
        panic!("Expected success, got {}", err);
    }
}

#[then(expr = "the audit trail has {int} {string} entry")]
#[then(expr = "the audit trail has {int} {string} entries")]
async fn then_audit_entries(world: &mut ModerationWorld, count: usize, action: String) {
    let engine = &world.ctx().engine;
    let trail = engine
        .list_audit(&world.admin, Some(&action), engine.page(0))
        .await
        .expect("Audit should list");
    let matching = trail.items.iter().filter(|e| e.action == action).count();
    assert_eq!(matching, count);
    for entry in trail.items.iter().filter(|e| e.action == action) {
        assert_eq!(entry.actor, world.moderator.id);
    }
}

#[then(expr = "the stored status stays {string}")]
async fn then_stored_status(world: &mut ModerationWorld, status: String) {
    let reward = world.reward(world.reward_id()).await;
    let expected = RewardStatus::parse(&status).expect("Unknown status");
    assert_eq!(reward.status, expected);
}

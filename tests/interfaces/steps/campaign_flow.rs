//! Campaign reward flow step definitions: caps, idempotency, rule
//! resolution and campaign liveness.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::Duration;
use cucumber::{given, then, when, World};
use rust_decimal::Decimal;
use uuid::Uuid;

use referral_engine::interfaces::{RewardQuery, RewardStore};
use referral_engine::model::{QualifyingTransaction, RewardOutcome, RewardRule, RewardStatus};
use referral_engine::{Actor, EngineError};

use super::{campaign_spec, parse_kind};
use crate::backend::{scenario_now, EngineContext, StorageBackend};

/// Test context for campaign reward scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct CampaignFlowWorld {
    backend: StorageBackend,
    context: Option<EngineContext>,
    admin: Actor,
    moderator: Actor,
    pipeline: Actor,
    campaign_id: Option<Uuid>,
    outcomes: HashMap<String, RewardOutcome>,
    last_outcome: Option<RewardOutcome>,
    next_tx: u32,
    last_error: Option<EngineError>,
}

impl CampaignFlowWorld {
    fn new() -> Self {
        Self {
            backend: StorageBackend::from_env(),
            context: None,
            admin: Actor::admin("ops"),
            moderator: Actor::moderator("moderator-1"),
            pipeline: Actor::system("tx-pipeline"),
            campaign_id: None,
            outcomes: HashMap::new(),
            last_outcome: None,
            next_tx: 0,
            last_error: None,
        }
    }

    fn ctx(&self) -> &EngineContext {
        self.context
            .as_ref()
            .expect("Engine context not initialized")
    }

    fn campaign_id(&self) -> Uuid {
        self.campaign_id.expect("No campaign")
    }

    fn reward_for(&self, reference: &str) -> Uuid {
        self.outcomes
            .get(reference)
            .and_then(RewardOutcome::reward)
            .map(|reward| reward.id)
            .expect("Transaction earned no reward")
    }

    async fn launch(&mut self, defaults: RewardRule) {
        let engine = &self.ctx().engine;
        let campaign = engine
            .create_campaign(&self.admin, &campaign_spec(defaults, false))
            .await
            .expect("Campaign should be created");
        engine
            .activate_campaign(&self.admin, campaign.id)
            .await
            .expect("Campaign should activate");
        self.campaign_id = Some(campaign.id);
    }

    async fn transact(&mut self, reference: &str, invitee: &str, fee: Decimal) {
        let tx = QualifyingTransaction {
            transaction_reference: reference.to_string(),
            invitee_account_id: invitee.to_string(),
            amount: Decimal::from(1000),
            internal_fee: fee,
            commission: Decimal::ZERO,
            other_fees: Decimal::ZERO,
            settlement_net: None,
            occurred_at: self.ctx().now(),
            suspicious: false,
        };
        match self
            .ctx()
            .engine
            .process_transaction(&self.pipeline, &tx)
            .await
        {
            Ok(outcome) => {
                self.outcomes.insert(reference.to_string(), outcome.clone());
                self.last_outcome = Some(outcome);
            }
            Err(e) => self.last_error = Some(e),
        }
    }
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("Invalid decimal")
}

fn reason_name(outcome: &RewardOutcome) -> Option<String> {
    match outcome {
        RewardOutcome::NoReward(reason) => serde_json::to_value(reason)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

// --- Background ---

#[given("a referral engine backend")]
async fn given_engine_backend(world: &mut CampaignFlowWorld) {
    println!("Using backend: {}", world.backend.name());
    world.context = Some(EngineContext::new(world.backend).await);
}

// --- Given steps ---

#[given(expr = "an active campaign paying {int} fixed points up to {int} transactions")]
async fn given_fixed_campaign(world: &mut CampaignFlowWorld, points: i64, max: i64) {
    world.launch(RewardRule::fixed(points, max)).await;
}

#[given(expr = "an active campaign paying {string} percent of revenue up to {int} transactions")]
async fn given_revenue_campaign(world: &mut CampaignFlowWorld, pct: String, max: i64) {
    world.launch(RewardRule::revenue_share(dec(&pct), max)).await;
}

#[given(expr = "inviter {string} referred invitee {string}")]
async fn given_referral(world: &mut CampaignFlowWorld, inviter: String, invitee: String) {
    let engine = &world.ctx().engine;
    let email = format!("{}@example.com", invitee.to_lowercase());
    let referral = engine
        .record_invite(&world.pipeline, world.campaign_id(), &inviter, &email)
        .await
        .expect("Invite should be recorded");
    engine
        .record_signup(&world.pipeline, referral.id, &invitee)
        .await
        .expect("Signup should be recorded");
}

#[given(expr = "inviter {string} has an override paying {string} percent of revenue up to {int} transactions")]
async fn given_override(world: &mut CampaignFlowWorld, inviter: String, pct: String, max: i64) {
    world
        .ctx()
        .engine
        .upsert_inviter_rule(
            &world.admin,
            world.campaign_id(),
            &inviter,
            RewardRule::revenue_share(dec(&pct), max),
        )
        .await
        .expect("Override should be stored");
}

#[given("the campaign is paused")]
async fn given_paused(world: &mut CampaignFlowWorld) {
    world
        .ctx()
        .engine
        .pause_campaign(&world.admin, world.campaign_id())
        .await
        .expect("Campaign should pause");
}

#[given("the campaign window has ended")]
async fn given_window_ended(world: &mut CampaignFlowWorld) {
    world
        .ctx()
        .clock
        .set(scenario_now() + Duration::days(31));
}

// --- When steps ---

#[when(expr = "invitee {string} completes transactions {string}")]
async fn when_transactions(world: &mut CampaignFlowWorld, invitee: String, references: String) {
    for reference in references.split(',').map(str::trim) {
        world.transact(reference, &invitee, Decimal::ONE).await;
    }
}

#[when(expr = "invitee {string} completes a transaction with fee {string}")]
async fn when_transaction_with_fee(world: &mut CampaignFlowWorld, invitee: String, fee: String) {
    world.next_tx += 1;
    let reference = format!("fee-tx-{}", world.next_tx);
    world.transact(&reference, &invitee, dec(&fee)).await;
}

#[when(expr = "the override for inviter {string} is removed")]
async fn when_override_removed(world: &mut CampaignFlowWorld, inviter: String) {
    world
        .ctx()
        .engine
        .delete_inviter_rule(&world.admin, world.campaign_id(), &inviter)
        .await
        .expect("Override should be removed");
}

#[when(expr = "the moderator reverses the reward for transaction {string} with reason {string}")]
async fn when_reverse(world: &mut CampaignFlowWorld, reference: String, reason: String) {
    let id = world.reward_for(&reference);
    if let Err(e) = world
        .ctx()
        .engine
        .reverse_reward(&world.moderator, id, &reason)
        .await
    {
        world.last_error = Some(e);
    }
}

// --- Then steps ---

#[then(expr = "the reward for transaction {string} is {string}")]
async fn then_reward_for_status(world: &mut CampaignFlowWorld, reference: String, status: String) {
    let id = world.reward_for(&reference);
    let reward = world
        .ctx()
        .engine
        .get_reward(&world.admin, id)
        .await
        .expect("Reward should load");
    assert_eq!(reward.status.as_str(), status);
}

#[then(expr = "inviter {string} has {int} reward(s) of {string} points")]
async fn then_reward_count(world: &mut CampaignFlowWorld, inviter: String, count: usize, points: String) {
    let rewards = world
        .ctx()
        .store
        .find_rewards(&RewardQuery::for_inviter(inviter))
        .await
        .expect("Rewards should list");
    assert_eq!(rewards.len(), count);
    for reward in &rewards {
        assert_eq!(reward.points.to_string(), points);
        assert_eq!(reward.status, RewardStatus::Approved);
    }
}

#[then(expr = "transaction {string} earns nothing because {string}")]
async fn then_no_reward(world: &mut CampaignFlowWorld, reference: String, reason: String) {
    let outcome = world
        .outcomes
        .get(&reference)
        .expect("Transaction was not processed");
    assert_eq!(reason_name(outcome).as_deref(), Some(reason.as_str()), "got {:?}", outcome);
}

#[then(expr = "transaction {string} is a duplicate")]
async fn then_duplicate(world: &mut CampaignFlowWorld, reference: String) {
    let outcome = world
        .outcomes
        .get(&reference)
        .expect("Transaction was not processed");
    assert!(matches!(outcome, RewardOutcome::Duplicate(_)), "got {:?}", outcome);
}

#[then(expr = "the latest reward is worth {string} points")]
async fn then_latest_reward(world: &mut CampaignFlowWorld, points: String) {
    let outcome = world.last_outcome.as_ref().expect("No transaction processed");
    let reward = match outcome {
        RewardOutcome::Created(reward) => reward,
        other => panic!("Expected a new reward, got {:?}", other),
    };
    assert_eq!(reward.points.to_string(), points);
}

#[then(expr = "the latest transaction earns nothing because {string}")]
async fn then_latest_no_reward(world: &mut CampaignFlowWorld, reason: String) {
    let outcome = world.last_outcome.as_ref().expect("No transaction processed");
    assert_eq!(reason_name(outcome).as_deref(), Some(reason.as_str()), "got {:?}", outcome);
}

#[then("no transaction failed")]
async fn then_no_failure(world: &mut CampaignFlowWorld) {
    if let Some(err) = &world.last_error {
        panic!("Expected success, got {}", err);
    }
}

#[then(expr = "processing fails with {string}")]
async fn then_processing_fails(world: &mut CampaignFlowWorld, kind: String) {
    let err = world.last_error.as_ref().expect("Expected an error");
    assert_eq!(err.kind(), parse_kind(&kind), "got {}", err);
}

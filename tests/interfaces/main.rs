//! Interface tests for the referral engine using Cucumber.
//!
//! Scenarios drive the public facade end to end. Select a backend via
//! environment variable:
//!
//! ```bash
//! # In-memory store (default)
//! cargo test --test interfaces
//!
//! # SQLite file in a temp dir
//! STORAGE_BACKEND=sqlite cargo test --test interfaces --features sqlite
//! ```

mod backend;
mod steps;

use cucumber::World;
use steps::campaign_flow::CampaignFlowWorld;
use steps::moderation::ModerationWorld;

#[tokio::main]
async fn main() {
    println!("\n=== Running Reward Moderation Interface Tests ===\n");
    ModerationWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/reward_moderation.feature")
        .await;

    println!("\n=== Running Campaign Reward Interface Tests ===\n");
    CampaignFlowWorld::cucumber()
        .fail_on_skipped()
        .run("tests/interfaces/features/campaign_rewards.feature")
        .await;
}

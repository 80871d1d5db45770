//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.
//! Every table carries an autoincrement `seq` so listings have a stable
//! insertion order independent of timestamp ties.

use sea_query::Iden;

/// Campaigns table schema.
#[derive(Iden, Clone, Copy)]
pub enum Campaigns {
    Table,
    Seq,
    Id,
    Name,
    Description,
    Status,
    StartsAt,
    EndsAt,
    TargetActions,
    BaseRewardPoints,
    ActivationRewardPoints,
    PassportBonusPoints,
    MarkSuspiciousAsPending,
    EligibilityRules,
    MilestoneRules,
    CreatedAt,
    UpdatedAt,
    Version,
}

/// Rewards table schema.
#[derive(Iden, Clone, Copy)]
pub enum Rewards {
    Table,
    Seq,
    Id,
    CampaignId,
    InviterAccountId,
    InviteeAccountId,
    TransactionReference,
    Points,
    Status,
    Flagged,
    CreatedAt,
    ModeratedAt,
    ModeratedBy,
    Reason,
    ReissuedFrom,
    Version,
}

/// Audit log table schema.
#[derive(Iden, Clone, Copy)]
pub enum AuditLog {
    Table,
    Seq,
    Id,
    Action,
    TargetType,
    TargetId,
    Actor,
    Reason,
    Details,
    CreatedAt,
}

/// Referrals table schema.
#[derive(Iden, Clone, Copy)]
pub enum Referrals {
    Table,
    Seq,
    Id,
    CampaignId,
    InviterAccountId,
    InviteeEmail,
    InviteeAccountId,
    InvitedAt,
    SignedUpAt,
    QualifiedAt,
}

/// Accounts table schema.
#[derive(Iden, Clone, Copy)]
pub enum Accounts {
    Table,
    AccountId,
    Email,
    RegisteredAt,
}

/// SQL for creating every table, one statement per entry.
pub const CREATE_TABLES: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS campaigns (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    starts_at TEXT,
    ends_at TEXT,
    target_actions INTEGER NOT NULL,
    base_reward_points INTEGER NOT NULL,
    activation_reward_points INTEGER NOT NULL,
    passport_bonus_points INTEGER NOT NULL,
    mark_suspicious_as_pending INTEGER NOT NULL,
    eligibility_rules TEXT NOT NULL,
    milestone_rules TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    version INTEGER NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status)",
    r#"
CREATE TABLE IF NOT EXISTS rewards (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    campaign_id TEXT NOT NULL,
    inviter_account_id TEXT NOT NULL,
    invitee_account_id TEXT NOT NULL,
    transaction_reference TEXT NOT NULL,
    points TEXT NOT NULL,
    status TEXT NOT NULL,
    flagged INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    moderated_at TEXT,
    moderated_by TEXT,
    reason TEXT,
    reissued_from TEXT,
    version INTEGER NOT NULL
)"#,
    r#"
CREATE UNIQUE INDEX IF NOT EXISTS ux_rewards_transaction
    ON rewards(campaign_id, inviter_account_id, invitee_account_id, transaction_reference)
    WHERE reissued_from IS NULL"#,
    "CREATE INDEX IF NOT EXISTS idx_rewards_pair ON rewards(campaign_id, inviter_account_id, invitee_account_id)",
    "CREATE INDEX IF NOT EXISTS idx_rewards_status ON rewards(status)",
    "CREATE INDEX IF NOT EXISTS idx_rewards_created_at ON rewards(created_at)",
    r#"
CREATE TABLE IF NOT EXISTS audit_log (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    action TEXT NOT NULL,
    target_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    actor TEXT NOT NULL,
    reason TEXT NOT NULL,
    details TEXT,
    created_at TEXT NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_audit_action ON audit_log(action)",
    r#"
CREATE TABLE IF NOT EXISTS referrals (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    campaign_id TEXT NOT NULL,
    inviter_account_id TEXT NOT NULL,
    invitee_email TEXT NOT NULL,
    invitee_account_id TEXT,
    invited_at TEXT NOT NULL,
    signed_up_at TEXT,
    qualified_at TEXT
)"#,
    "CREATE INDEX IF NOT EXISTS idx_referrals_inviter ON referrals(inviter_account_id)",
    "CREATE INDEX IF NOT EXISTS idx_referrals_invitee ON referrals(invitee_account_id)",
    r#"
CREATE TABLE IF NOT EXISTS accounts (
    account_id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    registered_at TEXT NOT NULL
)"#,
];

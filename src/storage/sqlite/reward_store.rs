//! SQLite RewardStore implementation.

use async_trait::async_trait;
use sea_query::{Asterisk, Cond, Expr, Func, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{
    begin_immediate, finish, fmt_opt_ts, fmt_ts, insert_audit, map_unique, parse_decimal,
    parse_opt_ts, parse_ts, parse_u32, parse_uuid, SqliteStore,
};
use crate::interfaces::{Result, RewardCreation, RewardInsert, RewardQuery, RewardStore, StorageError};
use crate::model::{AuditLogEntry, Page, PageRequest, Reward, RewardStatus};
use crate::storage::schema::{Referrals, Rewards};

/// Statuses that occupy a slot of the per-pair cap.
fn capped_statuses() -> Vec<&'static str> {
    RewardStatus::ALL
        .iter()
        .filter(|s| s.counts_toward_cap())
        .map(|s| s.as_str())
        .collect()
}

fn reward_from_row(row: &SqliteRow) -> Result<Reward> {
    let status: String = row.get("status");
    let reissued_from: Option<String> = row.get("reissued_from");

    Ok(Reward {
        id: parse_uuid("rewards.id", &row.get::<String, _>("id"))?,
        campaign_id: parse_uuid("rewards.campaign_id", &row.get::<String, _>("campaign_id"))?,
        inviter_account_id: row.get("inviter_account_id"),
        invitee_account_id: row.get("invitee_account_id"),
        transaction_reference: row.get("transaction_reference"),
        points: parse_decimal("rewards.points", &row.get::<String, _>("points"))?,
        status: RewardStatus::parse(&status).ok_or(StorageError::Corrupt {
            column: "rewards.status",
            value: status.clone(),
        })?,
        flagged: row.get("flagged"),
        created_at: parse_ts("rewards.created_at", &row.get::<String, _>("created_at"))?,
        moderated_at: parse_opt_ts("rewards.moderated_at", row.get("moderated_at"))?,
        moderated_by: row.get("moderated_by"),
        reason: row.get("reason"),
        reissued_from: reissued_from
            .as_deref()
            .map(|v| parse_uuid("rewards.reissued_from", v))
            .transpose()?,
        version: parse_u32("rewards.version", row.get("version"))?,
    })
}

/// Translate a query into a single SQL condition.
fn reward_condition(query: &RewardQuery) -> Cond {
    let mut cond = Cond::all();
    if let Some(id) = query.campaign_id {
        cond = cond.add(Expr::col(Rewards::CampaignId).eq(id.to_string()));
    }
    if let Some(inviter) = &query.inviter_account_id {
        cond = cond.add(Expr::col(Rewards::InviterAccountId).eq(inviter.as_str()));
    }
    if let Some(invitee) = &query.invitee_account_id {
        cond = cond.add(Expr::col(Rewards::InviteeAccountId).eq(invitee.as_str()));
    }
    if !query.statuses.is_empty() {
        cond = cond.add(
            Expr::col(Rewards::Status).is_in(query.statuses.iter().map(|s| s.as_str())),
        );
    }
    if let Some(from) = query.created_from {
        cond = cond.add(Expr::col(Rewards::CreatedAt).gte(fmt_ts(from)));
    }
    if let Some(to) = query.created_to {
        cond = cond.add(Expr::col(Rewards::CreatedAt).lt(fmt_ts(to)));
    }
    if let Some(include_flagged) = query.review_queue {
        let pending = Expr::col(Rewards::Status).eq(RewardStatus::Pending.as_str());
        cond = if include_flagged {
            cond.add(
                Cond::any().add(pending).add(
                    Cond::all()
                        .add(Expr::col(Rewards::Flagged).eq(true))
                        .add(Expr::col(Rewards::ModeratedAt).is_null()),
                ),
            )
        } else {
            cond.add(pending)
        };
    }
    cond
}

fn insert_statement(reward: &Reward) -> String {
    Query::insert()
        .into_table(Rewards::Table)
        .columns([
            Rewards::Id,
            Rewards::CampaignId,
            Rewards::InviterAccountId,
            Rewards::InviteeAccountId,
            Rewards::TransactionReference,
            Rewards::Points,
            Rewards::Status,
            Rewards::Flagged,
            Rewards::CreatedAt,
            Rewards::ModeratedAt,
            Rewards::ModeratedBy,
            Rewards::Reason,
            Rewards::ReissuedFrom,
            Rewards::Version,
        ])
        .values_panic([
            reward.id.to_string().into(),
            reward.campaign_id.to_string().into(),
            reward.inviter_account_id.clone().into(),
            reward.invitee_account_id.clone().into(),
            reward.transaction_reference.clone().into(),
            reward.points.to_string().into(),
            reward.status.as_str().into(),
            reward.flagged.into(),
            fmt_ts(reward.created_at).into(),
            fmt_opt_ts(reward.moderated_at).into(),
            reward.moderated_by.clone().into(),
            reward.reason.clone().into(),
            reward.reissued_from.map(|id| id.to_string()).into(),
            i64::from(reward.version).into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// Rows of one campaign/inviter/invitee triple.
fn triple_condition(campaign_id: Uuid, inviter_account_id: &str, invitee_account_id: &str) -> Cond {
    Cond::all()
        .add(Expr::col(Rewards::CampaignId).eq(campaign_id.to_string()))
        .add(Expr::col(Rewards::InviterAccountId).eq(inviter_account_id))
        .add(Expr::col(Rewards::InviteeAccountId).eq(invitee_account_id))
}

/// Latest row for a transaction reference; a reissue replacement wins over its original.
fn by_reference_statement(
    campaign_id: Uuid,
    inviter_account_id: &str,
    invitee_account_id: &str,
    transaction_reference: &str,
) -> String {
    Query::select()
        .column(Asterisk)
        .from(Rewards::Table)
        .cond_where(
            triple_condition(campaign_id, inviter_account_id, invitee_account_id)
                .add(Expr::col(Rewards::TransactionReference).eq(transaction_reference)),
        )
        .order_by(Rewards::Seq, Order::Desc)
        .limit(1)
        .to_string(SqliteQueryBuilder)
}

impl SqliteStore {
    async fn write_reward_creation(
        conn: &mut SqliteConnection,
        creation: &RewardCreation,
    ) -> Result<RewardInsert> {
        let reward = &creation.reward;
        let triple = triple_condition(
            reward.campaign_id,
            &reward.inviter_account_id,
            &reward.invitee_account_id,
        );

        let existing = by_reference_statement(
            reward.campaign_id,
            &reward.inviter_account_id,
            &reward.invitee_account_id,
            &reward.transaction_reference,
        );
        if let Some(row) = sqlx::query(&existing).fetch_optional(&mut *conn).await? {
            return Ok(RewardInsert::Duplicate(reward_from_row(&row)?));
        }

        let count = Query::select()
            .expr(Func::count(Expr::col(Rewards::Seq)))
            .from(Rewards::Table)
            .cond_where(triple.add(Expr::col(Rewards::Status).is_in(capped_statuses())))
            .to_string(SqliteQueryBuilder);
        let used: i64 = sqlx::query(&count).fetch_one(&mut *conn).await?.get(0);
        let used = parse_u32("rewards.count", used)?;
        if used >= creation.max_transactions {
            return Ok(RewardInsert::CapReached { used });
        }

        sqlx::query(&insert_statement(reward))
            .execute(&mut *conn)
            .await
            .map_err(|e| map_unique(e, reward.transaction_reference.clone()))?;

        let qualify = Query::update()
            .table(Referrals::Table)
            .values([(Referrals::QualifiedAt, fmt_ts(reward.created_at).into())])
            .and_where(Expr::col(Referrals::Id).eq(creation.referral_id.to_string()))
            .and_where(Expr::col(Referrals::QualifiedAt).is_null())
            .to_string(SqliteQueryBuilder);
        sqlx::query(&qualify).execute(&mut *conn).await?;

        insert_audit(conn, &creation.audit).await?;
        Ok(RewardInsert::Inserted(reward.clone()))
    }

    /// Versioned overwrite of one reward row, inside the caller's transaction.
    async fn write_reward_update(
        conn: &mut SqliteConnection,
        reward: &Reward,
        expected_version: u32,
    ) -> Result<()> {
        let query = Query::update()
            .table(Rewards::Table)
            .values([
                (Rewards::Points, reward.points.to_string().into()),
                (Rewards::Status, reward.status.as_str().into()),
                (Rewards::Flagged, reward.flagged.into()),
                (Rewards::ModeratedAt, fmt_opt_ts(reward.moderated_at).into()),
                (Rewards::ModeratedBy, reward.moderated_by.clone().into()),
                (Rewards::Reason, reward.reason.clone().into()),
                (Rewards::Version, i64::from(reward.version).into()),
            ])
            .and_where(Expr::col(Rewards::Id).eq(reward.id.to_string()))
            .and_where(Expr::col(Rewards::Version).eq(i64::from(expected_version)))
            .to_string(SqliteQueryBuilder);

        let updated = sqlx::query(&query).execute(&mut *conn).await?;
        if updated.rows_affected() > 0 {
            return Ok(());
        }

        let exists = Query::select()
            .column(Rewards::Id)
            .from(Rewards::Table)
            .and_where(Expr::col(Rewards::Id).eq(reward.id.to_string()))
            .to_string(SqliteQueryBuilder);
        match sqlx::query(&exists).fetch_optional(&mut *conn).await? {
            Some(_) => Err(StorageError::VersionConflict {
                entity: "reward",
                id: reward.id.to_string(),
                expected: expected_version,
            }),
            None => Err(StorageError::NotFound {
                entity: "reward",
                id: reward.id.to_string(),
            }),
        }
    }

    async fn write_reissue(
        conn: &mut SqliteConnection,
        original: &Reward,
        expected_version: u32,
        replacement: &Reward,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        Self::write_reward_update(conn, original, expected_version).await?;
        sqlx::query(&insert_statement(replacement))
            .execute(&mut *conn)
            .await
            .map_err(|e| map_unique(e, replacement.id.to_string()))?;
        insert_audit(conn, audit).await
    }
}

#[async_trait]
impl RewardStore for SqliteStore {
    async fn create_reward(&self, creation: &RewardCreation) -> Result<RewardInsert> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_reward_creation(&mut conn, creation).await;
        finish(&mut conn, result).await
    }

    async fn get_reward(&self, id: Uuid) -> Result<Option<Reward>> {
        let query = Query::select()
            .column(Asterisk)
            .from(Rewards::Table)
            .and_where(Expr::col(Rewards::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(reward_from_row).transpose()
    }

    async fn find_reward_by_reference(
        &self,
        campaign_id: Uuid,
        inviter_account_id: &str,
        invitee_account_id: &str,
        transaction_reference: &str,
    ) -> Result<Option<Reward>> {
        let query = by_reference_statement(
            campaign_id,
            inviter_account_id,
            invitee_account_id,
            transaction_reference,
        );
        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(reward_from_row).transpose()
    }

    async fn update_reward(
        &self,
        reward: &Reward,
        expected_version: u32,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = async {
            Self::write_reward_update(&mut conn, reward, expected_version).await?;
            insert_audit(&mut conn, audit).await
        }
        .await;
        finish(&mut conn, result).await
    }

    async fn reissue_reward(
        &self,
        original: &Reward,
        expected_version: u32,
        replacement: &Reward,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result =
            Self::write_reissue(&mut conn, original, expected_version, replacement, audit).await;
        finish(&mut conn, result).await
    }

    async fn list_rewards(&self, query: &RewardQuery, page: PageRequest) -> Result<Page<Reward>> {
        let count = Query::select()
            .expr(Func::count(Expr::col(Rewards::Seq)))
            .from(Rewards::Table)
            .cond_where(reward_condition(query))
            .to_string(SqliteQueryBuilder);
        let select = Query::select()
            .column(Asterisk)
            .from(Rewards::Table)
            .cond_where(reward_condition(query))
            .order_by(Rewards::Seq, Order::Asc)
            .limit(u64::from(page.size))
            .offset(page.offset())
            .to_string(SqliteQueryBuilder);

        let total: i64 = sqlx::query(&count).fetch_one(&self.pool).await?.get(0);
        let rows = sqlx::query(&select).fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(reward_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(items, page, total.max(0) as u64))
    }

    async fn find_rewards(&self, query: &RewardQuery) -> Result<Vec<Reward>> {
        let select = Query::select()
            .column(Asterisk)
            .from(Rewards::Table)
            .cond_where(reward_condition(query))
            .order_by(Rewards::Seq, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&select).fetch_all(&self.pool).await?;
        rows.iter().map(reward_from_row).collect()
    }

    async fn count_capped_rewards(
        &self,
        campaign_id: Uuid,
        inviter_account_id: &str,
        invitee_account_id: &str,
    ) -> Result<u32> {
        let count = Query::select()
            .expr(Func::count(Expr::col(Rewards::Seq)))
            .from(Rewards::Table)
            .cond_where(
                triple_condition(campaign_id, inviter_account_id, invitee_account_id)
                    .add(Expr::col(Rewards::Status).is_in(capped_statuses())),
            )
            .to_string(SqliteQueryBuilder);

        let used: i64 = sqlx::query(&count).fetch_one(&self.pool).await?.get(0);
        parse_u32("rewards.count", used)
    }
}

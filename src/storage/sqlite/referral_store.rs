//! SQLite ReferralStore implementation, including the account directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Asterisk, Cond, Expr, Func, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{
    begin_immediate, finish, fmt_opt_ts, fmt_ts, insert_audit, map_unique, parse_opt_ts,
    parse_ts, parse_uuid, SqliteStore,
};
use crate::interfaces::{ReferralQuery, ReferralStore, Result, StorageError};
use crate::model::{Account, AuditLogEntry, Page, PageRequest, Referral};
use crate::storage::schema::{Accounts, Referrals};

fn referral_from_row(row: &SqliteRow) -> Result<Referral> {
    Ok(Referral {
        id: parse_uuid("referrals.id", &row.get::<String, _>("id"))?,
        campaign_id: parse_uuid(
            "referrals.campaign_id",
            &row.get::<String, _>("campaign_id"),
        )?,
        inviter_account_id: row.get("inviter_account_id"),
        invitee_email: row.get("invitee_email"),
        invitee_account_id: row.get("invitee_account_id"),
        invited_at: parse_ts("referrals.invited_at", &row.get::<String, _>("invited_at"))?,
        signed_up_at: parse_opt_ts("referrals.signed_up_at", row.get("signed_up_at"))?,
        qualified_at: parse_opt_ts("referrals.qualified_at", row.get("qualified_at"))?,
    })
}

fn account_from_row(row: &SqliteRow) -> Result<Account> {
    Ok(Account {
        account_id: row.get("account_id"),
        email: row.get("email"),
        registered_at: parse_ts(
            "accounts.registered_at",
            &row.get::<String, _>("registered_at"),
        )?,
    })
}

fn referral_condition(query: &ReferralQuery) -> Cond {
    let mut cond = Cond::all();
    if let Some(id) = query.campaign_id {
        cond = cond.add(Expr::col(Referrals::CampaignId).eq(id.to_string()));
    }
    if let Some(inviter) = &query.inviter_account_id {
        cond = cond.add(Expr::col(Referrals::InviterAccountId).eq(inviter.as_str()));
    }
    cond
}

fn window(column: Referrals, from: &str, to: &str) -> Cond {
    Cond::all()
        .add(Expr::col(column).gte(from))
        .add(Expr::col(column).lt(to))
}

impl SqliteStore {
    async fn write_referral_insert(
        conn: &mut SqliteConnection,
        referral: &Referral,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let query = Query::insert()
            .into_table(Referrals::Table)
            .columns([
                Referrals::Id,
                Referrals::CampaignId,
                Referrals::InviterAccountId,
                Referrals::InviteeEmail,
                Referrals::InviteeAccountId,
                Referrals::InvitedAt,
                Referrals::SignedUpAt,
                Referrals::QualifiedAt,
            ])
            .values_panic([
                referral.id.to_string().into(),
                referral.campaign_id.to_string().into(),
                referral.inviter_account_id.clone().into(),
                referral.invitee_email.clone().into(),
                referral.invitee_account_id.clone().into(),
                fmt_ts(referral.invited_at).into(),
                fmt_opt_ts(referral.signed_up_at).into(),
                fmt_opt_ts(referral.qualified_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_unique(e, referral.id.to_string()))?;
        insert_audit(conn, audit).await
    }

    async fn write_signup(
        conn: &mut SqliteConnection,
        referral_id: Uuid,
        invitee_account_id: &str,
        at: DateTime<Utc>,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let query = Query::update()
            .table(Referrals::Table)
            .values([
                (Referrals::InviteeAccountId, invitee_account_id.into()),
                (Referrals::SignedUpAt, fmt_ts(at).into()),
            ])
            .and_where(Expr::col(Referrals::Id).eq(referral_id.to_string()))
            .and_where(Expr::col(Referrals::SignedUpAt).is_null())
            .to_string(SqliteQueryBuilder);

        let updated = sqlx::query(&query).execute(&mut *conn).await?;
        if updated.rows_affected() == 0 {
            let exists = Query::select()
                .column(Referrals::Id)
                .from(Referrals::Table)
                .and_where(Expr::col(Referrals::Id).eq(referral_id.to_string()))
                .to_string(SqliteQueryBuilder);
            return match sqlx::query(&exists).fetch_optional(&mut *conn).await? {
                // Already signed up: the expected "unsigned" state is gone.
                Some(_) => Err(StorageError::VersionConflict {
                    entity: "referral",
                    id: referral_id.to_string(),
                    expected: 0,
                }),
                None => Err(StorageError::NotFound {
                    entity: "referral",
                    id: referral_id.to_string(),
                }),
            };
        }

        insert_audit(conn, audit).await
    }

    async fn write_account(
        conn: &mut SqliteConnection,
        account: &Account,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let query = Query::insert()
            .into_table(Accounts::Table)
            .columns([Accounts::AccountId, Accounts::Email, Accounts::RegisteredAt])
            .values_panic([
                account.account_id.clone().into(),
                account.email.clone().into(),
                fmt_ts(account.registered_at).into(),
            ])
            .on_conflict(
                OnConflict::column(Accounts::AccountId)
                    .update_column(Accounts::Email)
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_unique(e, account.email.clone()))?;
        insert_audit(conn, audit).await
    }
}

#[async_trait]
impl ReferralStore for SqliteStore {
    async fn insert_referral(&self, referral: &Referral, audit: &AuditLogEntry) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_referral_insert(&mut conn, referral, audit).await;
        finish(&mut conn, result).await
    }

    async fn mark_signed_up(
        &self,
        referral_id: Uuid,
        invitee_account_id: &str,
        at: DateTime<Utc>,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result =
            Self::write_signup(&mut conn, referral_id, invitee_account_id, at, audit).await;
        finish(&mut conn, result).await
    }

    async fn get_referral(&self, id: Uuid) -> Result<Option<Referral>> {
        let query = Query::select()
            .column(Asterisk)
            .from(Referrals::Table)
            .and_where(Expr::col(Referrals::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(referral_from_row).transpose()
    }

    async fn find_referral_by_invitee(
        &self,
        invitee_account_id: &str,
    ) -> Result<Option<Referral>> {
        let query = Query::select()
            .column(Asterisk)
            .from(Referrals::Table)
            .and_where(Expr::col(Referrals::InviteeAccountId).eq(invitee_account_id))
            .order_by(Referrals::SignedUpAt, Order::Desc)
            .order_by(Referrals::Seq, Order::Desc)
            .limit(1)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(referral_from_row).transpose()
    }

    async fn list_referrals(
        &self,
        query: &ReferralQuery,
        page: PageRequest,
    ) -> Result<Page<Referral>> {
        let count = Query::select()
            .expr(Func::count(Expr::col(Referrals::Seq)))
            .from(Referrals::Table)
            .cond_where(referral_condition(query))
            .to_string(SqliteQueryBuilder);
        let select = Query::select()
            .column(Asterisk)
            .from(Referrals::Table)
            .cond_where(referral_condition(query))
            .order_by(Referrals::Seq, Order::Asc)
            .limit(u64::from(page.size))
            .offset(page.offset())
            .to_string(SqliteQueryBuilder);

        let total: i64 = sqlx::query(&count).fetch_one(&self.pool).await?.get(0);
        let rows = sqlx::query(&select).fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(referral_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(items, page, total.max(0) as u64))
    }

    async fn referrals_touching(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Referral>> {
        let (from, to) = (fmt_ts(from), fmt_ts(to));
        let query = Query::select()
            .column(Asterisk)
            .from(Referrals::Table)
            .cond_where(
                Cond::any()
                    .add(window(Referrals::InvitedAt, &from, &to))
                    .add(window(Referrals::SignedUpAt, &from, &to))
                    .add(window(Referrals::QualifiedAt, &from, &to)),
            )
            .order_by(Referrals::Seq, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(referral_from_row).collect()
    }

    async fn upsert_account(&self, account: &Account, audit: &AuditLogEntry) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_account(&mut conn, account, audit).await;
        finish(&mut conn, result).await
    }

    async fn get_account(&self, account_id: &str) -> Result<Option<Account>> {
        let query = Query::select()
            .column(Asterisk)
            .from(Accounts::Table)
            .and_where(Expr::col(Accounts::AccountId).eq(account_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = Query::select()
            .column(Asterisk)
            .from(Accounts::Table)
            .and_where(Expr::col(Accounts::Email).eq(email))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(account_from_row).transpose()
    }
}

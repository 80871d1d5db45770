//! SQLite CampaignStore implementation.

use async_trait::async_trait;
use sea_query::{Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{
    begin_immediate, finish, fmt_opt_ts, fmt_ts, insert_audit, map_unique, parse_opt_ts,
    parse_ts, parse_u32, parse_uuid, SqliteStore,
};
use crate::interfaces::{CampaignStore, Result, StorageError};
use crate::model::{AuditLogEntry, Campaign, CampaignStatus, Page, PageRequest};
use crate::storage::schema::Campaigns;

fn campaign_from_row(row: &SqliteRow) -> Result<Campaign> {
    let status: String = row.get("status");
    let eligibility: String = row.get("eligibility_rules");
    let milestones: String = row.get("milestone_rules");

    Ok(Campaign {
        id: parse_uuid("campaigns.id", &row.get::<String, _>("id"))?,
        name: row.get("name"),
        description: row.get("description"),
        status: CampaignStatus::parse(&status).ok_or(StorageError::Corrupt {
            column: "campaigns.status",
            value: status.clone(),
        })?,
        starts_at: parse_opt_ts("campaigns.starts_at", row.get("starts_at"))?,
        ends_at: parse_opt_ts("campaigns.ends_at", row.get("ends_at"))?,
        target_actions: parse_u32("campaigns.target_actions", row.get("target_actions"))?,
        base_reward_points: parse_u32(
            "campaigns.base_reward_points",
            row.get("base_reward_points"),
        )?,
        activation_reward_points: parse_u32(
            "campaigns.activation_reward_points",
            row.get("activation_reward_points"),
        )?,
        passport_bonus_points: parse_u32(
            "campaigns.passport_bonus_points",
            row.get("passport_bonus_points"),
        )?,
        mark_suspicious_as_pending: row.get("mark_suspicious_as_pending"),
        eligibility_rules: serde_json::from_str(&eligibility)?,
        milestone_rules: serde_json::from_str(&milestones)?,
        created_at: parse_ts("campaigns.created_at", &row.get::<String, _>("created_at"))?,
        updated_at: parse_ts("campaigns.updated_at", &row.get::<String, _>("updated_at"))?,
        version: parse_u32("campaigns.version", row.get("version"))?,
    })
}

impl SqliteStore {
    async fn write_campaign_update(
        conn: &mut SqliteConnection,
        campaign: &Campaign,
        expected_version: u32,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let query = Query::update()
            .table(Campaigns::Table)
            .values([
                (Campaigns::Name, campaign.name.clone().into()),
                (Campaigns::Description, campaign.description.clone().into()),
                (Campaigns::Status, campaign.status.as_str().into()),
                (Campaigns::StartsAt, fmt_opt_ts(campaign.starts_at).into()),
                (Campaigns::EndsAt, fmt_opt_ts(campaign.ends_at).into()),
                (Campaigns::TargetActions, i64::from(campaign.target_actions).into()),
                (
                    Campaigns::BaseRewardPoints,
                    i64::from(campaign.base_reward_points).into(),
                ),
                (
                    Campaigns::ActivationRewardPoints,
                    i64::from(campaign.activation_reward_points).into(),
                ),
                (
                    Campaigns::PassportBonusPoints,
                    i64::from(campaign.passport_bonus_points).into(),
                ),
                (
                    Campaigns::MarkSuspiciousAsPending,
                    campaign.mark_suspicious_as_pending.into(),
                ),
                (
                    Campaigns::EligibilityRules,
                    serde_json::to_string(&campaign.eligibility_rules)?.into(),
                ),
                (
                    Campaigns::MilestoneRules,
                    serde_json::to_string(&campaign.milestone_rules)?.into(),
                ),
                (Campaigns::UpdatedAt, fmt_ts(campaign.updated_at).into()),
                (Campaigns::Version, i64::from(campaign.version).into()),
            ])
            .and_where(Expr::col(Campaigns::Id).eq(campaign.id.to_string()))
            .and_where(Expr::col(Campaigns::Version).eq(i64::from(expected_version)))
            .to_string(SqliteQueryBuilder);

        let updated = sqlx::query(&query).execute(&mut *conn).await?;
        if updated.rows_affected() == 0 {
            let exists = Query::select()
                .column(Campaigns::Id)
                .from(Campaigns::Table)
                .and_where(Expr::col(Campaigns::Id).eq(campaign.id.to_string()))
                .to_string(SqliteQueryBuilder);
            return match sqlx::query(&exists).fetch_optional(&mut *conn).await? {
                Some(_) => Err(StorageError::VersionConflict {
                    entity: "campaign",
                    id: campaign.id.to_string(),
                    expected: expected_version,
                }),
                None => Err(StorageError::NotFound {
                    entity: "campaign",
                    id: campaign.id.to_string(),
                }),
            };
        }

        insert_audit(conn, audit).await
    }

    async fn write_campaign_insert(
        conn: &mut SqliteConnection,
        campaign: &Campaign,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let query = Query::insert()
            .into_table(Campaigns::Table)
            .columns([
                Campaigns::Id,
                Campaigns::Name,
                Campaigns::Description,
                Campaigns::Status,
                Campaigns::StartsAt,
                Campaigns::EndsAt,
                Campaigns::TargetActions,
                Campaigns::BaseRewardPoints,
                Campaigns::ActivationRewardPoints,
                Campaigns::PassportBonusPoints,
                Campaigns::MarkSuspiciousAsPending,
                Campaigns::EligibilityRules,
                Campaigns::MilestoneRules,
                Campaigns::CreatedAt,
                Campaigns::UpdatedAt,
                Campaigns::Version,
            ])
            .values_panic([
                campaign.id.to_string().into(),
                campaign.name.clone().into(),
                campaign.description.clone().into(),
                campaign.status.as_str().into(),
                fmt_opt_ts(campaign.starts_at).into(),
                fmt_opt_ts(campaign.ends_at).into(),
                i64::from(campaign.target_actions).into(),
                i64::from(campaign.base_reward_points).into(),
                i64::from(campaign.activation_reward_points).into(),
                i64::from(campaign.passport_bonus_points).into(),
                campaign.mark_suspicious_as_pending.into(),
                serde_json::to_string(&campaign.eligibility_rules)?.into(),
                serde_json::to_string(&campaign.milestone_rules)?.into(),
                fmt_ts(campaign.created_at).into(),
                fmt_ts(campaign.updated_at).into(),
                i64::from(campaign.version).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_unique(e, campaign.id.to_string()))?;

        insert_audit(conn, audit).await
    }
}

#[async_trait]
impl CampaignStore for SqliteStore {
    async fn insert_campaign(&self, campaign: &Campaign, audit: &AuditLogEntry) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_campaign_insert(&mut conn, campaign, audit).await;
        finish(&mut conn, result).await
    }

    async fn update_campaign(
        &self,
        campaign: &Campaign,
        expected_version: u32,
        audit: &AuditLogEntry,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_campaign_update(&mut conn, campaign, expected_version, audit).await;
        finish(&mut conn, result).await
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        let query = Query::select()
            .column(Asterisk)
            .from(Campaigns::Table)
            .and_where(Expr::col(Campaigns::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(campaign_from_row).transpose()
    }

    async fn list_campaigns(
        &self,
        status: Option<CampaignStatus>,
        page: PageRequest,
    ) -> Result<Page<Campaign>> {
        let mut count = Query::select();
        count
            .expr(Func::count(Expr::col(Campaigns::Seq)))
            .from(Campaigns::Table);
        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(Campaigns::Table)
            .order_by(Campaigns::Seq, Order::Desc)
            .limit(u64::from(page.size))
            .offset(page.offset());
        if let Some(status) = status {
            count.and_where(Expr::col(Campaigns::Status).eq(status.as_str()));
            select.and_where(Expr::col(Campaigns::Status).eq(status.as_str()));
        }

        let total: i64 = sqlx::query(&count.to_string(SqliteQueryBuilder))
            .fetch_one(&self.pool)
            .await?
            .get(0);
        let rows = sqlx::query(&select.to_string(SqliteQueryBuilder))
            .fetch_all(&self.pool)
            .await?;
        let items = rows
            .iter()
            .map(campaign_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(items, page, total.max(0) as u64))
    }

    async fn all_campaigns(&self) -> Result<Vec<Campaign>> {
        let query = Query::select()
            .column(Asterisk)
            .from(Campaigns::Table)
            .order_by(Campaigns::Seq, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(campaign_from_row).collect()
    }
}

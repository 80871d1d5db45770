//! SQLite AuditStore implementation.

use async_trait::async_trait;
use sea_query::{Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{begin_immediate, finish, insert_audit, parse_ts, parse_uuid, SqliteStore};
use crate::interfaces::{AuditStore, Result, StorageError};
use crate::model::{AuditLogEntry, Page, PageRequest, TargetType};
use crate::storage::schema::AuditLog;

fn audit_from_row(row: &SqliteRow) -> Result<AuditLogEntry> {
    let target_type: String = row.get("target_type");
    let details: Option<String> = row.get("details");

    Ok(AuditLogEntry {
        id: parse_uuid("audit_log.id", &row.get::<String, _>("id"))?,
        action: row.get("action"),
        target_type: TargetType::parse(&target_type).ok_or(StorageError::Corrupt {
            column: "audit_log.target_type",
            value: target_type.clone(),
        })?,
        target_id: row.get("target_id"),
        actor: row.get("actor"),
        reason: row.get("reason"),
        details: details.as_deref().map(serde_json::from_str).transpose()?,
        created_at: parse_ts("audit_log.created_at", &row.get::<String, _>("created_at"))?,
    })
}

#[async_trait]
impl AuditStore for SqliteStore {
    async fn append_audit(&self, entry: &AuditLogEntry) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = insert_audit(&mut conn, entry).await;
        finish(&mut conn, result).await
    }

    async fn list_audit(
        &self,
        action_prefix: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<AuditLogEntry>> {
        let mut count = Query::select();
        count
            .expr(Func::count(Expr::col(AuditLog::Seq)))
            .from(AuditLog::Table);
        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(AuditLog::Table)
            .order_by(AuditLog::Seq, Order::Desc)
            .limit(u64::from(page.size))
            .offset(page.offset());
        if let Some(prefix) = action_prefix {
            // LIKE folds ASCII case and treats `_` as a wildcard; compare bytes instead.
            let starts_with =
                Expr::cust_with_values("substr(action, 1, length(?)) = ?", [prefix, prefix]);
            count.and_where(starts_with.clone());
            select.and_where(starts_with);
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
            .map(audit_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(items, page, total.max(0) as u64))
    }
}

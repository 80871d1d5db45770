//! SQLite implementations of storage interfaces.
//!
//! One `SqliteStore` implements every store trait; each trait lives in its
//! own file. Writes that must be atomic run inside `BEGIN IMMEDIATE`, which
//! takes the database write lock up front so concurrent writers serialize
//! instead of racing to upgrade shared locks.

mod audit_store;
mod campaign_store;
mod referral_store;
mod reward_store;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sea_query::{Query, SqliteQueryBuilder};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::interfaces::{Result, StorageError};
use crate::model::AuditLogEntry;
use crate::storage::schema::{AuditLog, CREATE_TABLES};

/// SQLite implementation of every engine store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool. Call [`SqliteStore::init`] before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) a database file, or `:memory:`.
    pub async fn connect(path: &str, max_connections: u32) -> Result<Self> {
        let pool = if path == ":memory:" {
            // Every connection to sqlite::memory: is a separate database,
            // so pin the pool to one connection that never expires.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect(&format!("sqlite:{}?mode=rwc", path))
                .await?
        };
        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist.
    pub async fn init(&self) -> Result<()> {
        for statement in CREATE_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Start a write transaction holding the database lock.
async fn begin_immediate(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    Ok(())
}

/// Commit on success, roll back on failure.
async fn finish<T>(conn: &mut SqliteConnection, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(value)
        }
        Err(e) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(e)
        }
    }
}

/// Insert an audit row inside the caller's transaction.
///
/// Any failure is reported as `AuditWrite` so the caller rolls back the
/// mutation the entry describes.
async fn insert_audit(conn: &mut SqliteConnection, entry: &AuditLogEntry) -> Result<()> {
    let details = entry
        .details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let query = Query::insert()
        .into_table(AuditLog::Table)
        .columns([
            AuditLog::Id,
            AuditLog::Action,
            AuditLog::TargetType,
            AuditLog::TargetId,
            AuditLog::Actor,
            AuditLog::Reason,
            AuditLog::Details,
            AuditLog::CreatedAt,
        ])
        .values_panic([
            entry.id.to_string().into(),
            entry.action.clone().into(),
            entry.target_type.as_str().into(),
            entry.target_id.clone().into(),
            entry.actor.clone().into(),
            entry.reason.clone().into(),
            details.into(),
            fmt_ts(entry.created_at).into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query)
        .execute(&mut *conn)
        .await
        .map_err(|e| StorageError::AuditWrite(e.to_string()))?;
    Ok(())
}

/// Map a unique-constraint violation onto `DuplicateKey`.
fn map_unique(error: sqlx::Error, key: impl Into<String>) -> StorageError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::DuplicateKey(key.into())
        }
        _ => StorageError::Database(error),
    }
}

// Column codecs. Timestamps use a fixed RFC 3339 shape so that text
// comparison in SQL matches chronological order.

pub(crate) fn fmt_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn fmt_opt_ts(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(fmt_ts)
}

fn parse_ts(column: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StorageError::Corrupt {
            column,
            value: value.to_string(),
        })
}

fn parse_opt_ts(column: &'static str, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_ts(column, &v)).transpose()
}

fn parse_uuid(column: &'static str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|_| StorageError::Corrupt {
        column,
        value: value.to_string(),
    })
}

fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal> {
    value.parse::<Decimal>().map_err(|_| StorageError::Corrupt {
        column,
        value: value.to_string(),
    })
}

fn parse_u32(column: &'static str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| StorageError::Corrupt {
        column,
        value: value.to_string(),
    })
}

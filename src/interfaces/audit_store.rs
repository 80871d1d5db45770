//! Audit storage interface.

use async_trait::async_trait;

use super::Result;
use crate::model::{AuditLogEntry, Page, PageRequest};

/// Append-only audit persistence.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append a standalone entry, for audited actions with no other write.
    async fn append_audit(&self, entry: &AuditLogEntry) -> Result<()>;

    /// Entries newest first, optionally restricted to actions starting with `action_prefix`.
    async fn list_audit(
        &self,
        action_prefix: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<AuditLogEntry>>;
}

//! Audit recorder.
//!
//! Builds audit entries stamped with the engine clock. Entries for
//! mutations are handed to the store together with the mutation so both
//! commit or neither does; [`AuditRecorder::record`] is only for audited
//! actions that have no other write.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::auth::Actor;
use crate::clock::Clock;
use crate::error::Result;
use crate::interfaces::{AuditStore, EngineStore};
use crate::model::{AuditLogEntry, Page, PageRequest, TargetType};

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn EngineStore>,
    clock: Arc<dyn Clock>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn EngineStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Build an entry for `action` on one target, attributed to `actor`.
    pub fn entry(
        &self,
        action: &str,
        target_type: TargetType,
        target_id: impl ToString,
        actor: &Actor,
        reason: &str,
    ) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            action: action.to_string(),
            target_type,
            target_id: target_id.to_string(),
            actor: actor.id.clone(),
            reason: reason.to_string(),
            details: None,
            created_at: self.clock.now(),
        }
    }

    /// Persist a standalone entry. Fails if the entry could not be written.
    pub async fn record(&self, entry: &AuditLogEntry) -> Result<()> {
        self.store.append_audit(entry).await?;
        Ok(())
    }

    /// Entries newest first, filtered by action-name prefix.
    pub async fn list(
        &self,
        action_prefix: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<AuditLogEntry>> {
        let prefix = action_prefix.filter(|p| !p.is_empty());
        Ok(self.store.list_audit(prefix, page).await?)
    }
}

/// Attach an action-specific payload to an entry.
pub fn with_details(mut entry: AuditLogEntry, details: Value) -> AuditLogEntry {
    entry.details = Some(details);
    entry
}

//! Engine error taxonomy.

use std::fmt;

use serde::Serialize;

use crate::interfaces::StorageError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field-level failure found in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field shortcut.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Names of the offending fields, in the order found.
    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> std::result::Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

/// Coarse error class, for mapping onto a transport's status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidStateTransition,
    Conflict,
    Authorization,
    Internal,
}

/// Errors surfaced to callers of the engine. None are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Cannot {action} {entity} in status {from}")]
    InvalidStateTransition {
        entity: &'static str,
        from: String,
        action: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::Authorization(_) => ErrorKind::Authorization,
            EngineError::Storage(_) | EngineError::Export(_) => ErrorKind::Internal,
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        action: impl ToString,
    ) -> Self {
        EngineError::InvalidStateTransition {
            entity,
            from: from.to_string(),
            action: action.to_string(),
        }
    }

    /// Field errors, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            EngineError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<FieldErrors> for EngineError {
    fn from(errors: FieldErrors) -> Self {
        EngineError::Validation(errors)
    }
}

impl From<StorageError> for EngineError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::VersionConflict { entity, id, .. } => EngineError::Conflict(format!(
                "{} {} was modified concurrently",
                entity, id
            )),
            StorageError::DuplicateKey(key) => {
                EngineError::Conflict(format!("duplicate key: {}", key))
            }
            StorageError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Storage(other),
        }
    }
}

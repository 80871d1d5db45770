//! Storage configuration types.

use serde::Deserialize;

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Sqlite,
    Memory,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Sqlite => f.write_str("sqlite"),
            StorageType::Memory => f.write_str("memory"),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// Path to the SQLite database file, or `:memory:`.
    pub path: String,
    /// Connection pool size for file databases.
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Sqlite,
            path: "./data/referrals.db".to_string(),
            max_connections: 5,
        }
    }
}

impl StorageConfig {
    /// In-memory storage, for tests and local experiments.
    pub fn memory() -> Self {
        Self {
            storage_type: StorageType::Memory,
            ..Self::default()
        }
    }

    /// SQLite database at `path`.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            storage_type: StorageType::Sqlite,
            path: path.into(),
            ..Self::default()
        }
    }
}

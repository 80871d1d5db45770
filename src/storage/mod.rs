//! Storage implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::EngineStore;

pub mod mock;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use mock::MockStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Initialize storage based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn EngineStore>, Box<dyn std::error::Error>> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Storage: memory");
            Ok(Arc::new(MockStore::new()))
        }
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            info!("Storage: {} at {}", config.storage_type, config.path);
            if config.path != ":memory:" {
                if let Some(parent) = std::path::Path::new(&config.path).parent() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let store = SqliteStore::connect(&config.path, config.max_connections).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err("SQLite feature not enabled".into())
        }
    }
}

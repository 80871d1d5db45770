//! Backend factory for interface tests.
//!
//! Builds a `ReferralEngine` over the store selected by environment
//! configuration, with a fixed clock so scenarios are deterministic.

use std::env;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use referral_engine::clock::{Clock, FixedClock};
use referral_engine::interfaces::EngineStore;
use referral_engine::storage::MockStore;
use referral_engine::ReferralEngine;

#[cfg(feature = "sqlite")]
use referral_engine::storage::SqliteStore;

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl StorageBackend {
    pub fn from_env() -> Self {
        match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StorageBackend::Sqlite,
            _ => StorageBackend::Memory,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

/// Scenario start time. Campaign windows are laid out around it.
pub fn scenario_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap()
}

/// Engine plus the handles a scenario needs to keep alive.
pub struct EngineContext {
    pub engine: ReferralEngine,
    pub store: Arc<dyn EngineStore>,
    pub clock: Arc<FixedClock>,
    _dir: Option<tempfile::TempDir>,
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext").finish_non_exhaustive()
    }
}

impl EngineContext {
    pub async fn new(backend: StorageBackend) -> Self {
        let (store, dir): (Arc<dyn EngineStore>, _) = match backend {
            StorageBackend::Memory => (Arc::new(MockStore::new()), None),
            StorageBackend::Sqlite => Self::sqlite().await,
        };
        let clock = Arc::new(FixedClock::new(scenario_now()));
        let engine = ReferralEngine::builder()
            .with_store(Arc::clone(&store))
            .with_clock(clock.clone())
            .build();
        Self {
            engine,
            store,
            clock,
            _dir: dir,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[cfg(feature = "sqlite")]
    async fn sqlite() -> (Arc<dyn EngineStore>, Option<tempfile::TempDir>) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("interfaces.db");
        let store = SqliteStore::connect(&path.to_string_lossy(), 4)
            .await
            .expect("Failed to open SQLite");
        (Arc::new(store), Some(dir))
    }

    #[cfg(not(feature = "sqlite"))]
    async fn sqlite() -> (Arc<dyn EngineStore>, Option<tempfile::TempDir>) {
        panic!("STORAGE_BACKEND=sqlite requires the 'sqlite' feature");
    }
}

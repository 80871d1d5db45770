//! Application configuration.
//!
//! Loaded from YAML files and environment variables into a single Config
//! struct.

mod storage;

pub use storage::{StorageConfig, StorageType};

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "referral.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "REFERRAL_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "REFERRAL";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "REFERRAL_LOG";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Engine behaviour knobs.
    pub engine: EngineConfig,
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size used when a caller does not choose one.
    pub default_page_size: u32,
    /// Largest page size a caller may request.
    pub max_page_size: u32,
    /// Whether the review queue also lists flagged, unmoderated rewards.
    pub review_queue_includes_flagged: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 200,
            review_queue_includes_flagged: true,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `referral.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Create config for testing: in-memory storage, default engine settings.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig::memory(),
            engine: EngineConfig::default(),
        }
    }
}

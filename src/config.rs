//! Configuration management with validation and defaults
//!
//! Economy constants, storage tuning and server settings live in one TOML
//! document. `ConfigLoader` layers file, environment and validation.

use crate::errors::{ConfigurationError, MinestarsResult};
use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinestarsConfig {
    pub economy: EconomyConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub monitoring: MonitoringConfig,
}

/// Prices, rates and grants of the player economy
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Lifetime of a freshly lit torch
    pub torch_lifetime_secs: i64,
    /// Stone pickaxes granted by the daily claim
    pub daily_stone_pickaxes: u64,
    pub diamond_pickaxe_cost: u64,
    /// Rubies consumed per star when buying stars
    pub rubies_per_star: u64,
    /// Rubies received per star when selling stars
    pub stars_to_rubies_rate: u64,
    pub referral_boost_cost: u64,
    pub eternal_torch_cost: u64,
    /// Torch extension granted per confirmed referral
    pub referral_extension_secs: i64,
    /// Extension multiplier in percent while the referral boost is owned
    pub referral_boost_percent: u64,
    pub referral_stone_pickaxes: u64,
    /// Attempts made before a storage conflict is surfaced
    pub max_conflict_retries: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            torch_lifetime_secs: 24 * 60 * 60,
            daily_stone_pickaxes: 3,
            diamond_pickaxe_cost: 150,
            rubies_per_star: 100,
            stars_to_rubies_rate: 80,
            referral_boost_cost: 500,
            eternal_torch_cost: 5_000,
            referral_extension_secs: 12 * 60 * 60,
            referral_boost_percent: 120,
            referral_stone_pickaxes: 2,
            max_conflict_retries: 3,
        }
    }
}

/// Storage configuration with optimization settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_directory: String,
    pub write_buffer_size_mb: usize,
    pub max_write_buffer_number: i32,
    pub compression_type: CompressionType,
    /// Whether to clear database on startup (testing only!)
    pub clear_on_start: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Snappy,
    Lz4,
    Zstd,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./DB/minestars_data".to_string(),
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            compression_type: CompressionType::Lz4,
            clear_on_start: false,
        }
    }
}

/// HTTP adapter settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub leaderboard_default_limit: usize,
    pub leaderboard_max_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 10,
            leaderboard_default_limit: 100,
            leaderboard_max_limit: 500,
        }
    }
}

/// Logging and metrics configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_metrics: bool,
    pub log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(ConfigurationError::InvalidValue {
                field: "monitoring.log_level".to_string(),
                value: other.to_string(),
                reason: "expected error|warn|info|debug|trace".to_string(),
            }),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            log_level: LogLevel::Info,
        }
    }
}

impl MinestarsConfig {
    /// Configuration for production deployment with persistence
    pub fn production() -> Self {
        Self {
            storage: StorageConfig {
                write_buffer_size_mb: 128,
                clear_on_start: false,
                ..Default::default()
            },
            api: ApiConfig {
                request_timeout_secs: 5,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Configuration for tests: throwaway database, verbose logs
    pub fn testing() -> Self {
        Self {
            storage: StorageConfig {
                data_directory: "./DB/minestars_test".to_string(),
                write_buffer_size_mb: 8,
                clear_on_start: true,
                ..Default::default()
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Debug,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let economy = &self.economy;

        if economy.torch_lifetime_secs <= 0 {
            return Err(invalid(
                "economy.torch_lifetime_secs",
                economy.torch_lifetime_secs,
                "Torch lifetime must be positive",
            ));
        }

        if economy.rubies_per_star == 0 {
            return Err(invalid("economy.rubies_per_star", 0, "Exchange rate cannot be zero"));
        }

        if economy.stars_to_rubies_rate == 0 {
            return Err(invalid("economy.stars_to_rubies_rate", 0, "Exchange rate cannot be zero"));
        }

        // Selling a star back may never return more rubies than buying it cost.
        if economy.stars_to_rubies_rate > economy.rubies_per_star {
            return Err(invalid(
                "economy.stars_to_rubies_rate",
                economy.stars_to_rubies_rate,
                "Must not exceed rubies_per_star",
            ));
        }

        if economy.referral_boost_percent < 100 {
            return Err(invalid(
                "economy.referral_boost_percent",
                economy.referral_boost_percent,
                "Boost cannot shorten the extension",
            ));
        }

        if economy.referral_extension_secs < 0 {
            return Err(invalid(
                "economy.referral_extension_secs",
                economy.referral_extension_secs,
                "Extension cannot be negative",
            ));
        }

        if economy.max_conflict_retries == 0 {
            return Err(invalid("economy.max_conflict_retries", 0, "At least one attempt is required"));
        }

        if self.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()));
        }

        if self.api.port == 0 {
            return Err(invalid("api.port", 0, "Port cannot be zero"));
        }

        if self.api.leaderboard_default_limit == 0
            || self.api.leaderboard_default_limit > self.api.leaderboard_max_limit
        {
            return Err(invalid(
                "api.leaderboard_default_limit",
                self.api.leaderboard_default_limit,
                "Must be between 1 and leaderboard_max_limit",
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Loads configuration from an optional TOML file plus environment overrides
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> MinestarsResult<MinestarsConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => MinestarsConfig::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> MinestarsResult<MinestarsConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    /// Save configuration to file
    pub fn save(&self, config: &MinestarsConfig, path: &str) -> MinestarsResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn apply_env_overrides(config: &mut MinestarsConfig) -> Result<(), ConfigurationError> {
    if let Ok(data_dir) = env::var("MINESTARS_DATA_DIR") {
        config.storage.data_directory = data_dir;
    }
    if let Ok(host) = env::var("MINESTARS_API_HOST") {
        config.api.host = host;
    }
    if let Ok(port) = env::var("MINESTARS_API_PORT") {
        config.api.port = port.parse().map_err(|_| ConfigurationError::InvalidValue {
            field: "MINESTARS_API_PORT".to_string(),
            value: port,
            reason: "Invalid port number".to_string(),
        })?;
    }
    if let Ok(level) = env::var("MINESTARS_LOG_LEVEL") {
        config.monitoring.log_level = level.parse()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = MinestarsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.economy.torch_lifetime_secs, 86_400);
        assert_eq!(config.economy.daily_stone_pickaxes, 3);
        assert_eq!(config.economy.diamond_pickaxe_cost, 150);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(MinestarsConfig::production().validate().is_ok());
        assert!(MinestarsConfig::testing().validate().is_ok());
        assert!(MinestarsConfig::testing().storage.clear_on_start);
    }

    #[test]
    fn test_rejects_profitable_exchange_loop() {
        let mut config = MinestarsConfig::default();
        config.economy.stars_to_rubies_rate = config.economy.rubies_per_star + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_retry_bound() {
        let mut config = MinestarsConfig::default();
        config.economy.max_conflict_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: MinestarsConfig = toml::from_str(
            r#"
            [economy]
            diamond_pickaxe_cost = 200

            [api]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.economy.diamond_pickaxe_cost, 200);
        assert_eq!(config.economy.rubies_per_star, 100);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.storage.compression_type, CompressionType::Lz4);
    }

    #[test]
    fn test_save_and_load_config() -> MinestarsResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let mut original = MinestarsConfig::default();
        original.economy.eternal_torch_cost = 7_500;

        let loader = ConfigLoader::new();
        loader.save(&original, path)?;

        let loaded = ConfigLoader::new().with_path(path).load()?;
        assert_eq!(loaded.economy.eternal_torch_cost, 7_500);
        assert_eq!(loaded.monitoring.log_level, original.monitoring.log_level);

        Ok(())
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }
}

//! Error types for the player economy
//!
//! Business-rule rejections, malformed requests and storage failures share one
//! root type so every operation returns `MinestarsResult<T>`.

use thiserror::Error;

/// Root error type for all economy operations
#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("Player {0} not found")]
    NotFound(u64),

    #[error("Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("Insufficient stars: need {needed}, have {available}")]
    InsufficientStars { needed: u64, available: u64 },

    #[error("No {lane} pickaxe charges left")]
    InsufficientCharge { lane: String },

    #[error("Amount {amount} is too small to convert")]
    AmountTooSmall { amount: u64 },

    #[error("Invalid exchange direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid shop item: {0}")]
    InvalidItem(String),

    #[error("Invalid mining lane: {0}")]
    InvalidLane(String),

    #[error("Invalid leaderboard metric: {0}")]
    InvalidMetric(String),

    #[error("Concurrent update conflict for player {player_id}")]
    StorageConflict { player_id: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Storage system errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Missing required field: {0}")]
    MissingRequired(String),
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

impl EconomyError {
    /// Only version conflicts are safe to replay with the same inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EconomyError::StorageConflict { .. })
    }

    /// True for rejections caused by game rules or request shape.
    /// Nothing was written when one of these is returned.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            EconomyError::Storage(_) | EconomyError::Configuration(_) | EconomyError::StorageConflict { .. }
        )
    }

    /// Stable machine-readable code for collaborators
    pub fn code(&self) -> &'static str {
        match self {
            EconomyError::NotFound(_) => "not_found",
            EconomyError::InsufficientBalance { .. } => "insufficient_balance",
            EconomyError::InsufficientStars { .. } => "not_enough_stars",
            EconomyError::InsufficientCharge { .. } => "not_enough_pickaxes",
            EconomyError::AmountTooSmall { .. } => "amount_too_small",
            EconomyError::InvalidDirection(_) => "invalid_direction",
            EconomyError::InvalidItem(_) => "invalid_item",
            EconomyError::InvalidLane(_) => "invalid_pickaxe",
            EconomyError::InvalidMetric(_) => "invalid_metric",
            EconomyError::StorageConflict { .. } => "storage_conflict",
            EconomyError::Storage(_) => "storage_error",
            EconomyError::Configuration(_) => "configuration_error",
        }
    }
}

// External error conversions
impl From<rocksdb::Error> for EconomyError {
    fn from(e: rocksdb::Error) -> Self {
        EconomyError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for EconomyError {
    fn from(e: serde_json::Error) -> Self {
        EconomyError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

// Convenience type alias for Results
pub type MinestarsResult<T> = Result<T, EconomyError>;

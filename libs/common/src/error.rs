//! Custom error types for the common library
//!
//! This module defines the errors raised by the storage backends and the
//! settings loader shared by the dashboard services.

use thiserror::Error;

/// Custom error type for key-value storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error occurred while reading or writing the backing file
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored content could not be (de)serialized
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A lock guarding the store was poisoned by a panicking writer
    #[error("Storage lock poisoned")]
    Poisoned,

    /// The store refuses the operation (quota exceeded, storage disabled)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;

/// Custom error type for settings loading
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The configuration sources could not be merged or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A value was parsed but is not acceptable
    #[error("Invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Type alias for Result with SettingsError
pub type SettingsResult<T> = Result<T, SettingsError>;

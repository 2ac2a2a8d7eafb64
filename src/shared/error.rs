//! Durability Error Types
//!
//! Errors surfaced by operations that affect the integrity of a whole call:
//! persistence failures, snapshot version mismatches and configuration problems.
//! Failures that only affect a single record (a rejected sync item, an unreadable
//! cache entry) are contained locally and never show up here.
//!
//! # Usage
//!
//! ```rust
//! use cradlesync::shared::error::DurabilityError;
//!
//! let error = DurabilityError::incompatible_version("2.0.0", "1.x");
//! assert!(error.to_string().contains("2.0.0"));
//! ```
use thiserror::Error;

/// Result alias used across the durability layer
pub type Result<T> = std::result::Result<T, DurabilityError>;

/// Errors returned to callers of the durability layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DurabilityError {
    /// Durable storage rejected a read or write
    #[error("Persistence error: {message}")]
    Persistence {
        /// Human-readable error message
        message: String,
    },

    /// A value could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// A snapshot was produced by a format this build does not understand
    #[error("Incompatible snapshot version '{found}' (supported: {supported})")]
    IncompatibleVersion {
        /// Version found in the snapshot
        found: String,
        /// Versions this build accepts
        supported: String,
    },

    /// Filesystem error while reading or writing a snapshot file
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable error message
        message: String,
    },

    /// A requested record does not exist
    #[error("Not found: {what}")]
    NotFound {
        /// Description of the missing record
        what: String,
    },
}

impl DurabilityError {
    /// Create a new persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new version incompatibility error
    pub fn incompatible_version(found: impl Into<String>, supported: impl Into<String>) -> Self {
        Self::IncompatibleVersion {
            found: found.into(),
            supported: supported.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Whether the error came from durable storage
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

impl From<sqlx::Error> for DurabilityError {
    fn from(err: sqlx::Error) -> Self {
        Self::persistence(format!("SQLite error: {}", err))
    }
}

impl From<serde_json::Error> for DurabilityError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for DurabilityError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<crate::shared::config::ConfigError> for DurabilityError {
    fn from(err: crate::shared::config::ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}

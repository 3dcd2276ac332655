//! Core error types.

use thiserror::Error;

/// Record store errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// Record not found.
    #[error("record not found: {entity_type}#{id}")]
    NotFound {
        /// Entity type that was looked up.
        entity_type: String,
        /// Identifier that was looked up.
        id: u64,
    },

    /// Savepoint misuse (unknown, already closed, or not innermost).
    #[error("savepoint error: {0}")]
    Savepoint(String),
}

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A lower bound exceeds its upper bound.
    #[error("{name}: minimum {min} exceeds maximum {max}")]
    InvertedBounds {
        /// Setting name.
        name: &'static str,
        /// Configured minimum.
        min: f64,
        /// Configured maximum.
        max: f64,
    },

    /// A value lies outside its permitted range.
    #[error("{name}: {value} is outside {range}")]
    OutOfRange {
        /// Setting name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Human readable permitted range.
        range: &'static str,
    },
}

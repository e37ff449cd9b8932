//! Error types for storage operations.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Record (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Two different payloads claimed the same hash.
    ///
    /// Content addressing makes this unreachable short of a digest
    /// collision; it is surfaced as a fatal invariant break, never
    /// handled.
    #[error("Hash collision on {hash}: existing record holds different bytes")]
    HashCollision {
        /// Base64 form of the colliding hash.
        hash: String,
    },

    /// Payload error while maintaining secondary indexes.
    #[error("Payload error: {0}")]
    Payload(#[from] hush_payload::PayloadError),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

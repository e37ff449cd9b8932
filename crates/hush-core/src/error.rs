//! Error types for mediator operations.
//!
//! Hard privacy rules never auto-recover: a [`MediatorError::PrivacyViolation`]
//! always surfaces to the caller. Peer I/O is best-effort and its
//! failures never appear here; they are logged and swallowed at the
//! publish sites.

use thiserror::Error;

/// Errors surfaced by the public operations of the mediator.
#[derive(Error, Debug)]
pub enum MediatorError {
    /// A required transaction hash was not found locally.
    #[error("Transaction {hash} was not found")]
    TransactionNotFound {
        /// Base64 form of the missing hash.
        hash: String,
    },

    /// A hard rule of the private-state protocol was broken.
    #[error("Privacy violation: {0}")]
    PrivacyViolation(String),

    /// During bulk resend, no local key could decrypt one of our own
    /// payloads being returned to its sender.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// On receive without an explicit key, trial decryption exhausted
    /// every enclave key.
    #[error("No suitable recipient key found to decrypt payload for {hash}")]
    NoRecipientKeyFound {
        /// Base64 form of the requested hash.
        hash: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Payload codec error.
    #[error(transparent)]
    Payload(#[from] hush_payload::PayloadError),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] hush_store::StoreError),

    /// Cryptographic error.
    #[error(transparent)]
    Crypto(#[from] hush_crypto::CryptoError),

    /// Enclave error.
    #[error(transparent)]
    Enclave(#[from] crate::enclave::EnclaveError),
}

/// Result type for mediator operations.
pub type Result<T> = std::result::Result<T, MediatorError>;

//! Error types for payload handling.

use thiserror::Error;

/// Errors that can occur while encoding, decoding, or projecting payloads.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The payload bytes are structurally invalid.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// A projection target is not among the payload's recipients.
    #[error("Recipient {recipient} is not in the payload")]
    RecipientNotInPayload {
        /// Base64 form of the missing recipient key.
        recipient: String,
    },

    /// Encoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid privacy-mode flag.
    #[error("Unknown privacy flag: {0}")]
    UnknownPrivacyFlag(u8),

    /// Cryptographic error.
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] hush_crypto::CryptoError),
}

/// Result type for payload operations.
pub type Result<T> = std::result::Result<T, PayloadError>;

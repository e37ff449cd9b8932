//! Base64 conversion at API boundaries.
//!
//! Every byte field that crosses a public-operation boundary (keys,
//! hashes, payload bytes in responses) travels as standard-alphabet
//! base64. Internals work on raw bytes only.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{CryptoError, Result};

/// Encode bytes as standard base64.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64 into bytes.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidBase64`] on malformed input.
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::InvalidBase64(e.to_string()))
}

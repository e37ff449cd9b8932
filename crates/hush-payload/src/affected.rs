//! References from a new transaction to the prior transactions it
//! depends on.
//!
//! Inside a payload graph a prior transaction is named by [`TxHash`]:
//! the same 32 bytes as the storage-level `MessageHash`, under the name
//! used by the dependency graph. The two convert by copying bytes, never
//! by re-hashing.

use hush_crypto::{b64, MessageHash};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::Result;

/// Hash reference to a prior private transaction within a payload graph.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Create from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(MessageHash::from_bytes(bytes)?.into())
    }

    /// Parse from the base64 wire form.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Ok(MessageHash::from_base64(encoded)?.into())
    }

    /// Get the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Format as base64.
    pub fn to_base64(&self) -> String {
        b64::encode(&self.0)
    }
}

impl From<MessageHash> for TxHash {
    fn from(hash: MessageHash) -> Self {
        Self(hash.to_bytes())
    }
}

impl From<&TxHash> for MessageHash {
    fn from(hash: &TxHash) -> Self {
        MessageHash::from(hash.0)
    }
}

impl std::fmt::Debug for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TxHash({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

/// Enclave-computed binding between a payload and one transaction it
/// affects.
///
/// Verified (never produced) by this crate; compared in constant time.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityHash(Vec<u8>);

impl SecurityHash {
    /// Wrap raw security-hash bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for SecurityHash {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && bool::from(self.0.ct_eq(&other.0))
    }
}

impl Eq for SecurityHash {}

impl std::fmt::Debug for SecurityHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.len() >= 2 {
            write!(f, "SecurityHash({:02x}{:02x}..)", self.0[0], self.0[1])
        } else {
            write!(f, "SecurityHash(..)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_hash_message_hash_conversion() {
        let message_hash = MessageHash::from_cipher_text(b"cipher");
        let tx_hash: TxHash = message_hash.clone().into();
        let back: MessageHash = (&tx_hash).into();

        assert_eq!(message_hash, back);
        assert_eq!(tx_hash.as_bytes(), message_hash.as_bytes());
    }

    #[test]
    fn test_tx_hash_base64_roundtrip() {
        let tx_hash: TxHash = MessageHash::from_cipher_text(b"x").into();
        let restored = TxHash::from_base64(&tx_hash.to_base64()).unwrap();
        assert_eq!(tx_hash, restored);
    }

    #[test]
    fn test_security_hash_equality() {
        let a = SecurityHash::new(vec![1, 2, 3]);
        let b = SecurityHash::new(vec![1, 2, 3]);
        let c = SecurityHash::new(vec![1, 2, 4]);
        let d = SecurityHash::new(vec![1, 2]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}

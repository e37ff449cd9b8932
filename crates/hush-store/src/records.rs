//! Persisted record types.

use chrono::Utc;
use hush_crypto::{MessageHash, Nonce, PublicKey};
use serde::{Deserialize, Serialize};

/// A finalized encrypted transaction at rest.
///
/// Identity is the hash; the payload bytes are the canonical encoding of
/// the envelope. The timestamp records first persistence and plays no
/// part in identity or equality.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedTransaction {
    /// Content-addressed identity: digest of the envelope's cipher text.
    pub hash: MessageHash,

    /// Canonical encoding of the envelope.
    pub encoded_payload: Vec<u8>,

    /// Unix timestamp of first persistence.
    pub timestamp: i64,
}

impl EncryptedTransaction {
    /// Create a record stamped with the current time.
    pub fn new(hash: MessageHash, encoded_payload: Vec<u8>) -> Self {
        Self {
            hash,
            encoded_payload,
            timestamp: Utc::now().timestamp(),
        }
    }
}

impl PartialEq for EncryptedTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for EncryptedTransaction {}

/// A raw transaction encrypted for its sender only.
///
/// Held on the originating node until a signed send wraps it for real
/// recipients; never mutated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedRawTransaction {
    /// Digest of the encrypted payload.
    pub hash: MessageHash,

    /// The sender-encrypted payload bytes.
    pub encrypted_payload: Vec<u8>,

    /// The master key, wrapped for the sender alone.
    pub encrypted_key: Vec<u8>,

    /// Nonce under which payload and key were sealed.
    pub nonce: Nonce,

    /// The originating party.
    pub sender: PublicKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_hash() {
        let hash = MessageHash::from_cipher_text(b"cipher");
        let a = EncryptedTransaction::new(hash.clone(), vec![1, 2, 3]);
        let mut b = EncryptedTransaction::new(hash, vec![1, 2, 3]);
        b.timestamp = 0;

        assert_eq!(a, b);
    }
}

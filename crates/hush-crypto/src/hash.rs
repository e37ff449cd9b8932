//! Content-addressed digests over cipher text.
//!
//! The digest of a payload's cipher text is its identity across every
//! node of the network: hashing the same cipher text anywhere yields the
//! same [`MessageHash`].

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::{b64, CryptoError, Result};

/// A 256-bit (32-byte) BLAKE3 digest identifying one private transaction.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct MessageHash([u8; 32]);

impl MessageHash {
    /// Hash size in bytes.
    pub const SIZE: usize = 32;

    /// Derive the content-addressed identity of a payload's cipher text.
    ///
    /// Deterministic: the same cipher text produces the same hash on any
    /// node, which is what makes the digest usable as a cross-node key.
    pub fn from_cipher_text(cipher_text: &[u8]) -> Self {
        let hash = blake3::hash(cipher_text);
        Self(*hash.as_bytes())
    }

    /// Create a MessageHash from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(CryptoError::InvalidHashLength {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parse a hash from its base64 wire form.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::from_bytes(&b64::decode(encoded)?)
    }

    /// Get the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to owned byte array.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Format as base64 (the wire form used at API boundaries).
    pub fn to_base64(&self) -> String {
        b64::encode(&self.0)
    }
}

impl From<[u8; 32]> for MessageHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl ConstantTimeEq for MessageHash {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for MessageHash {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time comparison to prevent timing side-channels
        self.ct_eq(other).into()
    }
}

impl Eq for MessageHash {}

impl PartialOrd for MessageHash {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MessageHash {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Byte ordering for use as an ordered-map key; not security-relevant
        self.0.cmp(&other.0)
    }
}

impl std::hash::Hash for MessageHash {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::fmt::Debug for MessageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MessageHash({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl std::fmt::Display for MessageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl AsRef<[u8]> for MessageHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let cipher = b"opaque cipher text";
        let h1 = MessageHash::from_cipher_text(cipher);
        let h2 = MessageHash::from_cipher_text(cipher);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_different_inputs() {
        let h1 = MessageHash::from_cipher_text(b"one");
        let h2 = MessageHash::from_cipher_text(b"two");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_base64_roundtrip() {
        let h = MessageHash::from_cipher_text(b"payload");
        let encoded = h.to_base64();
        let restored = MessageHash::from_base64(&encoded).unwrap();
        assert_eq!(h, restored);
    }

    #[test]
    fn test_from_bytes_invalid_length() {
        assert!(MessageHash::from_bytes(&[0u8; 16]).is_err());
        assert!(MessageHash::from_bytes(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_ordering_consistent_with_eq() {
        let a = MessageHash::from_cipher_text(b"a");
        let b = MessageHash::from_cipher_text(b"b");
        assert_eq!(a.cmp(&a), std::cmp::Ordering::Equal);
        assert_ne!(a.cmp(&b), std::cmp::Ordering::Equal);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn base64_roundtrip(bytes: [u8; 32]) {
            let hash = MessageHash::from_bytes(&bytes).unwrap();
            let restored = MessageHash::from_base64(&hash.to_base64()).unwrap();
            prop_assert_eq!(hash, restored);
        }

        #[test]
        fn cipher_text_hashing_is_deterministic(cipher in any::<Vec<u8>>()) {
            prop_assert_eq!(
                MessageHash::from_cipher_text(&cipher),
                MessageHash::from_cipher_text(&cipher)
            );
        }
    }
}

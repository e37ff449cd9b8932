//! Curve25519 key material.
//!
//! Public keys are opaque 32-byte values compared by bytes and carried as
//! base64 on the wire. Secret keys are held only by the enclave, are
//! zeroized on drop, and are deliberately not `Clone`.

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::StaticSecret;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{b64, CryptoError, Result};

/// Size of a Curve25519 key in bytes.
pub const KEY_SIZE: usize = 32;

/// An opaque public key identifying one party on the network.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    /// Create from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parse a key from its base64 wire form.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::from_bytes(&b64::decode(encoded)?)
    }

    /// Get the key as bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Convert to byte array.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        self.0
    }

    /// Format as base64 (the wire form used at API boundaries).
    pub fn to_base64(&self) -> String {
        b64::encode(&self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_base64())
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A Curve25519 secret key, zeroized on drop.
///
/// Only the enclave holds these. Not `Clone`: secret material should not
/// be duplicated in memory by accident.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Generate a new random secret key.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        Self(secret.to_bytes())
    }

    /// Create from raw bytes.
    ///
    /// # Security
    ///
    /// Only use bytes from a secure source.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(self.0);
        let public = x25519_dalek::PublicKey::from(&secret);
        PublicKey(public.to_bytes())
    }

    /// Perform Diffie-Hellman key exchange with a peer's public key.
    pub fn shared_secret(&self, peer: &PublicKey) -> SharedSecret {
        let secret = StaticSecret::from(self.0);
        let peer = x25519_dalek::PublicKey::from(peer.0);
        let shared = secret.diffie_hellman(&peer);
        SharedSecret(shared.to_bytes())
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// Shared secret derived from Diffie-Hellman key exchange.
///
/// Input to a KDF, never used directly as an encryption key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; KEY_SIZE]);

impl SharedSecret {
    /// Derive an encryption key using BLAKE3 key derivation.
    pub fn derive_key(&self, context: &str) -> [u8; 32] {
        blake3::derive_key(context, &self.0)
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_exchange_symmetric() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();

        let ab = alice.shared_secret(&bob.public_key());
        let ba = bob.shared_secret(&alice.public_key());

        assert_eq!(
            ab.derive_key("hush test v1"),
            ba.derive_key("hush test v1")
        );
    }

    #[test]
    fn test_different_peers_different_secrets() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();
        let carol = SecretKey::generate();

        let ab = alice.shared_secret(&bob.public_key());
        let ac = alice.shared_secret(&carol.public_key());

        assert_ne!(ab.derive_key("hush test v1"), ac.derive_key("hush test v1"));
    }

    #[test]
    fn test_derive_key_context_separation() {
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();
        let shared = alice.shared_secret(&bob.public_key());

        assert_ne!(shared.derive_key("context a"), shared.derive_key("context b"));
    }

    #[test]
    fn test_public_key_base64_roundtrip() {
        let key = SecretKey::generate().public_key();
        let restored = PublicKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key, restored);
    }

    #[test]
    fn test_invalid_key_length() {
        assert!(PublicKey::from_bytes(&[0u8; 16]).is_err());
        assert!(SecretKey::from_bytes(&[0u8; 31]).is_err());
    }

    #[test]
    fn test_secret_key_debug_redacted() {
        let key = SecretKey::generate();
        assert!(format!("{:?}", key).contains("REDACTED"));
    }

    #[test]
    fn test_secret_key_roundtrip() {
        let original = SecretKey::generate();
        let public = original.public_key();

        let secret = StaticSecret::from(original.0);
        let restored = SecretKey::from_bytes(&secret.to_bytes()).unwrap();
        assert_eq!(restored.public_key(), public);
    }
}

//! XChaCha20-Poly1305 symmetric encryption.
//!
//! Used for both payload cipher text (under a random master key) and
//! per-recipient boxes (under a key derived from a Diffie-Hellman shared
//! secret).
//!
//! ## Security Notes
//!
//! - Nonces are randomly generated using OsRng
//! - NEVER reuse a nonce with the same key

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{CryptoError, Result};

/// Size of a nonce in bytes (192 bits for XChaCha20).
pub const NONCE_SIZE: usize = 24;

/// A 192-bit nonce for XChaCha20-Poly1305.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create a nonce from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 24 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength {
                expected: NONCE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; NONCE_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the nonce as a byte slice.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Encrypt plaintext under a 256-bit key.
///
/// The authentication tag is appended to the returned ciphertext.
pub fn encrypt(key: &[u8; 32], nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .encrypt(XNonce::from_slice(nonce.as_bytes()), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypt ciphertext under a 256-bit key.
///
/// # Errors
///
/// Returns [`CryptoError::Decryption`] on any failure; the error carries
/// no detail so that a failed trial decryption reveals nothing.
pub fn decrypt(key: &[u8; 32], nonce: &Nonce, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(XNonce::from_slice(nonce.as_bytes()), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key(seed: u8) -> [u8; 32] {
        [seed; 32]
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key(1);
        let nonce = Nonce::generate();
        let plaintext = b"private transaction payload";

        let ciphertext = encrypt(&key, &nonce, plaintext).unwrap();
        let decrypted = decrypt(&key, &nonce, &ciphertext).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let nonce = Nonce::generate();
        let ciphertext = encrypt(&test_key(1), &nonce, b"data").unwrap();

        let result = decrypt(&test_key(2), &nonce, &ciphertext);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_decrypt_wrong_nonce_fails() {
        let key = test_key(1);
        let ciphertext = encrypt(&key, &Nonce::generate(), b"data").unwrap();

        let result = decrypt(&key, &Nonce::generate(), &ciphertext);
        assert!(matches!(result, Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_decrypt_tampered_ciphertext_fails() {
        let key = test_key(1);
        let nonce = Nonce::generate();
        let mut ciphertext = encrypt(&key, &nonce, b"data").unwrap();
        ciphertext[0] ^= 0xFF;

        assert!(decrypt(&key, &nonce, &ciphertext).is_err());
    }

    #[test]
    fn test_nonce_invalid_length() {
        assert!(Nonce::from_bytes(&[0u8; 12]).is_err());
    }

    #[test]
    fn test_nonce_roundtrip() {
        let nonce = Nonce::generate();
        let restored = Nonce::from_bytes(nonce.as_bytes()).unwrap();
        assert_eq!(nonce, restored);
    }
}

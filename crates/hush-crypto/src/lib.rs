//! # hush-crypto
//!
//! Cryptographic primitives for the hush private-transaction mediator.
//!
//! This crate provides:
//!
//! - **Hashing**: BLAKE3 content-addressed digests over cipher text
//! - **Key material**: Curve25519 public/secret keys with base64 wire form
//! - **Symmetric encryption**: XChaCha20-Poly1305 AEAD
//! - **Edge codec**: base64 conversion for all byte fields at API boundaries
//!
//! ## Security
//!
//! Secret material implements `Zeroize` for cleanup on drop. Digest
//! comparison is constant-time. Decryption failures carry no detail about
//! the cause: during trial decryption they only mean "wrong key".

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod b64;
pub mod error;
pub mod hash;
pub mod keys;

pub use aead::{Nonce, NONCE_SIZE};
pub use error::{CryptoError, Result};
pub use hash::MessageHash;
pub use keys::{PublicKey, SecretKey, SharedSecret, KEY_SIZE};

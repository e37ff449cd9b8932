//! # hush-payload
//!
//! The canonical envelope for one private transaction and its binary
//! codec.
//!
//! An [`EncodedPayload`] carries the opaque cipher text, one key-wrapping
//! box per recipient, the privacy mode, and the references to prior
//! private transactions the new one depends on (affected contract
//! transactions). Envelopes reference each other by content-addressed
//! hash only, never by pointer, so the dependency graph is acyclic by
//! construction.
//!
//! The codec is canonical: `encode(decode(bytes)) == bytes` for any
//! well-formed input, which matters because stored bytes are re-encoded
//! after pruning invalid affected-transaction entries and the hash
//! identity of the cipher text must survive.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod affected;
pub mod error;
pub mod payload;
pub mod privacy;

pub use affected::{SecurityHash, TxHash};
pub use error::{PayloadError, Result};
pub use payload::{EncodedPayload, EncodedPayloadBuilder};
pub use privacy::PrivacyMode;

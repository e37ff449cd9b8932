//! # hush-store
//!
//! Storage for encrypted private transactions.
//!
//! Two record kinds are persisted:
//!
//! - [`EncryptedTransaction`]: a finalized envelope, keyed by the digest
//!   of its cipher text. Created on send or on inbound store, read by
//!   receive and resend, removed only by delete.
//! - [`EncryptedRawTransaction`]: a pre-encrypted payload held only on
//!   the originating node until a signed send references it.
//!
//! The [`TransactionStore`] and [`RawTransactionStore`] traits abstract
//! the backend; an in-memory implementation serves tests and embedded
//! use, and a sled implementation provides durability.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod records;
pub mod sled_backend;
pub mod store;

pub use error::{Result, StoreError};
pub use records::{EncryptedRawTransaction, EncryptedTransaction};
pub use sled_backend::{SledRawStore, SledStores, SledTransactionStore};
pub use store::{
    InMemoryRawStore, InMemoryTransactionStore, RawTransactionStore, TransactionStore,
};

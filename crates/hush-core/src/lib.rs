//! # hush-core
//!
//! The transaction mediator: the in-process component that encrypts,
//! stores, distributes, retrieves, and validates private payloads for a
//! consortium-chain node.
//!
//! ## Architecture
//!
//! ```text
//!             +--------------------+
//!  requests   | TransactionManager |   publishes
//! ----------> |                    | -----------> PayloadPublisher
//!             |  validation rules  |
//!             +---------+----------+
//!                 |           |
//!          Enclave (crypto)   TransactionStore / RawTransactionStore
//! ```
//!
//! All five public operations pass through the [`TransactionManager`],
//! which validates against the private-state rules, asks the [`Enclave`]
//! to transform, persists, and then fans out per-recipient projections.
//! Peers are best-effort: the local store is the store of record, and a
//! flaky peer can never roll it back.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod enclave;
pub mod error;
pub mod manager;
pub mod publish;
pub mod validation;

pub use api::{
    DeleteRequest, ReceiveRequest, ReceiveResponse, ResendRequest, ResendRequestType,
    ResendResponse, SendRequest, SendResponse, SendSignedRequest, StoreRawRequest,
    StoreRawResponse,
};
pub use config::MediatorConfig;
pub use enclave::{Enclave, EnclaveError, LocalEnclave, RawTransaction};
pub use error::{MediatorError, Result};
pub use manager::TransactionManager;
pub use publish::{PayloadPublisher, PublishError, ResendSink};

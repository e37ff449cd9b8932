//! Outbound seams: publishing to peers and reconciling own messages.
//!
//! Both traits are implemented by external collaborators (the party-info
//! service and the resend manager). Publish failures are always
//! best-effort from the mediator's point of view: peers may be offline,
//! the local store is the store of record, and peers reconcile through
//! their own resend.

use async_trait::async_trait;
use hush_crypto::PublicKey;
use hush_payload::EncodedPayload;
use thiserror::Error;

/// Failure to hand a payload to a peer or sink.
#[derive(Error, Debug)]
#[error("Publish to {recipient} failed: {reason}")]
pub struct PublishError {
    /// Base64 form of the target key.
    pub recipient: String,
    /// What went wrong, for the log line.
    pub reason: String,
}

impl PublishError {
    /// Create a publish error.
    pub fn new(recipient: &PublicKey, reason: impl Into<String>) -> Self {
        Self {
            recipient: recipient.to_base64(),
            reason: reason.into(),
        }
    }
}

/// Delivers one envelope to one peer key.
#[async_trait]
pub trait PayloadPublisher: Send + Sync {
    /// Publish a (projected) payload to the node holding `recipient`.
    async fn publish(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> std::result::Result<(), PublishError>;
}

/// Accepts an inbound payload that this node originally sent.
///
/// When a peer forwards back a payload whose sender key is ours, the
/// mediator does not persist it directly; the sink owns the
/// reconciliation decision.
#[async_trait]
pub trait ResendSink: Send + Sync {
    /// Hand over the original encoded bytes of an own-origin message.
    async fn accept_own_message(&self, encoded: &[u8]) -> std::result::Result<(), PublishError>;
}

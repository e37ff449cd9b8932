//! Request and response shapes for the public operations.
//!
//! Byte fields cross this boundary as base64 strings; raw payload bytes
//! travel as-is. Decoding happens inside the mediator so that callers
//! (an HTTP façade, tests) stay byte-agnostic.

use serde::{Deserialize, Serialize};

/// Request to encrypt and distribute a new private transaction.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SendRequest {
    /// The plaintext payload to protect.
    pub payload: Vec<u8>,
    /// Base64 sender key; the enclave's default key when absent.
    pub from: Option<String>,
    /// Base64 recipient keys.
    pub to: Vec<String>,
    /// Privacy-mode wire flag.
    pub privacy_flag: u8,
    /// Execution hash, required for private state validation.
    pub exec_hash: Option<String>,
    /// Base64 hashes of the transactions this one depends on.
    pub affected_contract_transactions: Vec<String>,
}

/// Response to a send: the content-addressed key of the stored record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendResponse {
    /// Base64 transaction hash.
    pub key: String,
}

/// Request to wrap a previously stored raw transaction for recipients.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SendSignedRequest {
    /// Base64 hash of the stored raw transaction.
    pub hash: String,
    /// Base64 recipient keys.
    pub to: Vec<String>,
    /// Privacy-mode wire flag.
    pub privacy_flag: u8,
    /// Execution hash, required for private state validation.
    pub exec_hash: Option<String>,
    /// Base64 hashes of the transactions this one depends on.
    pub affected_contract_transactions: Vec<String>,
}

/// Request to decrypt a stored transaction.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReceiveRequest {
    /// Base64 transaction hash.
    pub key: String,
    /// Base64 recipient key; trial decryption over the enclave's keys
    /// when absent.
    pub to: Option<String>,
}

/// Response to a receive: the decrypted payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReceiveResponse {
    /// The plaintext.
    pub payload: Vec<u8>,
}

/// Request to store a raw transaction for a later signed send.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreRawRequest {
    /// The plaintext payload to protect.
    pub payload: Vec<u8>,
    /// Base64 sender key; the enclave's default key when absent.
    pub from: Option<String>,
}

/// Response to a raw store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreRawResponse {
    /// Base64 hash of the stored raw transaction.
    pub key: String,
}

/// Request to delete a stored transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Base64 transaction hash.
    pub key: String,
}

/// Which resend behavior a peer is asking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResendRequestType {
    /// Backfill: publish every stored payload relevant to the peer.
    All,
    /// Return one payload to the caller without publishing.
    Individual,
}

/// Request to resend stored payloads to a peer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResendRequest {
    /// Bulk backfill or a single lookup.
    pub request_type: ResendRequestType,
    /// Base64 key of the peer being served.
    pub public_key: String,
    /// Base64 transaction hash; required for individual resend.
    pub key: Option<String>,
}

/// Response to a resend.
///
/// Empty for bulk backfill; carries the encoded payload for individual
/// resend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResendResponse {
    /// Encoded payload bytes, present only for individual resend.
    pub payload: Option<Vec<u8>>,
}

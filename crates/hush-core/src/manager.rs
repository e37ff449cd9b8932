//! The transaction mediator.
//!
//! Normalises calls between the enclave, the stores, and the publisher.
//! Every public operation validates first, persists second, and
//! publishes last, so a peer that calls straight back after a publish
//! always sees the stored record.
//!
//! ## Outbound vs. inbound strictness
//!
//! The same private-state rules are enforced in both directions, but
//! their failure modes differ on purpose:
//!
//! - outbound (`send`, `send_signed_transaction`): every broken rule is
//!   fatal, since the caller is local and can fix its request;
//! - inbound (`store_payload`): a payload referencing transactions we
//!   hold under a different privacy mode, or whose claimed references we
//!   cannot fully resolve, is dropped *silently* (the hash is returned,
//!   nothing persists). Answering differently for "have it" and "don't
//!   have it" would let an adversary probe which transactions this node
//!   stores. Only a recipient-set mismatch or a bad security hash under
//!   private state validation surfaces as a violation.

use std::collections::BTreeMap;
use std::sync::Arc;

use hush_crypto::{MessageHash, PublicKey};
use hush_payload::{EncodedPayload, PrivacyMode, TxHash};
use hush_store::{
    EncryptedRawTransaction, EncryptedTransaction, RawTransactionStore, TransactionStore,
};
use tracing::{debug, info, warn};

use crate::api::{
    DeleteRequest, ReceiveRequest, ReceiveResponse, ResendRequest, ResendRequestType,
    ResendResponse, SendRequest, SendResponse, SendSignedRequest, StoreRawRequest,
    StoreRawResponse,
};
use crate::config::MediatorConfig;
use crate::enclave::Enclave;
use crate::publish::{PayloadPublisher, ResendSink};
use crate::validation::{find_privacy_mode_mismatch, recipients_equal, sender_is_genuine};
use crate::{MediatorError, Result};

/// Mediator for private transactions: encrypts, stores, distributes,
/// retrieves, and validates payloads on behalf of one node.
///
/// Holds no mutable state; all dependencies are shared immutable
/// handles, so one instance serves every concurrent request.
pub struct TransactionManager {
    transactions: Arc<dyn TransactionStore>,
    raw_transactions: Arc<dyn RawTransactionStore>,
    enclave: Arc<dyn Enclave>,
    publisher: Arc<dyn PayloadPublisher>,
    resend_sink: Arc<dyn ResendSink>,
    resend_fetch_size: usize,
}

impl TransactionManager {
    /// Wire up a mediator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        raw_transactions: Arc<dyn RawTransactionStore>,
        enclave: Arc<dyn Enclave>,
        publisher: Arc<dyn PayloadPublisher>,
        resend_sink: Arc<dyn ResendSink>,
        config: MediatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transactions,
            raw_transactions,
            enclave,
            publisher,
            resend_sink,
            resend_fetch_size: config.resend_fetch_size,
        })
    }

    /// Encrypt, persist, and distribute a new private transaction.
    ///
    /// The stored record's key (returned base64-encoded) is the digest
    /// of the cipher text, so every node that receives the payload
    /// derives the same key independently.
    pub async fn send(&self, request: SendRequest) -> Result<SendResponse> {
        let sender = match request.from.as_deref() {
            Some(encoded) => PublicKey::from_base64(encoded)?,
            None => self.enclave.default_public_key(),
        };

        let mut to = Vec::with_capacity(request.to.len());
        for encoded in &request.to {
            to.push(PublicKey::from_base64(encoded)?);
        }
        let recipients = assemble_recipients(to, &sender, self.enclave.forwarding_keys());

        let privacy_mode = PrivacyMode::from_flag(request.privacy_flag)?;
        // Outbound invariant: the execution hash travels only under
        // private state validation; it is zero-length otherwise.
        let exec_hash = if privacy_mode.is_psv() {
            request.exec_hash.map(String::into_bytes).unwrap_or_default()
        } else {
            Vec::new()
        };

        let affected = self
            .resolve_outbound(&request.affected_contract_transactions)
            .await?;
        validate_outbound(privacy_mode, &recipients, &affected)?;

        let payload = self.enclave.encrypt_payload(
            &request.payload,
            &sender,
            &recipients,
            privacy_mode,
            &affected,
            &exec_hash,
        )?;

        let hash = payload.message_hash();
        self.transactions
            .save(EncryptedTransaction::new(hash.clone(), payload.encode()?))
            .await?;
        info!(%hash, recipients = recipients.len(), "stored outbound transaction");

        self.fan_out(&payload, &recipients).await;

        Ok(SendResponse {
            key: hash.to_base64(),
        })
    }

    /// Wrap a previously stored raw transaction for real recipients and
    /// distribute it.
    ///
    /// The cipher text of the raw transaction is reused, so the
    /// transaction keeps the hash assigned when the raw payload was
    /// stored.
    pub async fn send_signed_transaction(
        &self,
        request: SendSignedRequest,
    ) -> Result<SendResponse> {
        let raw_hash = MessageHash::from_base64(&request.hash)?;
        let raw = self
            .raw_transactions
            .retrieve_by_hash(&raw_hash)
            .await?
            .ok_or_else(|| MediatorError::TransactionNotFound {
                hash: request.hash.clone(),
            })?;

        let sender = raw.sender.clone();
        let mut to = Vec::with_capacity(request.to.len());
        for encoded in &request.to {
            to.push(PublicKey::from_base64(encoded)?);
        }
        let recipients = assemble_recipients(to, &sender, self.enclave.forwarding_keys());

        let privacy_mode = PrivacyMode::from_flag(request.privacy_flag)?;
        let exec_hash = if privacy_mode.is_psv() {
            request.exec_hash.map(String::into_bytes).unwrap_or_default()
        } else {
            Vec::new()
        };

        let affected = self
            .resolve_outbound(&request.affected_contract_transactions)
            .await?;
        validate_outbound(privacy_mode, &recipients, &affected)?;

        let payload = self.enclave.encrypt_signed_payload(
            &raw,
            &recipients,
            privacy_mode,
            &affected,
            &exec_hash,
        )?;

        let hash = payload.message_hash();
        self.transactions
            .save(EncryptedTransaction::new(hash.clone(), payload.encode()?))
            .await?;
        info!(%hash, "stored signed transaction");

        self.fan_out(&payload, &recipients).await;

        Ok(SendResponse {
            key: hash.to_base64(),
        })
    }

    /// Accept an envelope forwarded by another node.
    ///
    /// Returns the transaction hash on every non-error path, including
    /// the silent drops described at the module level: the caller cannot
    /// tell a dropped payload from a stored one.
    pub async fn store_payload(&self, input: &[u8]) -> Result<MessageHash> {
        let payload = EncodedPayload::decode(input)?;
        let hash = payload.message_hash();

        let claimed: Vec<TxHash> = payload
            .affected_contract_transactions()
            .keys()
            .cloned()
            .collect();
        let affected = self.resolve_inbound(&claimed).await?;

        if let Some(mismatch) = find_privacy_mode_mismatch(payload.privacy_mode(), &affected) {
            info!(
                %hash,
                affected = %mismatch,
                "privacy mode differs from referenced transaction; ignoring payload"
            );
            return Ok(hash);
        }

        if payload.privacy_mode().is_psv() {
            if !sender_is_genuine(payload.sender_key(), claimed.len(), &affected) {
                info!(%hash, "sender could not be tied to every referenced transaction; ignoring payload");
                return Ok(hash);
            }
            for (tx_hash, affected_tx) in &affected {
                if !recipients_equal(payload.recipient_keys(), affected_tx.recipient_keys()) {
                    return Err(MediatorError::PrivacyViolation(format!(
                        "recipients mismatched for affected transaction {} referenced by {}",
                        tx_hash, hash
                    )));
                }
            }
        }

        let invalid = self.enclave.find_invalid_security_hashes(&payload, &affected);
        let stored_bytes = if invalid.is_empty() {
            input.to_vec()
        } else {
            if payload.privacy_mode().is_psv() {
                let list = invalid
                    .iter()
                    .map(TxHash::to_base64)
                    .collect::<Vec<_>>()
                    .join(",");
                return Err(MediatorError::PrivacyViolation(format!(
                    "invalid security hashes on transaction {}: {}",
                    hash, list
                )));
            }
            let invalid: Vec<TxHash> = invalid.into_iter().collect();
            debug!(
                %hash,
                discarded = invalid.len(),
                "discarded affected-transaction entries with invalid security hashes"
            );
            payload.clone().without_affected(&invalid).encode()?
        };

        if self.enclave.public_keys().contains(payload.sender_key()) {
            // Our own transaction coming back from a peer: the resend
            // manager owns the reconciliation decision, and it gets the
            // bytes exactly as they arrived.
            self.resend_sink
                .accept_own_message(input)
                .await
                .map_err(|e| MediatorError::Internal(e.to_string()))?;
        } else {
            self.transactions
                .save(EncryptedTransaction::new(hash.clone(), stored_bytes))
                .await?;
            info!(%hash, "stored payload");
        }

        Ok(hash)
    }

    /// Decrypt a stored transaction.
    pub async fn receive(&self, request: ReceiveRequest) -> Result<ReceiveResponse> {
        let hash = MessageHash::from_base64(&request.key)?;
        debug!(%hash, "lookup transaction");

        let record = self
            .transactions
            .retrieve_by_hash(&hash)
            .await?
            .ok_or_else(|| MediatorError::TransactionNotFound {
                hash: request.key.clone(),
            })?;
        let payload = EncodedPayload::decode(&record.encoded_payload)?;

        let recipient = match request.to.as_deref().filter(|to| !to.is_empty()) {
            Some(to) => PublicKey::from_base64(to)?,
            None => self.search_for_recipient_key(&payload).ok_or_else(|| {
                MediatorError::NoRecipientKeyFound {
                    hash: request.key.clone(),
                }
            })?,
        };

        let plaintext = self.enclave.decrypt_payload(&payload, &recipient)?;
        Ok(ReceiveResponse { payload: plaintext })
    }

    /// Encrypt a payload for its sender only and hold it for a later
    /// signed send.
    pub async fn store(&self, request: StoreRawRequest) -> Result<StoreRawResponse> {
        let sender = match request.from.as_deref() {
            Some(encoded) => PublicKey::from_base64(encoded)?,
            None => self.enclave.default_public_key(),
        };

        let raw = self.enclave.encrypt_raw(&request.payload, &sender)?;
        let hash = MessageHash::from_cipher_text(&raw.encrypted_payload);

        self.raw_transactions
            .save(EncryptedRawTransaction {
                hash: hash.clone(),
                encrypted_payload: raw.encrypted_payload,
                encrypted_key: raw.encrypted_key,
                nonce: raw.nonce,
                sender: raw.from,
            })
            .await?;

        Ok(StoreRawResponse {
            key: hash.to_base64(),
        })
    }

    /// Delete a stored transaction. Idempotent; publishes nothing.
    pub async fn delete(&self, request: DeleteRequest) -> Result<()> {
        let hash = MessageHash::from_base64(&request.key)?;
        info!(%hash, "received request to delete transaction");
        self.transactions.delete(&hash).await?;
        Ok(())
    }

    /// Serve a peer's resend request: bulk backfill or a single payload.
    pub async fn resend(&self, request: ResendRequest) -> Result<ResendResponse> {
        let recipient = PublicKey::from_base64(&request.public_key)?;

        match request.request_type {
            ResendRequestType::All => {
                self.resend_all(&recipient).await?;
                Ok(ResendResponse::default())
            }
            ResendRequestType::Individual => {
                let key = request.key.as_deref().ok_or_else(|| {
                    MediatorError::Internal(
                        "individual resend requires a transaction key".to_string(),
                    )
                })?;
                let payload = self.resend_individual(&recipient, key).await?;
                Ok(ResendResponse {
                    payload: Some(payload),
                })
            }
        }
    }

    /// Page through the whole store, republishing everything the peer is
    /// entitled to.
    ///
    /// At-least-once semantics: publish failures are logged and the scan
    /// moves on; content addressing makes duplicates harmless on the
    /// receiving side.
    async fn resend_all(&self, recipient: &PublicKey) -> Result<()> {
        let total = self.transactions.count().await?;
        let mut offset = 0;

        while offset < total {
            let page = self
                .transactions
                .retrieve_page(offset, self.resend_fetch_size)
                .await?;

            for record in page {
                let payload = EncodedPayload::decode(&record.encoded_payload)?;
                let is_sender = payload.sender_key() == recipient;
                let is_recipient = payload.recipient_keys().contains(recipient);
                if !is_sender && !is_recipient {
                    continue;
                }

                let outgoing = if is_sender {
                    // The peer sent this payload; it is going back to its
                    // author, so nothing in it needs pruning. Recover the
                    // recipient key discovered at decrypt time and attach
                    // it so the author can open its own envelope.
                    let recovered =
                        self.search_for_recipient_key(&payload).ok_or_else(|| {
                            MediatorError::KeyNotFound(format!(
                                "no key found as recipient of message {}",
                                record.hash
                            ))
                        })?;
                    payload.with_recipient(recovered)
                } else {
                    payload.for_recipient(recipient)?
                };

                if let Err(error) = self.publisher.publish(&outgoing, recipient).await {
                    warn!(%error, "unable to publish payload during resend");
                }
            }

            offset += self.resend_fetch_size;
        }

        Ok(())
    }

    /// Return one stored payload to the caller without publishing it.
    async fn resend_individual(&self, recipient: &PublicKey, key: &str) -> Result<Vec<u8>> {
        let hash = MessageHash::from_base64(key)?;
        let record = self
            .transactions
            .retrieve_by_hash(&hash)
            .await?
            .ok_or_else(|| MediatorError::TransactionNotFound {
                hash: key.to_string(),
            })?;
        let payload = EncodedPayload::decode(&record.encoded_payload)?;

        let outgoing = if payload.sender_key() == recipient {
            let recovered = self.search_for_recipient_key(&payload).ok_or_else(|| {
                MediatorError::Internal(format!(
                    "unable to recover a recipient key for message {}",
                    hash
                ))
            })?;
            payload.with_recipient(recovered)
        } else {
            payload.for_recipient(recipient)?
        };

        Ok(outgoing.encode()?)
    }

    /// Trial-decrypt with every enclave key until one opens the payload.
    ///
    /// Decryption failures are expected here and carry no signal beyond
    /// "wrong key"; they never surface.
    fn search_for_recipient_key(&self, payload: &EncodedPayload) -> Option<PublicKey> {
        for candidate in self.enclave.public_keys() {
            match self.enclave.decrypt_payload(payload, &candidate) {
                Ok(_) => return Some(candidate),
                Err(_) => {
                    debug!("attempted payload decryption using wrong key, discarding");
                }
            }
        }
        None
    }

    /// Publish a per-recipient projection to every remote recipient,
    /// best-effort. Keys managed by the local enclave need no publish;
    /// the record is already in their store.
    async fn fan_out(&self, payload: &EncodedPayload, recipients: &[PublicKey]) {
        let local_keys = self.enclave.public_keys();
        for recipient in recipients {
            if local_keys.contains(recipient) {
                continue;
            }
            let outgoing = match payload.for_recipient(recipient) {
                Ok(outgoing) => outgoing,
                Err(error) => {
                    warn!(%error, "skipping recipient during fan-out");
                    continue;
                }
            };
            if let Err(error) = self.publisher.publish(&outgoing, recipient).await {
                warn!(%error, "unable to publish payload; peer will reconcile via resend");
            }
        }
    }

    /// Resolve outbound affected-transaction references; every one of
    /// them must exist locally.
    async fn resolve_outbound(
        &self,
        encoded: &[String],
    ) -> Result<BTreeMap<TxHash, EncodedPayload>> {
        let mut affected = BTreeMap::new();
        for entry in encoded {
            let tx_hash = TxHash::from_base64(entry)?;
            let record = self
                .transactions
                .retrieve_by_hash(&MessageHash::from(&tx_hash))
                .await?
                .ok_or_else(|| {
                    MediatorError::PrivacyViolation(format!(
                        "unable to find affected contract transaction {}",
                        entry
                    ))
                })?;
            affected.insert(tx_hash, EncodedPayload::decode(&record.encoded_payload)?);
        }
        Ok(affected)
    }

    /// Resolve inbound affected-transaction references; missing entries
    /// are logged and omitted so eventually-consistent backfill can fill
    /// them in later.
    async fn resolve_inbound(
        &self,
        claimed: &[TxHash],
    ) -> Result<BTreeMap<TxHash, EncodedPayload>> {
        let mut affected = BTreeMap::new();
        for tx_hash in claimed {
            match self
                .transactions
                .retrieve_by_hash(&MessageHash::from(tx_hash))
                .await?
            {
                Some(record) => {
                    affected.insert(
                        tx_hash.clone(),
                        EncodedPayload::decode(&record.encoded_payload)?,
                    );
                }
                None => {
                    debug!(affected = %tx_hash, "referenced transaction not held locally");
                }
            }
        }
        Ok(affected)
    }
}

/// Assemble the outbound recipient list: requested recipients, then the
/// sender, then the enclave's forwarding keys, first occurrence winning.
fn assemble_recipients(
    to: Vec<PublicKey>,
    sender: &PublicKey,
    forwarding: Vec<PublicKey>,
) -> Vec<PublicKey> {
    let mut recipients = Vec::with_capacity(to.len() + forwarding.len() + 1);
    for key in to.into_iter().chain([sender.clone()]).chain(forwarding) {
        if !recipients.contains(&key) {
            recipients.push(key);
        }
    }
    recipients
}

/// Outbound validation: mode agreement always, recipient-set equality
/// under private state validation. Every failure is fatal.
fn validate_outbound(
    mode: PrivacyMode,
    recipients: &[PublicKey],
    affected: &BTreeMap<TxHash, EncodedPayload>,
) -> Result<()> {
    if let Some(mismatch) = find_privacy_mode_mismatch(mode, affected) {
        return Err(MediatorError::PrivacyViolation(format!(
            "privacy mode mismatched with affected transaction {}",
            mismatch
        )));
    }

    if mode.is_psv() {
        for (tx_hash, affected_tx) in affected {
            if !recipients_equal(recipients, affected_tx.recipient_keys()) {
                return Err(MediatorError::PrivacyViolation(format!(
                    "recipients mismatched for affected transaction {}",
                    tx_hash
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> PublicKey {
        PublicKey::from_bytes(&[seed; 32]).unwrap()
    }

    #[test]
    fn test_assemble_recipients_dedups_first_seen() {
        let sender = key(1);
        let recipients = assemble_recipients(
            vec![key(2), key(1), key(3)],
            &sender,
            vec![key(3), key(4)],
        );
        assert_eq!(recipients, vec![key(2), key(1), key(3), key(4)]);
    }

    #[test]
    fn test_assemble_recipients_always_includes_sender() {
        let sender = key(1);
        let recipients = assemble_recipients(vec![key(2)], &sender, Vec::new());
        assert_eq!(recipients, vec![key(2), key(1)]);
    }

    #[test]
    fn test_assemble_recipients_empty_to() {
        let sender = key(1);
        let recipients = assemble_recipients(Vec::new(), &sender, Vec::new());
        assert_eq!(recipients, vec![key(1)]);
    }
}

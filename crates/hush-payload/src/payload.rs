//! The canonical envelope for one private transaction.
//!
//! ## Envelope Structure
//!
//! ```text
//! +---------------------------+
//! | sender_key                | 32 bytes - originating party
//! +---------------------------+
//! | cipher_text               | Variable - opaque to this crate
//! +---------------------------+
//! | cipher_text_nonce         | 24 bytes
//! +---------------------------+
//! | recipient_boxes           | One wrapped master key per recipient;
//! | recipient_keys            | positions align between the two lists
//! +---------------------------+
//! | recipient_nonce           | 24 bytes - shared by all boxes
//! +---------------------------+
//! | privacy_mode              | Validation rules in force
//! | affected_contract_txns    | TxHash -> SecurityHash, key-ordered
//! | exec_hash                 | Empty unless private state validation
//! +---------------------------+
//! ```
//!
//! Recipient keys may be empty on an inbound payload before key
//! discovery; the box list then carries a single entry for the local
//! node.

use std::collections::BTreeMap;

use bincode::Options;
use hush_crypto::{MessageHash, Nonce, PublicKey};
use serde::{Deserialize, Serialize};

use crate::{PayloadError, PrivacyMode, Result, SecurityHash, TxHash};

/// Codec options: fixed-width integers, trailing bytes rejected, so that
/// every well-formed byte string has exactly one decoding.
fn codec() -> impl Options {
    bincode::options().with_fixint_encoding()
}

/// One private transaction as it travels between nodes and rests on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPayload {
    /// Public key of the originating party.
    sender_key: PublicKey,

    /// Opaque cipher text; its digest is the transaction's identity.
    cipher_text: Vec<u8>,

    /// Nonce under which the cipher text was sealed.
    cipher_text_nonce: Nonce,

    /// Master key wrapped once per recipient; positions align with
    /// `recipient_keys` whenever both lists are non-empty.
    recipient_boxes: Vec<Vec<u8>>,

    /// Nonce shared by all recipient boxes.
    recipient_nonce: Nonce,

    /// Ordered recipients. May be empty for inbound payloads before key
    /// discovery.
    recipient_keys: Vec<PublicKey>,

    /// Which validation rules the payload demands.
    privacy_mode: PrivacyMode,

    /// Prior transactions this one depends on. Key-ordered map so the
    /// encoding is canonical.
    affected_contract_transactions: BTreeMap<TxHash, SecurityHash>,

    /// Execution hash; zero-length unless the mode is private state
    /// validation.
    exec_hash: Vec<u8>,
}

impl EncodedPayload {
    /// Start building a payload.
    pub fn builder() -> EncodedPayloadBuilder {
        EncodedPayloadBuilder::default()
    }

    /// Public key of the originating party.
    pub fn sender_key(&self) -> &PublicKey {
        &self.sender_key
    }

    /// The opaque cipher text.
    pub fn cipher_text(&self) -> &[u8] {
        &self.cipher_text
    }

    /// Nonce under which the cipher text was sealed.
    pub fn cipher_text_nonce(&self) -> &Nonce {
        &self.cipher_text_nonce
    }

    /// Per-recipient key boxes.
    pub fn recipient_boxes(&self) -> &[Vec<u8>] {
        &self.recipient_boxes
    }

    /// Nonce shared by all recipient boxes.
    pub fn recipient_nonce(&self) -> &Nonce {
        &self.recipient_nonce
    }

    /// Ordered recipient keys.
    pub fn recipient_keys(&self) -> &[PublicKey] {
        &self.recipient_keys
    }

    /// The privacy mode in force.
    pub fn privacy_mode(&self) -> PrivacyMode {
        self.privacy_mode
    }

    /// References to the prior transactions this one depends on.
    pub fn affected_contract_transactions(&self) -> &BTreeMap<TxHash, SecurityHash> {
        &self.affected_contract_transactions
    }

    /// Execution hash (empty unless private state validation).
    pub fn exec_hash(&self) -> &[u8] {
        &self.exec_hash
    }

    /// The content-addressed identity of this payload.
    pub fn message_hash(&self) -> MessageHash {
        MessageHash::from_cipher_text(&self.cipher_text)
    }

    /// Encode to the canonical binary form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        codec()
            .serialize(self)
            .map_err(|e| PayloadError::Serialization(e.to_string()))
    }

    /// Decode from the canonical binary form.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] on any structural error,
    /// including misaligned recipient lists.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let payload: Self = codec()
            .deserialize(bytes)
            .map_err(|e| PayloadError::Malformed(e.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Project this payload down to a single recipient.
    ///
    /// The result carries exactly `[target]` as its recipient list and
    /// the one box at the target's original position; every other field
    /// is unchanged, including the affected-transaction map. This is the
    /// privacy-preserving transform applied before a payload crosses the
    /// wire: other recipients' boxes never leave the node.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::RecipientNotInPayload`] if `target` is not
    /// among the recipients.
    pub fn for_recipient(&self, target: &PublicKey) -> Result<EncodedPayload> {
        let index = self
            .recipient_keys
            .iter()
            .position(|key| key == target)
            .ok_or_else(|| PayloadError::RecipientNotInPayload {
                recipient: target.to_base64(),
            })?;

        Ok(EncodedPayload {
            sender_key: self.sender_key.clone(),
            cipher_text: self.cipher_text.clone(),
            cipher_text_nonce: self.cipher_text_nonce.clone(),
            recipient_boxes: vec![self.recipient_boxes[index].clone()],
            recipient_nonce: self.recipient_nonce.clone(),
            recipient_keys: vec![target.clone()],
            privacy_mode: self.privacy_mode,
            affected_contract_transactions: self.affected_contract_transactions.clone(),
            exec_hash: self.exec_hash.clone(),
        })
    }

    /// Append a recipient key recovered after the fact.
    ///
    /// Used during resend of a peer's own payload: the stored envelope
    /// has no recipient keys (they were discovered at decrypt time), so
    /// the recovered key is attached before the envelope goes back out.
    pub fn with_recipient(mut self, key: PublicKey) -> Self {
        self.recipient_keys.push(key);
        self
    }

    /// Drop the named entries from the affected-transaction map.
    ///
    /// The cipher text is untouched, so the payload keeps its hash
    /// identity even though the encoded bytes change.
    pub fn without_affected(mut self, invalid: &[TxHash]) -> Self {
        for tx_hash in invalid {
            self.affected_contract_transactions.remove(tx_hash);
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.recipient_keys.is_empty()
            && !self.recipient_boxes.is_empty()
            && self.recipient_keys.len() != self.recipient_boxes.len()
        {
            return Err(PayloadError::Malformed(format!(
                "{} recipient keys but {} boxes",
                self.recipient_keys.len(),
                self.recipient_boxes.len()
            )));
        }
        Ok(())
    }
}

/// Builder for [`EncodedPayload`].
#[derive(Default)]
pub struct EncodedPayloadBuilder {
    sender_key: Option<PublicKey>,
    cipher_text: Option<Vec<u8>>,
    cipher_text_nonce: Option<Nonce>,
    recipient_boxes: Vec<Vec<u8>>,
    recipient_nonce: Option<Nonce>,
    recipient_keys: Vec<PublicKey>,
    privacy_mode: PrivacyMode,
    affected_contract_transactions: BTreeMap<TxHash, SecurityHash>,
    exec_hash: Vec<u8>,
}

impl EncodedPayloadBuilder {
    /// Set the sender key.
    pub fn sender_key(mut self, key: PublicKey) -> Self {
        self.sender_key = Some(key);
        self
    }

    /// Set the cipher text.
    pub fn cipher_text(mut self, cipher_text: Vec<u8>) -> Self {
        self.cipher_text = Some(cipher_text);
        self
    }

    /// Set the cipher-text nonce.
    pub fn cipher_text_nonce(mut self, nonce: Nonce) -> Self {
        self.cipher_text_nonce = Some(nonce);
        self
    }

    /// Set the recipient boxes.
    pub fn recipient_boxes(mut self, boxes: Vec<Vec<u8>>) -> Self {
        self.recipient_boxes = boxes;
        self
    }

    /// Set the recipient nonce.
    pub fn recipient_nonce(mut self, nonce: Nonce) -> Self {
        self.recipient_nonce = Some(nonce);
        self
    }

    /// Set the recipient keys.
    pub fn recipient_keys(mut self, keys: Vec<PublicKey>) -> Self {
        self.recipient_keys = keys;
        self
    }

    /// Set the privacy mode (defaults to standard private).
    pub fn privacy_mode(mut self, mode: PrivacyMode) -> Self {
        self.privacy_mode = mode;
        self
    }

    /// Set the affected-transaction map.
    pub fn affected_contract_transactions(
        mut self,
        affected: BTreeMap<TxHash, SecurityHash>,
    ) -> Self {
        self.affected_contract_transactions = affected;
        self
    }

    /// Set the execution hash.
    pub fn exec_hash(mut self, exec_hash: Vec<u8>) -> Self {
        self.exec_hash = exec_hash;
        self
    }

    /// Build the payload.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] if a required field is missing
    /// or the recipient lists are misaligned.
    pub fn build(self) -> Result<EncodedPayload> {
        let sender_key = self
            .sender_key
            .ok_or_else(|| PayloadError::Malformed("missing sender_key".to_string()))?;
        let cipher_text = self
            .cipher_text
            .ok_or_else(|| PayloadError::Malformed("missing cipher_text".to_string()))?;
        let cipher_text_nonce = self
            .cipher_text_nonce
            .ok_or_else(|| PayloadError::Malformed("missing cipher_text_nonce".to_string()))?;
        let recipient_nonce = self
            .recipient_nonce
            .ok_or_else(|| PayloadError::Malformed("missing recipient_nonce".to_string()))?;

        let payload = EncodedPayload {
            sender_key,
            cipher_text,
            cipher_text_nonce,
            recipient_boxes: self.recipient_boxes,
            recipient_nonce,
            recipient_keys: self.recipient_keys,
            privacy_mode: self.privacy_mode,
            affected_contract_transactions: self.affected_contract_transactions,
            exec_hash: self.exec_hash,
        };
        payload.validate()?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hush_crypto::SecretKey;

    fn test_key(seed: u8) -> PublicKey {
        PublicKey::from_bytes(&[seed; 32]).unwrap()
    }

    fn test_payload(recipients: Vec<PublicKey>) -> EncodedPayload {
        let boxes = (0..recipients.len())
            .map(|i| vec![i as u8; 48])
            .collect::<Vec<_>>();
        EncodedPayload::builder()
            .sender_key(test_key(1))
            .cipher_text(b"cipher text".to_vec())
            .cipher_text_nonce(Nonce::generate())
            .recipient_boxes(boxes)
            .recipient_nonce(Nonce::generate())
            .recipient_keys(recipients)
            .build()
            .unwrap()
    }

    #[test]
    fn test_codec_roundtrip() {
        let payload = test_payload(vec![test_key(2), test_key(3)]);
        let bytes = payload.encode().unwrap();
        let restored = EncodedPayload::decode(&bytes).unwrap();
        assert_eq!(payload, restored);
    }

    #[test]
    fn test_encode_is_canonical() {
        let payload = test_payload(vec![test_key(2)]);
        let bytes = payload.encode().unwrap();
        let reencoded = EncodedPayload::decode(&bytes).unwrap().encode().unwrap();
        assert_eq!(bytes, reencoded);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            EncodedPayload::decode(&[0xFF; 40]),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_misaligned_recipients() {
        let mut payload = test_payload(vec![test_key(2), test_key(3)]);
        payload.recipient_boxes.pop();
        let bytes = codec().serialize(&payload).unwrap();
        assert!(EncodedPayload::decode(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let payload = test_payload(vec![test_key(2)]);
        let mut bytes = payload.encode().unwrap();
        bytes.push(0);
        assert!(EncodedPayload::decode(&bytes).is_err());
    }

    #[test]
    fn test_for_recipient_projects_single_box() {
        let payload = test_payload(vec![test_key(2), test_key(3), test_key(4)]);
        let target = test_key(3);

        let projected = payload.for_recipient(&target).unwrap();

        assert_eq!(projected.recipient_keys(), &[target]);
        assert_eq!(projected.recipient_boxes().len(), 1);
        assert_eq!(projected.recipient_boxes()[0], payload.recipient_boxes()[1]);
        assert_eq!(projected.cipher_text(), payload.cipher_text());
        assert_eq!(
            projected.affected_contract_transactions(),
            payload.affected_contract_transactions()
        );
    }

    #[test]
    fn test_for_recipient_unknown_target() {
        let payload = test_payload(vec![test_key(2)]);
        let result = payload.for_recipient(&test_key(9));
        assert!(matches!(
            result,
            Err(PayloadError::RecipientNotInPayload { .. })
        ));
    }

    #[test]
    fn test_with_recipient_appends() {
        let payload = test_payload(vec![]);
        let key = SecretKey::generate().public_key();
        let updated = payload.with_recipient(key.clone());
        assert_eq!(updated.recipient_keys(), &[key]);
    }

    #[test]
    fn test_without_affected_preserves_hash_identity() {
        let tx_a: TxHash = MessageHash::from_cipher_text(b"a").into();
        let tx_b: TxHash = MessageHash::from_cipher_text(b"b").into();
        let mut affected = BTreeMap::new();
        affected.insert(tx_a.clone(), SecurityHash::new(vec![1; 16]));
        affected.insert(tx_b.clone(), SecurityHash::new(vec![2; 16]));

        let payload = EncodedPayload::builder()
            .sender_key(test_key(1))
            .cipher_text(b"cipher".to_vec())
            .cipher_text_nonce(Nonce::generate())
            .recipient_nonce(Nonce::generate())
            .affected_contract_transactions(affected)
            .build()
            .unwrap();

        let hash_before = payload.message_hash();
        let pruned = payload.without_affected(&[tx_a.clone()]);

        assert_eq!(pruned.message_hash(), hash_before);
        assert!(!pruned.affected_contract_transactions().contains_key(&tx_a));
        assert!(pruned.affected_contract_transactions().contains_key(&tx_b));
    }
}

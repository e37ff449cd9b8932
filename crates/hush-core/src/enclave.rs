//! The cryptographic oracle behind the mediator.
//!
//! The [`Enclave`] trait is the seam to whatever holds the node's
//! private keys: it encrypts and decrypts envelopes, inventories keys,
//! and verifies the security hashes that bind a payload to the
//! transactions it affects. The mediator never touches key material.
//!
//! [`LocalEnclave`] is the in-process implementation: per-recipient
//! boxes wrap a random master key under X25519 shared secrets, and the
//! payload itself is sealed once under the master key. A remote enclave
//! would implement the same trait over a transport.

use std::collections::{BTreeMap, BTreeSet};

use hush_crypto::{aead, CryptoError, Nonce, PublicKey, SecretKey};
use hush_payload::{EncodedPayload, PrivacyMode, SecurityHash, TxHash};
use hush_store::EncryptedRawTransaction;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

/// KDF context for per-recipient key boxes.
const BOX_CONTEXT: &str = "hush recipient box v1";

/// KDF context for wrapping a raw transaction's master key for its
/// sender alone.
const RAW_CONTEXT: &str = "hush raw key wrap v1";

/// Errors raised by enclave operations.
#[derive(Error, Debug)]
pub enum EnclaveError {
    /// The named key is not managed by this enclave.
    #[error("Key {key} is not managed by this enclave")]
    KeyMissing {
        /// Base64 form of the unknown key.
        key: String,
    },

    /// Cryptographic failure. During trial decryption this only means
    /// "wrong key".
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Envelope construction failure.
    #[error(transparent)]
    Payload(#[from] hush_payload::PayloadError),
}

/// Result type for enclave operations.
pub type EnclaveResult<T> = std::result::Result<T, EnclaveError>;

/// A raw transaction freshly encrypted for its sender.
#[derive(Clone, Debug)]
pub struct RawTransaction {
    /// The sender-encrypted payload; its digest is the transaction hash.
    pub encrypted_payload: Vec<u8>,
    /// The master key, wrapped for the sender alone.
    pub encrypted_key: Vec<u8>,
    /// Nonce under which payload and key were sealed.
    pub nonce: Nonce,
    /// The originating party.
    pub from: PublicKey,
}

/// The cryptographic oracle: owns private keys, transforms payloads.
///
/// Re-entrant and stateless from the mediator's perspective; every
/// method may be called concurrently.
pub trait Enclave: Send + Sync {
    /// The key used when a request names no sender.
    fn default_public_key(&self) -> PublicKey;

    /// Every public key this enclave holds a private key for.
    fn public_keys(&self) -> Vec<PublicKey>;

    /// Keys automatically added as recipients of every outbound payload.
    fn forwarding_keys(&self) -> Vec<PublicKey>;

    /// Build the envelope for a new outbound transaction.
    fn encrypt_payload(
        &self,
        message: &[u8],
        sender: &PublicKey,
        recipients: &[PublicKey],
        privacy_mode: PrivacyMode,
        affected: &BTreeMap<TxHash, EncodedPayload>,
        exec_hash: &[u8],
    ) -> EnclaveResult<EncodedPayload>;

    /// Build the envelope for a stored raw transaction, reusing its
    /// cipher text so the content-addressed identity is preserved.
    fn encrypt_signed_payload(
        &self,
        raw: &EncryptedRawTransaction,
        recipients: &[PublicKey],
        privacy_mode: PrivacyMode,
        affected: &BTreeMap<TxHash, EncodedPayload>,
        exec_hash: &[u8],
    ) -> EnclaveResult<EncodedPayload>;

    /// Encrypt a payload for its sender only, ahead of a signed send.
    fn encrypt_raw(&self, message: &[u8], sender: &PublicKey) -> EnclaveResult<RawTransaction>;

    /// Recover the plaintext of an envelope using the given recipient
    /// key.
    fn decrypt_payload(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> EnclaveResult<Vec<u8>>;

    /// Which of the payload's affected-transaction references carry a
    /// security hash that does not match the locally resolved payloads.
    ///
    /// References that could not be resolved locally are not judged.
    fn find_invalid_security_hashes(
        &self,
        payload: &EncodedPayload,
        resolved: &BTreeMap<TxHash, EncodedPayload>,
    ) -> BTreeSet<TxHash>;
}

/// In-process enclave holding keys in memory.
pub struct LocalEnclave {
    keys: BTreeMap<PublicKey, SecretKey>,
    default_key: PublicKey,
    forwarding: Vec<PublicKey>,
}

impl LocalEnclave {
    /// Create an enclave over the given secret keys.
    ///
    /// The first key becomes the default sender key. `forwarding` keys
    /// are added as recipients of every outbound payload (compliance
    /// backup and the like); they need not be local.
    ///
    /// # Errors
    ///
    /// Returns an error if `secret_keys` is empty.
    pub fn new(secret_keys: Vec<SecretKey>, forwarding: Vec<PublicKey>) -> EnclaveResult<Self> {
        let mut keys = BTreeMap::new();
        let mut default_key = None;
        for secret in secret_keys {
            let public = secret.public_key();
            if default_key.is_none() {
                default_key = Some(public.clone());
            }
            keys.insert(public, secret);
        }
        let default_key = default_key.ok_or_else(|| EnclaveError::KeyMissing {
            key: "<none configured>".to_string(),
        })?;

        Ok(Self {
            keys,
            default_key,
            forwarding,
        })
    }

    fn secret_for(&self, key: &PublicKey) -> EnclaveResult<&SecretKey> {
        self.keys.get(key).ok_or_else(|| EnclaveError::KeyMissing {
            key: key.to_base64(),
        })
    }

    fn seal_boxes(
        &self,
        sender: &SecretKey,
        recipients: &[PublicKey],
        nonce: &Nonce,
        master: &[u8; 32],
    ) -> EnclaveResult<Vec<Vec<u8>>> {
        recipients
            .iter()
            .map(|recipient| {
                let key = sender.shared_secret(recipient).derive_key(BOX_CONTEXT);
                Ok(aead::encrypt(&key, nonce, master)?)
            })
            .collect()
    }

    fn open_box(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> EnclaveResult<Zeroizing<[u8; 32]>> {
        // When the local node is the sender, the box is opened from the
        // other side: our secret against the first recipient's public.
        let (secret, peer, index) = if self.keys.contains_key(payload.sender_key())
            && recipient == payload.sender_key()
        {
            let peer = payload
                .recipient_keys()
                .first()
                .ok_or(CryptoError::Decryption)?;
            (self.secret_for(payload.sender_key())?, peer.clone(), 0)
        } else {
            let index = payload
                .recipient_keys()
                .iter()
                .position(|key| key == recipient)
                .unwrap_or(0);
            (
                self.secret_for(recipient)?,
                payload.sender_key().clone(),
                index,
            )
        };

        let sealed = payload
            .recipient_boxes()
            .get(index)
            .ok_or(CryptoError::Decryption)?;
        let key = secret.shared_secret(&peer).derive_key(BOX_CONTEXT);
        let opened = aead::decrypt(&key, payload.recipient_nonce(), sealed)?;

        let mut master = Zeroizing::new([0u8; 32]);
        if opened.len() != master.len() {
            return Err(CryptoError::Decryption.into());
        }
        master.copy_from_slice(&opened);
        Ok(master)
    }

    fn security_hashes(
        &self,
        affected: &BTreeMap<TxHash, EncodedPayload>,
        cipher_text: &[u8],
        exec_hash: &[u8],
    ) -> BTreeMap<TxHash, SecurityHash> {
        affected
            .iter()
            .map(|(tx_hash, affected_tx)| {
                (
                    tx_hash.clone(),
                    compute_security_hash(tx_hash, affected_tx, cipher_text, exec_hash),
                )
            })
            .collect()
    }

    fn build_payload(
        &self,
        sender: &PublicKey,
        cipher_text: Vec<u8>,
        cipher_text_nonce: Nonce,
        recipients: &[PublicKey],
        privacy_mode: PrivacyMode,
        affected: &BTreeMap<TxHash, EncodedPayload>,
        exec_hash: &[u8],
        master: &Zeroizing<[u8; 32]>,
    ) -> EnclaveResult<EncodedPayload> {
        let secret = self.secret_for(sender)?;
        let recipient_nonce = Nonce::generate();
        let boxes = self.seal_boxes(secret, recipients, &recipient_nonce, master)?;
        let security_hashes = self.security_hashes(affected, &cipher_text, exec_hash);

        Ok(EncodedPayload::builder()
            .sender_key(sender.clone())
            .cipher_text(cipher_text)
            .cipher_text_nonce(cipher_text_nonce)
            .recipient_boxes(boxes)
            .recipient_nonce(recipient_nonce)
            .recipient_keys(recipients.to_vec())
            .privacy_mode(privacy_mode)
            .affected_contract_transactions(security_hashes)
            .exec_hash(exec_hash.to_vec())
            .build()?)
    }
}

impl Enclave for LocalEnclave {
    fn default_public_key(&self) -> PublicKey {
        self.default_key.clone()
    }

    fn public_keys(&self) -> Vec<PublicKey> {
        self.keys.keys().cloned().collect()
    }

    fn forwarding_keys(&self) -> Vec<PublicKey> {
        self.forwarding.clone()
    }

    fn encrypt_payload(
        &self,
        message: &[u8],
        sender: &PublicKey,
        recipients: &[PublicKey],
        privacy_mode: PrivacyMode,
        affected: &BTreeMap<TxHash, EncodedPayload>,
        exec_hash: &[u8],
    ) -> EnclaveResult<EncodedPayload> {
        let mut master = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut *master);

        let cipher_text_nonce = Nonce::generate();
        let cipher_text = aead::encrypt(&master, &cipher_text_nonce, message)?;

        self.build_payload(
            sender,
            cipher_text,
            cipher_text_nonce,
            recipients,
            privacy_mode,
            affected,
            exec_hash,
            &master,
        )
    }

    fn encrypt_signed_payload(
        &self,
        raw: &EncryptedRawTransaction,
        recipients: &[PublicKey],
        privacy_mode: PrivacyMode,
        affected: &BTreeMap<TxHash, EncodedPayload>,
        exec_hash: &[u8],
    ) -> EnclaveResult<EncodedPayload> {
        let secret = self.secret_for(&raw.sender)?;
        let wrap_key = secret.shared_secret(&raw.sender).derive_key(RAW_CONTEXT);
        let opened = aead::decrypt(&wrap_key, &raw.nonce, &raw.encrypted_key)?;

        let mut master = Zeroizing::new([0u8; 32]);
        if opened.len() != master.len() {
            return Err(CryptoError::Decryption.into());
        }
        master.copy_from_slice(&opened);

        // The raw cipher text is reused untouched: the transaction keeps
        // the hash identity assigned when the raw payload was stored.
        self.build_payload(
            &raw.sender,
            raw.encrypted_payload.clone(),
            raw.nonce.clone(),
            recipients,
            privacy_mode,
            affected,
            exec_hash,
            &master,
        )
    }

    fn encrypt_raw(&self, message: &[u8], sender: &PublicKey) -> EnclaveResult<RawTransaction> {
        let secret = self.secret_for(sender)?;

        let mut master = Zeroizing::new([0u8; 32]);
        OsRng.fill_bytes(&mut *master);

        let nonce = Nonce::generate();
        let encrypted_payload = aead::encrypt(&master, &nonce, message)?;

        let wrap_key = secret.shared_secret(sender).derive_key(RAW_CONTEXT);
        let encrypted_key = aead::encrypt(&wrap_key, &nonce, &*master)?;

        Ok(RawTransaction {
            encrypted_payload,
            encrypted_key,
            nonce,
            from: sender.clone(),
        })
    }

    fn decrypt_payload(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> EnclaveResult<Vec<u8>> {
        let master = self.open_box(payload, recipient)?;
        Ok(aead::decrypt(
            &master,
            payload.cipher_text_nonce(),
            payload.cipher_text(),
        )?)
    }

    fn find_invalid_security_hashes(
        &self,
        payload: &EncodedPayload,
        resolved: &BTreeMap<TxHash, EncodedPayload>,
    ) -> BTreeSet<TxHash> {
        payload
            .affected_contract_transactions()
            .iter()
            .filter_map(|(tx_hash, claimed)| {
                let affected_tx = resolved.get(tx_hash)?;
                let expected = compute_security_hash(
                    tx_hash,
                    affected_tx,
                    payload.cipher_text(),
                    payload.exec_hash(),
                );
                (expected != *claimed).then(|| tx_hash.clone())
            })
            .collect()
    }
}

/// Bind a new payload to one transaction it affects.
///
/// The hash covers the affected transaction's identity and cipher text
/// together with the new cipher text and execution hash, so only a node
/// that actually holds the affected transaction can produce or verify
/// it. Inputs are length-prefixed.
fn compute_security_hash(
    tx_hash: &TxHash,
    affected_tx: &EncodedPayload,
    cipher_text: &[u8],
    exec_hash: &[u8],
) -> SecurityHash {
    let mut hasher = blake3::Hasher::new();
    for input in [
        tx_hash.as_bytes().as_slice(),
        affected_tx.cipher_text(),
        cipher_text,
        exec_hash,
    ] {
        hasher.update(&(input.len() as u64).to_le_bytes());
        hasher.update(input);
    }
    SecurityHash::new(hasher.finalize().as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enclave_with(count: usize) -> LocalEnclave {
        let keys = (0..count).map(|_| SecretKey::generate()).collect();
        LocalEnclave::new(keys, Vec::new()).unwrap()
    }

    fn other_party() -> (LocalEnclave, PublicKey) {
        let secret = SecretKey::generate();
        let public = secret.public_key();
        (LocalEnclave::new(vec![secret], Vec::new()).unwrap(), public)
    }

    #[test]
    fn test_requires_at_least_one_key() {
        assert!(LocalEnclave::new(Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn test_recipient_can_decrypt() {
        let ours = enclave_with(1);
        let (theirs, their_key) = other_party();
        let sender = ours.default_public_key();

        let payload = ours
            .encrypt_payload(
                b"secret state",
                &sender,
                &[their_key.clone(), sender.clone()],
                PrivacyMode::StandardPrivate,
                &BTreeMap::new(),
                &[],
            )
            .unwrap();

        let plaintext = theirs.decrypt_payload(&payload, &their_key).unwrap();
        assert_eq!(plaintext, b"secret state");
    }

    #[test]
    fn test_sender_can_decrypt_own_payload() {
        let ours = enclave_with(1);
        let (_, their_key) = other_party();
        let sender = ours.default_public_key();

        let payload = ours
            .encrypt_payload(
                b"secret state",
                &sender,
                &[their_key, sender.clone()],
                PrivacyMode::StandardPrivate,
                &BTreeMap::new(),
                &[],
            )
            .unwrap();

        let plaintext = ours.decrypt_payload(&payload, &sender).unwrap();
        assert_eq!(plaintext, b"secret state");
    }

    #[test]
    fn test_wrong_key_cannot_decrypt() {
        let ours = enclave_with(1);
        let (_, their_key) = other_party();
        let (stranger, stranger_key) = other_party();
        let sender = ours.default_public_key();

        let payload = ours
            .encrypt_payload(
                b"secret state",
                &sender,
                &[their_key],
                PrivacyMode::StandardPrivate,
                &BTreeMap::new(),
                &[],
            )
            .unwrap();

        assert!(stranger.decrypt_payload(&payload, &stranger_key).is_err());
    }

    #[test]
    fn test_projected_payload_still_decrypts() {
        let ours = enclave_with(1);
        let (theirs, their_key) = other_party();
        let sender = ours.default_public_key();

        let payload = ours
            .encrypt_payload(
                b"projected",
                &sender,
                &[sender.clone(), their_key.clone()],
                PrivacyMode::StandardPrivate,
                &BTreeMap::new(),
                &[],
            )
            .unwrap();

        let projected = payload.for_recipient(&their_key).unwrap();
        let plaintext = theirs.decrypt_payload(&projected, &their_key).unwrap();
        assert_eq!(plaintext, b"projected");
    }

    #[test]
    fn test_signed_payload_keeps_hash_identity() {
        let ours = enclave_with(1);
        let (_, their_key) = other_party();
        let sender = ours.default_public_key();

        let raw = ours.encrypt_raw(b"raw payload", &sender).unwrap();
        let raw_hash = hush_crypto::MessageHash::from_cipher_text(&raw.encrypted_payload);

        let stored = EncryptedRawTransaction {
            hash: raw_hash.clone(),
            encrypted_payload: raw.encrypted_payload,
            encrypted_key: raw.encrypted_key,
            nonce: raw.nonce,
            sender: raw.from,
        };

        let payload = ours
            .encrypt_signed_payload(
                &stored,
                &[their_key, sender.clone()],
                PrivacyMode::StandardPrivate,
                &BTreeMap::new(),
                &[],
            )
            .unwrap();

        assert_eq!(payload.message_hash(), raw_hash);
        assert_eq!(ours.decrypt_payload(&payload, &sender).unwrap(), b"raw payload");
    }

    #[test]
    fn test_security_hash_verification() {
        let ours = enclave_with(1);
        let (_, their_key) = other_party();
        let sender = ours.default_public_key();
        let recipients = [their_key, sender.clone()];

        let prior = ours
            .encrypt_payload(
                b"prior",
                &sender,
                &recipients,
                PrivacyMode::PrivateStateValidation,
                &BTreeMap::new(),
                b"exec-0",
            )
            .unwrap();
        let prior_hash: TxHash = prior.message_hash().into();

        let mut resolved = BTreeMap::new();
        resolved.insert(prior_hash.clone(), prior);

        let next = ours
            .encrypt_payload(
                b"next",
                &sender,
                &recipients,
                PrivacyMode::PrivateStateValidation,
                &resolved,
                b"exec-1",
            )
            .unwrap();

        // Freshly computed hashes verify clean
        assert!(ours.find_invalid_security_hashes(&next, &resolved).is_empty());

        // A tampered security hash is flagged
        let mut tampered_map = next.affected_contract_transactions().clone();
        tampered_map.insert(prior_hash.clone(), SecurityHash::new(vec![0; 32]));
        let tampered = EncodedPayload::builder()
            .sender_key(next.sender_key().clone())
            .cipher_text(next.cipher_text().to_vec())
            .cipher_text_nonce(next.cipher_text_nonce().clone())
            .recipient_boxes(next.recipient_boxes().to_vec())
            .recipient_nonce(next.recipient_nonce().clone())
            .recipient_keys(next.recipient_keys().to_vec())
            .privacy_mode(next.privacy_mode())
            .affected_contract_transactions(tampered_map)
            .exec_hash(next.exec_hash().to_vec())
            .build()
            .unwrap();

        let invalid = ours.find_invalid_security_hashes(&tampered, &resolved);
        assert_eq!(invalid.len(), 1);
        assert!(invalid.contains(&prior_hash));
    }

    #[test]
    fn test_unresolved_references_not_judged() {
        let ours = enclave_with(1);
        let sender = ours.default_public_key();

        let mut affected = BTreeMap::new();
        let phantom: TxHash = hush_crypto::MessageHash::from_cipher_text(b"phantom").into();
        let prior = ours
            .encrypt_payload(
                b"prior",
                &sender,
                &[sender.clone()],
                PrivacyMode::StandardPrivate,
                &BTreeMap::new(),
                &[],
            )
            .unwrap();
        affected.insert(phantom, prior);

        let payload = ours
            .encrypt_payload(
                b"next",
                &sender,
                &[sender.clone()],
                PrivacyMode::StandardPrivate,
                &affected,
                &[],
            )
            .unwrap();

        // Nothing resolved locally: nothing to judge
        assert!(ours
            .find_invalid_security_hashes(&payload, &BTreeMap::new())
            .is_empty());
    }
}

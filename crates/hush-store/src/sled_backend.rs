//! Sled-backed persistent storage for encrypted transactions.
//!
//! Uses four sled trees:
//! - `st_transaction`: message hash (32 bytes) → serialized record
//! - `st_affected_transaction`: affected hash ‖ source hash → security hash
//! - `st_transaction_recipient`: message hash ‖ recipient key → box bytes
//! - `st_raw_transaction`: message hash → serialized raw record
//!
//! The affected and recipient trees are secondary indexes derived from
//! the stored envelope and rebuilt on every save; they answer "which
//! stored transactions depend on X" and "who can read Y" without
//! decoding every record.
//!
//! ## Thread Safety
//!
//! All sled operations are internally synchronized; the stores are
//! `Send + Sync` and hold no other state.

use std::path::Path;

use async_trait::async_trait;
use hush_crypto::{MessageHash, PublicKey};
use hush_payload::{EncodedPayload, SecurityHash, TxHash};
use tracing::debug;

use crate::{EncryptedRawTransaction, EncryptedTransaction, Result, StoreError};

/// Tree name for transaction records.
const TRANSACTION_TREE: &str = "st_transaction";

/// Tree name for the affected-transaction index.
const AFFECTED_TREE: &str = "st_affected_transaction";

/// Tree name for the recipient index.
const RECIPIENT_TREE: &str = "st_transaction_recipient";

/// Tree name for raw transaction records.
const RAW_TREE: &str = "st_raw_transaction";

/// Both persistent stores over one sled database.
pub struct SledStores {
    /// Store for finalized encrypted transactions.
    pub transactions: SledTransactionStore,
    /// Store for sender-only raw transactions.
    pub raw: SledRawStore,
}

impl SledStores {
    /// Open or create the database under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path).map_err(|e| StoreError::Database(format!("sled open: {}", e)))?;
        Self::from_db(db)
    }

    /// Wrap an already-open sled database.
    pub fn from_db(db: sled::Db) -> Result<Self> {
        let tx_tree = open_tree(&db, TRANSACTION_TREE)?;
        let affected_tree = open_tree(&db, AFFECTED_TREE)?;
        let recipient_tree = open_tree(&db, RECIPIENT_TREE)?;
        let raw_tree = open_tree(&db, RAW_TREE)?;

        Ok(Self {
            transactions: SledTransactionStore {
                tx_tree,
                affected_tree,
                recipient_tree,
            },
            raw: SledRawStore { raw_tree },
        })
    }
}

fn open_tree(db: &sled::Db, name: &str) -> Result<sled::Tree> {
    db.open_tree(name)
        .map_err(|e| StoreError::Database(format!("open tree {}: {}", name, e)))
}

/// Persistent transaction store backed by sled.
pub struct SledTransactionStore {
    tx_tree: sled::Tree,
    affected_tree: sled::Tree,
    recipient_tree: sled::Tree,
}

impl SledTransactionStore {
    /// Which stored transactions name `affected` as a dependency,
    /// together with the security hash each one carries for it.
    pub fn sources_affecting(
        &self,
        affected: &TxHash,
    ) -> Result<Vec<(MessageHash, SecurityHash)>> {
        let mut sources = Vec::new();
        for entry in self.affected_tree.scan_prefix(affected.as_bytes()) {
            let (key, value) =
                entry.map_err(|e| StoreError::Database(format!("affected scan: {}", e)))?;
            let source = MessageHash::from_bytes(&key[32..])
                .map_err(|_| StoreError::Database("corrupt key in affected index".to_string()))?;
            sources.push((source, SecurityHash::new(value.to_vec())));
        }
        Ok(sources)
    }

    /// The recipient keys of a stored transaction, from the index.
    pub fn recipients_of(&self, hash: &MessageHash) -> Result<Vec<PublicKey>> {
        let mut recipients = Vec::new();
        for entry in self.recipient_tree.scan_prefix(hash.as_bytes()) {
            let (key, _) =
                entry.map_err(|e| StoreError::Database(format!("recipient scan: {}", e)))?;
            let recipient = PublicKey::from_bytes(&key[32..])
                .map_err(|_| StoreError::Database("corrupt key in recipient index".to_string()))?;
            recipients.push(recipient);
        }
        Ok(recipients)
    }

    fn index_payload(&self, hash: &MessageHash, payload: &EncodedPayload) -> Result<()> {
        for (affected, security_hash) in payload.affected_contract_transactions() {
            let mut key = Vec::with_capacity(64);
            key.extend_from_slice(affected.as_bytes());
            key.extend_from_slice(hash.as_bytes());
            self.affected_tree
                .insert(key, security_hash.as_bytes())
                .map_err(|e| StoreError::Database(format!("affected insert: {}", e)))?;
        }

        for (position, recipient) in payload.recipient_keys().iter().enumerate() {
            let mut key = Vec::with_capacity(64);
            key.extend_from_slice(hash.as_bytes());
            key.extend_from_slice(recipient.as_bytes());
            let value = payload
                .recipient_boxes()
                .get(position)
                .map(|b| b.as_slice())
                .unwrap_or_default();
            self.recipient_tree
                .insert(key, value)
                .map_err(|e| StoreError::Database(format!("recipient insert: {}", e)))?;
        }

        Ok(())
    }

    fn deindex_payload(&self, hash: &MessageHash) -> Result<()> {
        // Affected-index keys lead with the AFFECTED hash, so entries for
        // one source are found by suffix, not prefix.
        let mut stale = Vec::new();
        for entry in self.affected_tree.iter() {
            let (key, _) =
                entry.map_err(|e| StoreError::Database(format!("affected scan: {}", e)))?;
            if key.len() == 64 && &key[32..] == hash.as_bytes().as_slice() {
                stale.push(key);
            }
        }
        for key in stale {
            self.affected_tree
                .remove(key)
                .map_err(|e| StoreError::Database(format!("affected remove: {}", e)))?;
        }

        let mut stale = Vec::new();
        for entry in self.recipient_tree.scan_prefix(hash.as_bytes()) {
            let (key, _) =
                entry.map_err(|e| StoreError::Database(format!("recipient scan: {}", e)))?;
            stale.push(key);
        }
        for key in stale {
            self.recipient_tree
                .remove(key)
                .map_err(|e| StoreError::Database(format!("recipient remove: {}", e)))?;
        }

        Ok(())
    }
}

#[async_trait]
impl crate::TransactionStore for SledTransactionStore {
    async fn save(&self, transaction: EncryptedTransaction) -> Result<()> {
        if let Some(existing) = self
            .tx_tree
            .get(transaction.hash.as_bytes())
            .map_err(|e| StoreError::Database(format!("lookup: {}", e)))?
        {
            let existing: EncryptedTransaction = bincode::deserialize(&existing)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            if existing.encoded_payload == transaction.encoded_payload {
                debug!(hash = %transaction.hash, "re-save of identical record ignored");
                return Ok(());
            }
            return Err(StoreError::HashCollision {
                hash: transaction.hash.to_base64(),
            });
        }

        let payload = EncodedPayload::decode(&transaction.encoded_payload)?;
        let bytes = bincode::serialize(&transaction)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.tx_tree
            .insert(transaction.hash.as_bytes(), bytes)
            .map_err(|e| StoreError::Database(format!("insert: {}", e)))?;
        self.index_payload(&transaction.hash, &payload)?;

        Ok(())
    }

    async fn retrieve_by_hash(&self, hash: &MessageHash) -> Result<Option<EncryptedTransaction>> {
        match self
            .tx_tree
            .get(hash.as_bytes())
            .map_err(|e| StoreError::Database(format!("lookup: {}", e)))?
        {
            Some(bytes) => {
                let record = bincode::deserialize(&bytes)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, hash: &MessageHash) -> Result<bool> {
        let removed = self
            .tx_tree
            .remove(hash.as_bytes())
            .map_err(|e| StoreError::Database(format!("remove: {}", e)))?
            .is_some();
        if removed {
            self.deindex_payload(hash)?;
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.tx_tree.len())
    }

    async fn retrieve_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<EncryptedTransaction>> {
        let mut page = Vec::with_capacity(limit);
        for entry in self.tx_tree.iter().skip(offset).take(limit) {
            let (_, bytes) = entry.map_err(|e| StoreError::Database(format!("iter: {}", e)))?;
            let record = bincode::deserialize(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            page.push(record);
        }
        Ok(page)
    }
}

/// Persistent raw-transaction store backed by sled.
pub struct SledRawStore {
    raw_tree: sled::Tree,
}

#[async_trait]
impl crate::RawTransactionStore for SledRawStore {
    async fn save(&self, transaction: EncryptedRawTransaction) -> Result<()> {
        let bytes = bincode::serialize(&transaction)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.raw_tree
            .insert(transaction.hash.as_bytes(), bytes)
            .map_err(|e| StoreError::Database(format!("raw insert: {}", e)))?;
        Ok(())
    }

    async fn retrieve_by_hash(
        &self,
        hash: &MessageHash,
    ) -> Result<Option<EncryptedRawTransaction>> {
        match self
            .raw_tree
            .get(hash.as_bytes())
            .map_err(|e| StoreError::Database(format!("raw lookup: {}", e)))?
        {
            Some(bytes) => {
                let record = bincode::deserialize(&bytes)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, hash: &MessageHash) -> Result<bool> {
        Ok(self
            .raw_tree
            .remove(hash.as_bytes())
            .map_err(|e| StoreError::Database(format!("raw remove: {}", e)))?
            .is_some())
    }
}

//! Storage traits and the in-memory backend.
//!
//! The mediator only ever talks to these traits. Backends must provide
//! interior synchronization; the mediator calls them concurrently from
//! every public operation.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use hush_crypto::MessageHash;

use crate::{EncryptedRawTransaction, EncryptedTransaction, Result, StoreError};

/// Storage for finalized encrypted transactions.
///
/// ## Paging
///
/// `retrieve_page` iterates a stable order (the hash order of the
/// backend). Items present when a scan starts will appear in some page
/// before the scan ends; callers tolerate duplicates across pages under
/// concurrent inserts.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a transaction.
    ///
    /// Idempotent by hash: re-saving a record with identical payload
    /// bytes is a no-op. Re-saving with different bytes is a
    /// [`StoreError::HashCollision`].
    async fn save(&self, transaction: EncryptedTransaction) -> Result<()>;

    /// Load a transaction by hash.
    async fn retrieve_by_hash(&self, hash: &MessageHash) -> Result<Option<EncryptedTransaction>>;

    /// Delete a transaction by hash.
    ///
    /// Idempotent: returns `Ok(false)` when nothing was stored.
    async fn delete(&self, hash: &MessageHash) -> Result<bool>;

    /// Count stored transactions.
    async fn count(&self) -> Result<usize>;

    /// Fetch up to `limit` transactions starting at `offset`, in the
    /// backend's stable order.
    async fn retrieve_page(&self, offset: usize, limit: usize)
        -> Result<Vec<EncryptedTransaction>>;
}

/// Storage for sender-only raw transactions.
#[async_trait]
pub trait RawTransactionStore: Send + Sync {
    /// Persist a raw transaction.
    async fn save(&self, transaction: EncryptedRawTransaction) -> Result<()>;

    /// Load a raw transaction by hash.
    async fn retrieve_by_hash(
        &self,
        hash: &MessageHash,
    ) -> Result<Option<EncryptedRawTransaction>>;

    /// Delete a raw transaction by hash. Idempotent.
    async fn delete(&self, hash: &MessageHash) -> Result<bool>;
}

/// In-memory transaction store for tests and embedded use.
#[derive(Default)]
pub struct InMemoryTransactionStore {
    inner: RwLock<BTreeMap<MessageHash, EncryptedTransaction>>,
}

impl InMemoryTransactionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned() -> StoreError {
    StoreError::Database("store lock poisoned".to_string())
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn save(&self, transaction: EncryptedTransaction) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        if let Some(existing) = inner.get(&transaction.hash) {
            if existing.encoded_payload == transaction.encoded_payload {
                return Ok(());
            }
            return Err(StoreError::HashCollision {
                hash: transaction.hash.to_base64(),
            });
        }
        inner.insert(transaction.hash.clone(), transaction);
        Ok(())
    }

    async fn retrieve_by_hash(&self, hash: &MessageHash) -> Result<Option<EncryptedTransaction>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.get(hash).cloned())
    }

    async fn delete(&self, hash: &MessageHash) -> Result<bool> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        Ok(inner.remove(hash).is_some())
    }

    async fn count(&self) -> Result<usize> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.len())
    }

    async fn retrieve_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<EncryptedTransaction>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.values().skip(offset).take(limit).cloned().collect())
    }
}

/// In-memory raw-transaction store for tests and embedded use.
#[derive(Default)]
pub struct InMemoryRawStore {
    inner: RwLock<BTreeMap<MessageHash, EncryptedRawTransaction>>,
}

impl InMemoryRawStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RawTransactionStore for InMemoryRawStore {
    async fn save(&self, transaction: EncryptedRawTransaction) -> Result<()> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        inner.insert(transaction.hash.clone(), transaction);
        Ok(())
    }

    async fn retrieve_by_hash(
        &self,
        hash: &MessageHash,
    ) -> Result<Option<EncryptedRawTransaction>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.get(hash).cloned())
    }

    async fn delete(&self, hash: &MessageHash) -> Result<bool> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        Ok(inner.remove(hash).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seed: u8) -> EncryptedTransaction {
        let payload = vec![seed; 16];
        EncryptedTransaction::new(MessageHash::from_cipher_text(&payload), payload)
    }

    #[tokio::test]
    async fn test_save_and_retrieve() {
        let store = InMemoryTransactionStore::new();
        let tx = record(1);
        let hash = tx.hash.clone();

        store.save(tx.clone()).await.unwrap();

        let loaded = store.retrieve_by_hash(&hash).await.unwrap();
        assert_eq!(loaded, Some(tx));
    }

    #[tokio::test]
    async fn test_save_identical_is_noop() {
        let store = InMemoryTransactionStore::new();
        let tx = record(1);

        store.save(tx.clone()).await.unwrap();
        store.save(tx).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_collision_rejected() {
        let store = InMemoryTransactionStore::new();
        let tx = record(1);
        let mut other = tx.clone();
        other.encoded_payload = vec![9; 16];

        store.save(tx).await.unwrap();
        let result = store.save(other).await;

        assert!(matches!(result, Err(StoreError::HashCollision { .. })));
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let store = InMemoryTransactionStore::new();
        let tx = record(1);
        let hash = tx.hash.clone();

        store.save(tx).await.unwrap();
        assert!(store.delete(&hash).await.unwrap());
        assert!(!store.delete(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_paging_covers_everything() {
        let store = InMemoryTransactionStore::new();
        for seed in 0..25 {
            store.save(record(seed)).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut offset = 0;
        while offset < store.count().await.unwrap() {
            let page = store.retrieve_page(offset, 7).await.unwrap();
            assert!(page.len() <= 7);
            seen.extend(page);
            offset += 7;
        }

        assert_eq!(seen.len(), 25);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let store = InMemoryTransactionStore::new();
        store.save(record(1)).await.unwrap();

        let page = store.retrieve_page(10, 5).await.unwrap();
        assert!(page.is_empty());
    }
}

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::RwLock;

use thiserror::Error;

use crate::key::SnapshotKey;
use crate::snapshot::{Snapshot, SnapshotError};
use crate::trie::MessageTrie;

/// A simple key-value store for encoded snapshots.
///
/// Stores operate on raw bytes; encoding and validation happen in
/// [`save_trie`] and [`load_trie`].
///
/// All methods take `&self` to support stores with internal locking (e.g., RocksDB).
pub trait SnapshotStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieves the bytes associated with a key, or None if not present.
    fn get(&self, key: &SnapshotKey) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stores bytes at the given key.
    fn put(&self, key: &SnapshotKey, value: &[u8]) -> Result<(), Self::Error>;

    /// Checks whether a key exists in the store.
    fn has(&self, key: &SnapshotKey) -> Result<bool, Self::Error>;
}

/// Error type for saving and loading tries through a store.
#[derive(Debug, Error)]
pub enum StoreError<E: std::error::Error + 'static> {
    #[error("store backend error: {0}")]
    Backend(#[source] E),
    #[error("snapshot not found: {0}")]
    NotFound(SnapshotKey),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Encodes `trie` and writes it under its content key.
///
/// Writing the same trie twice is a no-op the second time.
pub fn save_trie<S: SnapshotStore>(
    store: &S,
    trie: &MessageTrie,
) -> Result<SnapshotKey, StoreError<S::Error>> {
    let bytes = trie.serialize().to_bytes()?;
    let key = SnapshotKey::from_data(&bytes);
    if !store.has(&key).map_err(StoreError::Backend)? {
        store.put(&key, &bytes).map_err(StoreError::Backend)?;
    }
    Ok(key)
}

/// Reads and rebuilds the trie stored under `key`.
pub fn load_trie<S: SnapshotStore>(
    store: &S,
    key: &SnapshotKey,
) -> Result<MessageTrie, StoreError<S::Error>> {
    let bytes = store
        .get(key)
        .map_err(StoreError::Backend)?
        .ok_or(StoreError::NotFound(*key))?;
    let snapshot = Snapshot::from_bytes(&bytes)?;
    Ok(MessageTrie::deserialize(&snapshot)?)
}

/// An in-memory store backed by a HashMap.
///
/// Useful for testing and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<SnapshotKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &SnapshotKey) -> Result<Option<Vec<u8>>, Self::Error> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(data.get(key).cloned())
    }

    fn put(&self, key: &SnapshotKey, value: &[u8]) -> Result<(), Self::Error> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.insert(*key, value.to_vec());
        Ok(())
    }

    fn has(&self, key: &SnapshotKey) -> Result<bool, Self::Error> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(data.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TokenKey;

    fn trie_with(words: &[&str]) -> MessageTrie {
        let mut trie = MessageTrie::new();
        trie.insert_keys(words.iter().map(|w| TokenKey::new("user", *w)))
            .unwrap();
        trie
    }

    #[test]
    fn memory_store_put_get() {
        let store = MemoryStore::new();
        let key = SnapshotKey::from_data(b"test");

        store.put(&key, b"hello world").unwrap();

        assert_eq!(store.get(&key).unwrap(), Some(b"hello world".to_vec()));
        assert!(store.has(&key).unwrap());
    }

    #[test]
    fn memory_store_get_missing() {
        let store = MemoryStore::new();
        let key = SnapshotKey::from_data(b"nonexistent");

        assert_eq!(store.get(&key).unwrap(), None);
        assert!(!store.has(&key).unwrap());
    }

    #[test]
    fn save_and_load_trie() {
        let store = MemoryStore::new();
        let trie = trie_with(&["a", "b"]);

        let key = save_trie(&store, &trie).unwrap();
        let loaded = load_trie(&store, &key).unwrap();

        assert_eq!(loaded, trie);
        assert_eq!(key, trie.serialize().key().unwrap());
    }

    #[test]
    fn save_is_content_addressed() {
        let store = MemoryStore::new();
        let k1 = save_trie(&store, &trie_with(&["a"])).unwrap();
        let k2 = save_trie(&store, &trie_with(&["a"])).unwrap();
        let k3 = save_trie(&store, &trie_with(&["b"])).unwrap();

        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn load_missing_and_corrupt() {
        let store = MemoryStore::new();
        let key = SnapshotKey::from_data(b"nothing");
        assert!(matches!(load_trie(&store, &key), Err(StoreError::NotFound(_))));

        store.put(&key, b"garbage").unwrap();
        assert!(matches!(
            load_trie(&store, &key),
            Err(StoreError::Snapshot(SnapshotError::Decode(_)))
        ));
    }
}

//! Persistent [`SnapshotStore`] on RocksDB, used to reload a saved session.
//!
//! Values are encoded trie snapshots keyed by their content hash, so writing
//! the same history twice stores one entry.

use std::path::Path;

use dendrimer_core::{SnapshotKey, SnapshotStore};
use rocksdb::{DB, Options};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("snapshot database error: {0}")]
pub struct RocksError(#[from] rocksdb::Error);

pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Opens the snapshot database at `path`, creating it on first use.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RocksError> {
        let mut options = Options::default();
        options.create_if_missing(true);
        Ok(RocksStore {
            db: DB::open(&options, path)?,
        })
    }
}

impl SnapshotStore for RocksStore {
    type Error = RocksError;

    fn get(&self, key: &SnapshotKey) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.db.get(key.as_bytes())?)
    }

    fn put(&self, key: &SnapshotKey, value: &[u8]) -> Result<(), Self::Error> {
        self.db.put(key.as_bytes(), value)?;
        Ok(())
    }

    fn has(&self, key: &SnapshotKey) -> Result<bool, Self::Error> {
        Ok(self.db.get_pinned(key.as_bytes())?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dendrimer_core::{Message, MessageTrie, Segment, StoreError, load_trie, save_trie};
    use tempfile::TempDir;

    fn scratch() -> (TempDir, RocksStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn sample_trie() -> MessageTrie {
        let mut trie = MessageTrie::new();
        trie.insert(&[
            Message::new("user", vec![Segment::text("Hello")]),
            Message::new("assistant", vec![Segment::text("Hi"), Segment::text(" there")]),
        ])
        .unwrap();
        trie
    }

    #[test]
    fn stores_snapshot_bytes_under_their_key() {
        let (_dir, store) = scratch();
        let snapshot = sample_trie().serialize();
        let bytes = snapshot.to_bytes().unwrap();
        let key = snapshot.key().unwrap();

        assert!(!store.has(&key).unwrap());
        assert_eq!(store.get(&key).unwrap(), None);
        store.put(&key, &bytes).unwrap();

        assert!(store.has(&key).unwrap());
        assert_eq!(store.get(&key).unwrap(), Some(bytes));
    }

    #[test]
    fn saving_twice_yields_one_key() {
        let (_dir, store) = scratch();
        let trie = sample_trie();
        assert_eq!(save_trie(&store, &trie).unwrap(), save_trie(&store, &trie).unwrap());
    }

    #[test]
    fn trie_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let trie = sample_trie();

        let key = {
            let store = RocksStore::open(dir.path()).unwrap();
            save_trie(&store, &trie).unwrap()
        };

        {
            let store = RocksStore::open(dir.path()).unwrap();
            let loaded = load_trie(&store, &key).unwrap();
            assert_eq!(loaded, trie);
        }
    }

    #[test]
    fn corrupt_entry_is_reported() {
        let (_dir, store) = scratch();
        let key = SnapshotKey::from_data(b"bad");
        store.put(&key, b"\x00\x01\x02").unwrap();

        assert!(matches!(load_trie(&store, &key), Err(StoreError::Snapshot(_))));
    }
}

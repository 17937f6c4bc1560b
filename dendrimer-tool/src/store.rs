use std::path::{Path, PathBuf};

use dendrimer_core::{MessageTrie, SnapshotKey, StoreError, load_trie};
use dendrimer_rocks::RocksStore;
use tracing::{debug, warn};

use crate::error::DmrError;

pub fn open_store(path: impl AsRef<Path>) -> Result<RocksStore, DmrError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "opening snapshot store");
    Ok(RocksStore::open(path)?)
}

/// Loads the trie stored under `key` to resume a session.
///
/// A snapshot that fails to decode or validate is replaced by an empty
/// trie; a missing key or a backend failure is an error.
pub fn restore_trie(store: &RocksStore, key: &SnapshotKey) -> Result<MessageTrie, DmrError> {
    match load_trie(store, key) {
        Ok(trie) => {
            debug!(%key, nodes = trie.node_count(), "restored trie");
            Ok(trie)
        }
        Err(StoreError::Snapshot(err)) => {
            warn!(%key, error = %err, "discarding unreadable snapshot");
            Ok(MessageTrie::new())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn load_existing(store: &RocksStore, key: &SnapshotKey) -> Result<MessageTrie, DmrError> {
    Ok(load_trie(store, key)?)
}

pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dendrimer")
        .join("store")
}

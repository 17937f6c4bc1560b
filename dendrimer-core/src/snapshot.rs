//! Value-typed, persistable encoding of a [`MessageTrie`](crate::MessageTrie).
//!
//! A snapshot lists node records in pre-order. Every record carries the
//! number of children it has, and the subtrees of those children follow it
//! in first-seen order. Nothing in a snapshot refers to live memory, so it
//! can be sent across threads, diffed, or written to a store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::SnapshotKey;
use crate::node::TokenKey;

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Error type for snapshot encoding and restoration.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
    #[error("failed to decode snapshot: {0}")]
    Decode(String),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

/// One trie node in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub key: String,
    pub source: String,
    pub terminal: bool,
    pub occurrence_count: u64,
    /// Number of child records whose subtrees follow this one.
    pub children: u64,
}

impl NodeRecord {
    pub fn token_key(&self) -> TokenKey {
        TokenKey::new(self.source.clone(), self.key.clone())
    }
}

/// A serialized trie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub nodes: Vec<NodeRecord>,
}

impl Snapshot {
    pub(crate) fn new(nodes: Vec<NodeRecord>) -> Self {
        Snapshot {
            version: SNAPSHOT_VERSION,
            nodes,
        }
    }

    /// Encodes the snapshot as CBOR.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes).map_err(|e| SnapshotError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Decodes a snapshot from CBOR.
    ///
    /// Only the envelope is checked here; structural consistency is checked
    /// when the snapshot is turned back into a trie.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot =
            ciborium::from_reader(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    /// Content key of the encoded snapshot.
    pub fn key(&self) -> Result<SnapshotKey, SnapshotError> {
        Ok(SnapshotKey::from_data(&self.to_bytes()?))
    }

    /// Number of node records, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth of every terminal record (root is depth 0), in pre-order.
    pub fn terminal_depths(&self) -> Vec<usize> {
        let mut depths = Vec::new();
        // Remaining children to visit at each open ancestor.
        let mut open: Vec<u64> = Vec::new();
        for record in &self.nodes {
            while let Some(0) = open.last() {
                open.pop();
            }
            if let Some(remaining) = open.last_mut() {
                *remaining -= 1;
            }
            if record.terminal {
                depths.push(open.len());
            }
            open.push(record.children);
        }
        depths
    }
}

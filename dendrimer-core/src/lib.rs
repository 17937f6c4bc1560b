//! Dendrimer is a branch-aware store for conversation history.
//!
//! Core concepts:
//! - **WordToken**: a word or fragment with ranked alternatives
//! - **Message**: a speaker's turn, built from text segments and word candidates
//! - **MessageTrie**: every committed conversation path, sharing common prefixes
//! - **Snapshot**: a value-typed encoding of a trie, used to clone and persist it
//! - **SnapshotStore**: where encoded snapshots are kept, addressed by content key
//!
//! # Example
//!
//! ```
//! use dendrimer_core::{Message, MessageTrie, Segment};
//!
//! let mut trie = MessageTrie::new();
//! let path = vec![
//!     Message::new("user", vec![Segment::text("Hello")]),
//!     Message::new("assistant", vec![Segment::text("Hi"), Segment::text(" there")]),
//! ];
//! trie.insert(&path).unwrap();
//!
//! // Commit points clone through a snapshot, leaving the original untouched.
//! let mut next = MessageTrie::deserialize(&trie.serialize()).unwrap();
//! next.insert(&path).unwrap();
//! assert_eq!(trie.root_count(), 1);
//! assert_eq!(next.root_count(), 2);
//! ```

mod key;
mod message;
mod node;
mod snapshot;
mod store;
mod token;
mod trie;

pub use key::{ParseKeyError, SnapshotKey};
pub use message::{Message, Segment, token_path};
pub use node::{Branch, NodeId, TokenKey, TrieNode};
pub use snapshot::{NodeRecord, SNAPSHOT_VERSION, Snapshot, SnapshotError};
pub use store::{MemoryStore, SnapshotStore, StoreError, load_trie, save_trie};
pub use token::{TokenError, WordProb, WordProbList, WordStatus, WordToken};
pub use trie::{MessageTrie, TrieError};

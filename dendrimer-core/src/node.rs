use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The identity of a trie edge: a token's text tagged with who produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenKey {
    pub source: String,
    pub text: String,
}

impl TokenKey {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        TokenKey {
            source: source.into(),
            text: text.into(),
        }
    }

    /// The root's key: empty source and text.
    pub fn root() -> Self {
        TokenKey {
            source: String::new(),
            text: String::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.source.is_empty() && self.text.is_empty()
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.source, self.text)
    }
}

/// Index of a node in a trie's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// A node of the message trie.
///
/// Children are arena indices owned by this node alone; iteration follows
/// the order in which they were first inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct TrieNode {
    pub(crate) key: TokenKey,
    pub(crate) children: IndexMap<TokenKey, NodeId>,
    pub(crate) terminal: bool,
    pub(crate) occurrence_count: u64,
}

impl TrieNode {
    pub(crate) fn new(key: TokenKey) -> Self {
        TrieNode {
            key,
            children: IndexMap::new(),
            terminal: false,
            occurrence_count: 0,
        }
    }

    pub fn key(&self) -> &TokenKey {
        &self.key
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Number of inserted paths that passed through this node.
    pub fn occurrence_count(&self) -> u64 {
        self.occurrence_count
    }

    pub(crate) fn child(&self, key: &TokenKey) -> Option<NodeId> {
        self.children.get(key).copied()
    }
}

/// A one-token continuation found by a branch lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub key: TokenKey,
    pub occurrence_count: u64,
    pub terminal: bool,
}

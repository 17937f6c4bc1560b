use std::borrow::Borrow;

use indexmap::IndexMap;
use thiserror::Error;

use crate::message::{Message, token_path};
use crate::node::{Branch, NodeId, TokenKey, TrieNode};
use crate::snapshot::{NodeRecord, SNAPSHOT_VERSION, Snapshot, SnapshotError};

/// Error type for trie operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrieError {
    #[error("cannot insert an empty path")]
    EmptyPath,
    #[error("no segment at message {i}, segment {j}")]
    PositionOutOfRange { i: usize, j: usize },
}

/// A branch-aware store of conversation paths.
///
/// Nodes live in an append-only arena with the root at index 0. Every node
/// is owned by exactly one parent; paths that share a prefix share the node
/// chain for that prefix and diverge into distinct children after it.
///
/// The trie only grows. Cloning for a new version goes through
/// [`serialize`](Self::serialize) and [`deserialize`](Self::deserialize), which
/// produce a fresh arena with nothing shared.
#[derive(Debug)]
pub struct MessageTrie {
    nodes: Vec<TrieNode>,
}

impl MessageTrie {
    /// Creates a trie holding only the root.
    pub fn new() -> Self {
        MessageTrie {
            nodes: vec![TrieNode::new(TokenKey::root())],
        }
    }

    /// Records a full conversation path.
    ///
    /// Every message segment becomes one token tagged with the message's
    /// source. The root and every node on the path have their occurrence
    /// count incremented, missing nodes are created, and the last node is
    /// marked terminal.
    pub fn insert<M: Borrow<Message>>(&mut self, path: &[M]) -> Result<(), TrieError> {
        self.insert_keys(token_path(path))
    }

    /// Records a path given directly as token keys.
    pub fn insert_keys(&mut self, keys: impl IntoIterator<Item = TokenKey>) -> Result<(), TrieError> {
        let mut keys = keys.into_iter().peekable();
        if keys.peek().is_none() {
            return Err(TrieError::EmptyPath);
        }

        let mut current = NodeId::ROOT;
        self.nodes[current.0].occurrence_count += 1;
        for key in keys {
            current = match self.nodes[current.0].child(&key) {
                Some(child) => child,
                None => self.push_child(current, key),
            };
            self.nodes[current.0].occurrence_count += 1;
        }
        self.nodes[current.0].terminal = true;
        Ok(())
    }

    fn push_child(&mut self, parent: NodeId, key: TokenKey) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TrieNode::new(key.clone()));
        self.nodes[parent.0].children.insert(key, id);
        id
    }

    /// The root node.
    pub fn root(&self) -> &TrieNode {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Number of paths committed to this trie.
    pub fn root_count(&self) -> u64 {
        self.root().occurrence_count
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    /// Follows `prefix` from the root.
    pub fn node(&self, prefix: &[TokenKey]) -> Option<&TrieNode> {
        let mut current = NodeId::ROOT;
        for key in prefix {
            current = self.nodes[current.0].child(key)?;
        }
        Some(&self.nodes[current.0])
    }

    /// The one-token continuations recorded after `prefix`.
    ///
    /// Returns an empty list when `prefix` was never inserted.
    pub fn branch_lookup(&self, prefix: &[TokenKey]) -> Vec<Branch> {
        let Some(node) = self.node(prefix) else {
            return Vec::new();
        };
        node.children
            .values()
            .map(|&id| {
                let child = &self.nodes[id.0];
                Branch {
                    key: child.key.clone(),
                    occurrence_count: child.occurrence_count,
                    terminal: child.terminal,
                }
            })
            .collect()
    }

    /// What has been recorded at the position of segment `j` of message `i`.
    ///
    /// The lookup prefix is every token of `messages` that precedes that
    /// segment, so the result includes the word currently displayed there
    /// (if it was committed) alongside every other word tried at that point.
    pub fn alternatives_at<M: Borrow<Message>>(
        &self,
        messages: &[M],
        i: usize,
        j: usize,
    ) -> Result<Vec<Branch>, TrieError> {
        let out_of_range = TrieError::PositionOutOfRange { i, j };
        let message: &Message = messages.get(i).ok_or(out_of_range.clone())?.borrow();
        if j >= message.content.len() {
            return Err(out_of_range);
        }
        let head = Message::new(message.source.clone(), message.content[..j].to_vec());
        let mut prefix = token_path(&messages[..i]);
        prefix.extend(head.token_keys());
        Ok(self.branch_lookup(&prefix))
    }

    /// Every root-to-terminal key path, in first-seen order.
    pub fn paths(&self) -> Vec<Vec<TokenKey>> {
        let mut paths = Vec::new();
        let mut path: Vec<TokenKey> = Vec::new();
        let mut stack: Vec<(NodeId, usize)> =
            self.root().children.values().rev().map(|&id| (id, 1)).collect();
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id.0];
            path.truncate(depth - 1);
            path.push(node.key.clone());
            if node.terminal {
                paths.push(path.clone());
            }
            stack.extend(node.children.values().rev().map(|&child| (child, depth + 1)));
        }
        paths
    }

    /// Encodes the whole tree as a snapshot.
    ///
    /// Records are emitted in pre-order with children in first-seen order,
    /// so repeated calls on the same trie give identical snapshots.
    pub fn serialize(&self) -> Snapshot {
        let mut records = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            records.push(NodeRecord {
                key: node.key.text.clone(),
                source: node.key.source.clone(),
                terminal: node.terminal,
                occurrence_count: node.occurrence_count,
                children: node.children.len() as u64,
            });
            stack.extend(node.children.values().rev().copied());
        }
        Snapshot::new(records)
    }

    /// Rebuilds a trie from a snapshot.
    ///
    /// The result owns a fresh arena. On error nothing is returned, so a
    /// corrupt snapshot can never leak a partially built trie.
    pub fn deserialize(snapshot: &Snapshot) -> Result<Self, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        struct Frame {
            id: NodeId,
            remaining: u64,
            child_total: u64,
        }

        let mut records = snapshot.nodes.iter();
        let root = records.next().ok_or_else(|| corrupt("no root record"))?;
        if !root.token_key().is_root() {
            return Err(corrupt(format!("root has key {}", root.token_key())));
        }
        if root.terminal {
            return Err(corrupt("root is marked terminal"));
        }

        let mut nodes = vec![TrieNode {
            key: TokenKey::root(),
            children: IndexMap::new(),
            terminal: false,
            occurrence_count: root.occurrence_count,
        }];
        let mut stack = vec![Frame {
            id: NodeId::ROOT,
            remaining: root.children,
            child_total: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.remaining == 0 {
                let (id, child_total) = (frame.id, frame.child_total);
                stack.pop();
                check_counts(&nodes[id.0], child_total)?;
                continue;
            }
            frame.remaining -= 1;

            let record = records
                .next()
                .ok_or_else(|| corrupt("snapshot ends inside a subtree"))?;
            let key = record.token_key();
            if key.text.is_empty() {
                return Err(corrupt("non-root node with empty key"));
            }
            if record.occurrence_count == 0 {
                return Err(corrupt(format!("node {key} has zero occurrences")));
            }
            frame.child_total = frame
                .child_total
                .checked_add(record.occurrence_count)
                .ok_or_else(|| corrupt("occurrence counts overflow"))?;

            let parent = frame.id;
            let id = NodeId(nodes.len());
            if nodes[parent.0].children.insert(key.clone(), id).is_some() {
                return Err(corrupt(format!("duplicate child {key}")));
            }
            nodes.push(TrieNode {
                key,
                children: IndexMap::new(),
                terminal: record.terminal,
                occurrence_count: record.occurrence_count,
            });
            stack.push(Frame {
                id,
                remaining: record.children,
                child_total: 0,
            });
        }

        if records.next().is_some() {
            return Err(corrupt("records left after the root subtree"));
        }
        Ok(MessageTrie { nodes })
    }

    /// A deep, independent copy made through a snapshot.
    pub fn snapshot_clone(&self) -> Result<Self, SnapshotError> {
        Self::deserialize(&self.serialize())
    }
}

fn corrupt(reason: impl Into<String>) -> SnapshotError {
    SnapshotError::Corrupt(reason.into())
}

// Every path through a node either continues into one child or ends there,
// so the children's counts never exceed the node's and the surplus is
// exactly the number of paths that ended at it.
fn check_counts(node: &TrieNode, child_total: u64) -> Result<(), SnapshotError> {
    if child_total > node.occurrence_count {
        return Err(corrupt(format!(
            "children of {} count {} paths but the node counts {}",
            node.key, child_total, node.occurrence_count
        )));
    }
    let ends_here = node.occurrence_count > child_total;
    if ends_here != node.terminal {
        return Err(corrupt(format!(
            "terminal flag of {} disagrees with its counts",
            node.key
        )));
    }
    Ok(())
}

impl Default for MessageTrie {
    fn default() -> Self {
        Self::new()
    }
}

/// Tries are equal when their snapshots are; arena layout is not compared.
impl PartialEq for MessageTrie {
    fn eq(&self, other: &Self) -> bool {
        self.serialize() == other.serialize()
    }
}

impl Eq for MessageTrie {}

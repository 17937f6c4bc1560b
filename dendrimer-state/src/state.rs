use std::sync::Arc;

use dendrimer_core::{Branch, Message, MessageTrie, Segment, TrieError};
use serde::{Deserialize, Serialize};

/// Coordinates of a segment: `messages[message].content[segment]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordPosition {
    pub message: usize,
    pub segment: usize,
}

impl WordPosition {
    pub fn new(message: usize, segment: usize) -> Self {
        WordPosition { message, segment }
    }
}

/// Sampling parameters the controller forwards to the model backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_new_tokens: u32,
    /// Candidates below this probability are not offered as alternatives.
    pub min_prob: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        GenerationParams {
            temperature: 1.0,
            max_new_tokens: 100,
            min_prob: 0.01,
        }
    }
}

/// What the backend reported about the loaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub estimated_ram_gb: f64,
    pub estimated_vram_gb: f64,
    pub max_context_length: u32,
}

impl Default for ModelInfo {
    fn default() -> Self {
        ModelInfo {
            name: String::new(),
            estimated_ram_gb: 0.0,
            estimated_vram_gb: 0.0,
            max_context_length: 8192,
        }
    }
}

/// Everything the view layer renders from.
///
/// A state is never mutated once built; [`apply`](crate::apply) returns a new
/// one. Messages that a transition does not touch, and the trie outside of
/// commits, are shared with the previous state by reference count.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub(crate) messages: Vec<Arc<Message>>,
    pub(crate) opened_word: Option<WordPosition>,
    pub(crate) trie: Arc<MessageTrie>,
    pub(crate) input_message: String,
    pub(crate) params: GenerationParams,
    pub(crate) model: ModelInfo,
    pub(crate) is_generating: bool,
    pub(crate) show_continue_generate: bool,
    pub(crate) show_heat_map: bool,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::with_trie(MessageTrie::new())
    }
}

impl ConversationState {
    /// A fresh session over an existing history, e.g. one restored from a store.
    pub fn with_trie(trie: MessageTrie) -> Self {
        ConversationState {
            messages: Vec::new(),
            opened_word: None,
            trie: Arc::new(trie),
            input_message: String::new(),
            params: GenerationParams::default(),
            model: ModelInfo::default(),
            is_generating: false,
            show_continue_generate: false,
            show_heat_map: false,
        }
    }

    /// The active branch, oldest message first.
    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    pub fn opened_word(&self) -> Option<WordPosition> {
        self.opened_word
    }

    /// The segment under the opened-word cursor.
    pub fn opened_segment(&self) -> Option<&Segment> {
        let pos = self.opened_word?;
        self.messages.get(pos.message)?.content.get(pos.segment)
    }

    /// Every committed continuation at the opened word.
    pub fn opened_branches(&self) -> Result<Vec<Branch>, TrieError> {
        match self.opened_word {
            None => Ok(Vec::new()),
            Some(pos) => self
                .trie
                .alternatives_at(&self.messages, pos.message, pos.segment),
        }
    }

    /// The committed history.
    pub fn trie(&self) -> &Arc<MessageTrie> {
        &self.trie
    }

    pub fn input_message(&self) -> &str {
        &self.input_message
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn model(&self) -> &ModelInfo {
        &self.model
    }

    /// A request to the backend is outstanding.
    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    /// The last commit stopped before an end-of-sequence token.
    pub fn show_continue_generate(&self) -> bool {
        self.show_continue_generate
    }

    pub fn show_heat_map(&self) -> bool {
        self.show_heat_map
    }

    /// Display text of every message, oldest first.
    pub fn transcript(&self) -> Vec<(String, String)> {
        self.messages
            .iter()
            .map(|m| (m.source.clone(), m.text()))
            .collect()
    }
}

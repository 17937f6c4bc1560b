use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

use crate::node::TokenKey;
use crate::token::{WordProbList, WordStatus, WordToken};

/// One piece of a message's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// A plain fragment of text.
    Text(String),
    /// The ranked candidates for a single word position.
    Words(WordProbList),
    /// A word the user picked in place of the one previously displayed.
    Picked { picked: String, previous: String },
}

impl Segment {
    pub fn text(s: impl Into<String>) -> Self {
        Segment::Text(s.into())
    }

    /// The text this segment contributes to the displayed message.
    pub fn primary_text(&self) -> &str {
        match self {
            Segment::Text(s) => s,
            Segment::Words(list) => list.head().text(),
            Segment::Picked { picked, .. } => picked,
        }
    }

    /// The token stored in the trie for this segment.
    pub fn token(&self) -> WordToken {
        match self {
            Segment::Text(s) => WordToken::plain(s.clone()),
            Segment::Words(list) => WordToken::from(list),
            Segment::Picked { picked, .. } => WordToken::with_status(picked.clone(), WordStatus::Picked),
        }
    }

    /// Every token a renderer needs for this segment.
    ///
    /// A picked segment also yields the replaced word, tagged `Previous`.
    pub fn display_tokens(&self) -> Vec<WordToken> {
        match self {
            Segment::Picked { picked, previous } => vec![
                WordToken::with_status(picked.clone(), WordStatus::Picked),
                WordToken::with_status(previous.clone(), WordStatus::Previous),
            ],
            other => vec![other.token()],
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Text(s.to_string())
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment::Text(s)
    }
}

impl From<WordProbList> for Segment {
    fn from(list: WordProbList) -> Self {
        Segment::Words(list)
    }
}

/// A message in a conversation: who said it and what was said, segment by segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub source: String,
    pub content: Vec<Segment>,
}

impl Message {
    pub fn new(source: impl Into<String>, content: Vec<Segment>) -> Self {
        Message {
            source: source.into(),
            content,
        }
    }

    /// Concatenated display text.
    pub fn text(&self) -> String {
        self.content.iter().map(Segment::primary_text).collect()
    }

    /// The trie keys for this message, in order.
    ///
    /// Segments with empty text are skipped; the empty key belongs to the root.
    pub fn token_keys(&self) -> impl Iterator<Item = TokenKey> + '_ {
        self.content
            .iter()
            .filter(|segment| !segment.primary_text().is_empty())
            .map(|segment| TokenKey::new(self.source.clone(), segment.primary_text()))
    }
}

/// Flattens a conversation into its trie path.
///
/// Message boundaries leave no key of their own: consecutive messages from
/// one source give the same path as a single message holding both contents.
pub fn token_path<M: Borrow<Message>>(messages: &[M]) -> Vec<TokenKey> {
    messages.iter().flat_map(|m| m.borrow().token_keys()).collect()
}

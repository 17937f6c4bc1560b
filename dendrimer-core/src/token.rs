use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for token construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenError {
    #[error("probability {probability} for {text:?} is outside [0, 1]")]
    ProbabilityOutOfRange { text: String, probability: f64 },
    #[error("candidate list is empty")]
    EmptyCandidates,
}

/// How a token came to be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordStatus {
    /// Streamed normally from the model or typed by the user.
    #[default]
    Plain,
    /// Chosen by the user in place of the word the model produced.
    Picked,
    /// The word that was displayed before a pick replaced it.
    Previous,
}

/// A candidate word with the probability the model assigned to it.
///
/// Serialized as a `[text, probability]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "(String, f64)", try_from = "(String, f64)")]
pub struct WordProb {
    text: String,
    probability: f64,
}

impl WordProb {
    /// Creates a candidate, rejecting probabilities outside `[0, 1]` (and NaN).
    pub fn new(text: impl Into<String>, probability: f64) -> Result<Self, TokenError> {
        let text = text.into();
        if !(0.0..=1.0).contains(&probability) {
            return Err(TokenError::ProbabilityOutOfRange { text, probability });
        }
        Ok(WordProb { text, probability })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl From<WordProb> for (String, f64) {
    fn from(w: WordProb) -> Self {
        (w.text, w.probability)
    }
}

impl TryFrom<(String, f64)> for WordProb {
    type Error = TokenError;

    fn try_from((text, probability): (String, f64)) -> Result<Self, Self::Error> {
        WordProb::new(text, probability)
    }
}

/// The ranked candidate set for a single word position.
///
/// The first entry is the displayed word; the rest are alternatives, most
/// likely first. Entries are unique by text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WordProb>", into = "Vec<WordProb>")]
pub struct WordProbList(Vec<WordProb>);

impl WordProbList {
    /// Builds a list from ranked candidates, dropping later duplicates.
    pub fn new(candidates: impl IntoIterator<Item = WordProb>) -> Result<Self, TokenError> {
        let mut list: Vec<WordProb> = Vec::new();
        for candidate in candidates {
            if !list.iter().any(|w| w.text == candidate.text) {
                list.push(candidate);
            }
        }
        if list.is_empty() {
            return Err(TokenError::EmptyCandidates);
        }
        Ok(WordProbList(list))
    }

    /// Convenience constructor from `(text, probability)` pairs.
    pub fn from_pairs<S: Into<String>>(
        pairs: impl IntoIterator<Item = (S, f64)>,
    ) -> Result<Self, TokenError> {
        let candidates = pairs
            .into_iter()
            .map(|(text, p)| WordProb::new(text, p))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(candidates)
    }

    /// The displayed word.
    pub fn head(&self) -> &WordProb {
        // Construction guarantees at least one entry.
        &self.0[0]
    }

    /// Alternatives to the displayed word, in rank order.
    pub fn alternatives(&self) -> &[WordProb] {
        &self.0[1..]
    }

    pub fn as_slice(&self) -> &[WordProb] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps the displayed word and replaces the alternatives with `candidates`.
    ///
    /// Candidates equal to the displayed word are skipped.
    pub fn refreshed(&self, candidates: &WordProbList) -> WordProbList {
        Self::headed_by(self.head().clone(), candidates)
    }

    /// A list displaying `text` with `candidates` as its alternatives.
    ///
    /// The displayed word keeps the probability `candidates` gives it, or
    /// 1.0 when it is not among them.
    pub fn displaying(text: &str, candidates: &WordProbList) -> WordProbList {
        let head = candidates
            .0
            .iter()
            .find(|w| w.text == text)
            .cloned()
            .unwrap_or_else(|| WordProb {
                text: text.to_string(),
                probability: 1.0,
            });
        Self::headed_by(head, candidates)
    }

    fn headed_by(head: WordProb, candidates: &WordProbList) -> WordProbList {
        let mut list = Vec::with_capacity(candidates.len() + 1);
        list.extend(candidates.0.iter().filter(|w| w.text != head.text).cloned());
        list.insert(0, head);
        WordProbList(list)
    }
}

impl TryFrom<Vec<WordProb>> for WordProbList {
    type Error = TokenError;

    fn try_from(v: Vec<WordProb>) -> Result<Self, Self::Error> {
        WordProbList::new(v)
    }
}

impl From<WordProbList> for Vec<WordProb> {
    fn from(l: WordProbList) -> Self {
        l.0
    }
}

/// The unit stored in the trie: one word or fragment with its alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct WordToken {
    pub text: String,
    pub alternatives: Vec<WordProb>,
    pub status: WordStatus,
}

impl WordToken {
    /// A token with no alternatives.
    pub fn plain(text: impl Into<String>) -> Self {
        WordToken {
            text: text.into(),
            alternatives: Vec::new(),
            status: WordStatus::Plain,
        }
    }

    pub fn with_status(text: impl Into<String>, status: WordStatus) -> Self {
        WordToken {
            text: text.into(),
            alternatives: Vec::new(),
            status,
        }
    }
}

impl From<&WordProbList> for WordToken {
    fn from(list: &WordProbList) -> Self {
        WordToken {
            text: list.head().text.clone(),
            alternatives: list.alternatives().to_vec(),
            status: WordStatus::Plain,
        }
    }
}

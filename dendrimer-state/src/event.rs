//! Events dispatched by the controller.

use dendrimer_core::{Message, Segment, WordProbList};
use serde::{Deserialize, Serialize};

use crate::state::{ModelInfo, WordPosition};

/// Everything that can change a [`ConversationState`](crate::ConversationState).
///
/// Serialized with a `type` tag so controllers can record sessions as event logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Streaming
    /// A chunk arrived from the backend (or the user typed one).
    AppendSegment { source: String, segment: Segment },
    /// The in-progress message is complete; commit it to the trie.
    MessageEnd { end_of_sequence: bool },
    SetGenerating { is_generating: bool },

    // Editing
    /// Replace the word at `(i, j)` and drop everything generated after it.
    SelectAlternateWord {
        i: usize,
        j: usize,
        previous_word: String,
        new_word: String,
    },
    /// Fresh candidates for the word at `(i, j)`; the displayed word stays.
    RefreshWordAt {
        i: usize,
        j: usize,
        candidates: WordProbList,
    },
    SetOpenedWord { position: Option<WordPosition> },

    // Sending
    /// Start over with a single message.
    ResetAndSend { source: String, content: String },
    SendNewMessage { source: String, content: String },
    SetMessages { messages: Vec<Message> },
    SetInputMessage { input_message: String },

    // Parameters
    SetModelInfo {
        model: ModelInfo,
        temperature: f64,
        max_new_tokens: u32,
    },
    SetTemperature { temperature: f64 },
    SetMaxNewTokens { max_new_tokens: u32 },
    SetMinProb { min_prob: f64 },
    ToggleHeatMap,
}

impl Event {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::AppendSegment { .. } => "append_segment",
            Event::MessageEnd { .. } => "message_end",
            Event::SetGenerating { .. } => "set_generating",
            Event::SelectAlternateWord { .. } => "select_alternate_word",
            Event::RefreshWordAt { .. } => "refresh_word_at",
            Event::SetOpenedWord { .. } => "set_opened_word",
            Event::ResetAndSend { .. } => "reset_and_send",
            Event::SendNewMessage { .. } => "send_new_message",
            Event::SetMessages { .. } => "set_messages",
            Event::SetInputMessage { .. } => "set_input_message",
            Event::SetModelInfo { .. } => "set_model_info",
            Event::SetTemperature { .. } => "set_temperature",
            Event::SetMaxNewTokens { .. } => "set_max_new_tokens",
            Event::SetMinProb { .. } => "set_min_prob",
            Event::ToggleHeatMap => "toggle_heat_map",
        }
    }

    pub fn append_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        Event::AppendSegment {
            source: source.into(),
            segment: Segment::Text(text.into()),
        }
    }
}

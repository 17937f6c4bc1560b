use std::sync::Arc;

use dendrimer_core::MessageTrie;
use tracing::warn;

use crate::event::Event;
use crate::state::ConversationState;
use crate::transition::{TransitionError, apply};

/// Holds the current state and applies events one at a time, in dispatch order.
///
/// Each successful dispatch publishes a new `Arc<ConversationState>`. Holders
/// of an earlier state (a paused render, a callback waiting on the backend)
/// keep seeing exactly what they captured.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: Arc<ConversationState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose committed history starts as `trie`.
    pub fn with_trie(trie: MessageTrie) -> Self {
        Session {
            current: Arc::new(ConversationState::with_trie(trie)),
        }
    }

    /// The most recently published state.
    pub fn state(&self) -> Arc<ConversationState> {
        Arc::clone(&self.current)
    }

    /// Applies `event` and publishes the result.
    ///
    /// On error the current state is kept and the error is returned.
    pub fn dispatch(&mut self, event: Event) -> Result<Arc<ConversationState>, TransitionError> {
        let kind = event.kind();
        match apply(&self.current, event) {
            Ok(next) => {
                self.current = Arc::new(next);
                Ok(self.state())
            }
            Err(err) => {
                warn!(event = kind, error = %err, "rejected event");
                Err(err)
            }
        }
    }
}

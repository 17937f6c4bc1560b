//! Conversation state and the transitions that drive a [`MessageTrie`](dendrimer_core::MessageTrie).
//!
//! The controller turns backend responses and user actions into [`Event`]s;
//! [`apply`] computes the next [`ConversationState`] from the previous one.
//! History is committed to the trie only when a message ends, always into a
//! fresh copy, so any state handed out earlier stays valid.

mod event;
mod session;
mod state;
mod transition;

pub use event::Event;
pub use session::Session;
pub use state::{ConversationState, GenerationParams, ModelInfo, WordPosition};
pub use transition::{TransitionError, apply};

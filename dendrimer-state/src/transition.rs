//! Pure state transition function.

use std::sync::Arc;

use dendrimer_core::{Message, Segment, SnapshotError, TrieError, WordProbList};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::event::Event;
use crate::state::{ConversationState, WordPosition};

/// Errors that can occur during a transition.
///
/// A failed transition produces no state; the input state is unchanged.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("no segment at message {i}, segment {j}")]
    IndexOutOfRange { i: usize, j: usize },
    #[error("segment at message {i}, segment {j} is plain text")]
    NotAWordList { i: usize, j: usize },
    #[error("commit failed: {0}")]
    Trie(#[from] TrieError),
    #[error("commit failed: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Computes the state that follows `state` once `event` has happened.
///
/// Pure: no I/O, and `state` is only read. Unchanged messages and, outside
/// of commits, the trie are shared with `state`. A commit inserts into a
/// fresh copy of the trie, so every trie reachable from an earlier state
/// stays exactly as it was.
#[instrument(level = "debug", skip_all, fields(event = event.kind()))]
pub fn apply(state: &ConversationState, event: Event) -> Result<ConversationState, TransitionError> {
    let mut next = state.clone();
    match event {
        Event::AppendSegment { source, segment } => {
            append_to_last(&mut next.messages, source, segment);
            next.show_continue_generate = false;
        }

        Event::MessageEnd { end_of_sequence } => {
            let mut trie = state.trie.snapshot_clone()?;
            trie.insert(&state.messages)?;
            debug!(
                nodes = trie.node_count(),
                paths = trie.root_count(),
                end_of_sequence,
                "committed conversation"
            );
            next.trie = Arc::new(trie);
            next.is_generating = false;
            next.show_continue_generate = !end_of_sequence;
        }

        Event::SetGenerating { is_generating } => {
            next.is_generating = is_generating;
        }

        Event::SelectAlternateWord {
            i,
            j,
            previous_word,
            new_word,
        } => {
            let message = segment_owner(state, i, j)?;
            let mut content = message.content[..j].to_vec();
            content.push(Segment::Picked {
                picked: new_word,
                previous: previous_word,
            });
            next.messages.truncate(i);
            next.messages
                .push(Arc::new(Message::new(message.source.clone(), content)));
            next.opened_word = None;
            next.show_continue_generate = false;
            next.is_generating = true;
        }

        Event::RefreshWordAt { i, j, candidates } => {
            let refreshed = match &segment_owner(state, i, j)?.content[j] {
                Segment::Words(list) => list.refreshed(&candidates),
                Segment::Picked { picked, .. } => WordProbList::displaying(picked, &candidates),
                Segment::Text(_) => return Err(TransitionError::NotAWordList { i, j }),
            };
            Arc::make_mut(&mut next.messages[i]).content[j] = Segment::Words(refreshed);
        }

        Event::SetOpenedWord { position } => {
            if let Some(WordPosition { message, segment }) = position {
                segment_owner(state, message, segment)?;
            }
            next.opened_word = position;
        }

        Event::ResetAndSend { source, content } => {
            next.messages = vec![Arc::new(Message::new(source, vec![Segment::Text(content)]))];
            after_send(&mut next);
        }

        Event::SendNewMessage { source, content } => {
            append_to_last(&mut next.messages, source, Segment::Text(content));
            after_send(&mut next);
        }

        Event::SetMessages { messages } => {
            next.messages = messages.into_iter().map(Arc::new).collect();
            next.opened_word = None;
            next.show_continue_generate = false;
        }

        Event::SetInputMessage { input_message } => {
            next.input_message = input_message;
        }

        Event::SetModelInfo {
            model,
            temperature,
            max_new_tokens,
        } => {
            next.model = model;
            next.params.temperature = temperature;
            next.params.max_new_tokens = max_new_tokens;
        }

        Event::SetTemperature { temperature } => next.params.temperature = temperature,
        Event::SetMaxNewTokens { max_new_tokens } => next.params.max_new_tokens = max_new_tokens,
        Event::SetMinProb { min_prob } => next.params.min_prob = min_prob,
        Event::ToggleHeatMap => next.show_heat_map = !next.show_heat_map,
    }
    Ok(next)
}

/// The message holding segment `(i, j)`, or `IndexOutOfRange`.
fn segment_owner(
    state: &ConversationState,
    i: usize,
    j: usize,
) -> Result<&Message, TransitionError> {
    state
        .messages
        .get(i)
        .map(Arc::as_ref)
        .filter(|m| j < m.content.len())
        .ok_or(TransitionError::IndexOutOfRange { i, j })
}

/// Appends to the last message when `source` matches, otherwise starts a new one.
///
/// The last message is copied before it is extended whenever another state
/// still holds it.
fn append_to_last(messages: &mut Vec<Arc<Message>>, source: String, segment: Segment) {
    match messages.last_mut() {
        Some(last) if last.source == source => Arc::make_mut(last).content.push(segment),
        _ => messages.push(Arc::new(Message::new(source, vec![segment]))),
    }
}

fn after_send(next: &mut ConversationState) {
    next.opened_word = None;
    next.input_message.clear();
    next.show_continue_generate = false;
    next.is_generating = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use dendrimer_core::TokenKey;

    fn state_with(messages: Vec<Message>) -> ConversationState {
        apply(&ConversationState::default(), Event::SetMessages { messages }).unwrap()
    }

    fn text_message(source: &str, words: &[&str]) -> Message {
        Message::new(source, words.iter().map(|w| Segment::text(*w)).collect())
    }

    #[test]
    fn append_extends_same_source_without_touching_previous_state() {
        let s1 = apply(&ConversationState::default(), Event::append_text("assistant", "Hi")).unwrap();
        let s2 = apply(&s1, Event::append_text("assistant", " there")).unwrap();

        assert_eq!(s1.messages().len(), 1);
        assert_eq!(s1.messages()[0].content.len(), 1);
        assert_eq!(s2.messages().len(), 1);
        assert_eq!(s2.messages()[0].text(), "Hi there");
        assert!(!Arc::ptr_eq(&s1.messages()[0], &s2.messages()[0]));
        assert!(Arc::ptr_eq(s1.trie(), s2.trie()));
    }

    #[test]
    fn append_other_source_starts_new_message_and_shares_old_ones() {
        let s1 = apply(&ConversationState::default(), Event::append_text("user", "Hello")).unwrap();
        let s2 = apply(&s1, Event::append_text("assistant", "Hi")).unwrap();

        assert_eq!(s2.messages().len(), 2);
        assert!(Arc::ptr_eq(&s1.messages()[0], &s2.messages()[0]));
    }

    #[test]
    fn append_clears_continue_offer() {
        let s = state_with(vec![text_message("user", &["hi"])]);
        let s = apply(&s, Event::MessageEnd { end_of_sequence: false }).unwrap();
        assert!(s.show_continue_generate());
        let s = apply(&s, Event::append_text("assistant", "more")).unwrap();
        assert!(!s.show_continue_generate());
    }

    #[test]
    fn select_alternate_word_truncates_branch() {
        let s = state_with(vec![
            text_message("user", &["a", "b"]),
            text_message("assistant", &["x", "y", "z", "w"]),
            text_message("user", &["c"]),
        ]);
        let s = apply(
            &s,
            Event::SetOpenedWord {
                position: Some(WordPosition::new(1, 2)),
            },
        )
        .unwrap();

        let next = apply(
            &s,
            Event::SelectAlternateWord {
                i: 1,
                j: 2,
                previous_word: "z".to_string(),
                new_word: "q".to_string(),
            },
        )
        .unwrap();

        assert_eq!(next.messages().len(), 2);
        let content = &next.messages()[1].content;
        assert_eq!(content.len(), 3);
        assert_eq!(
            content[2],
            Segment::Picked {
                picked: "q".to_string(),
                previous: "z".to_string(),
            }
        );
        assert!(next.is_generating());
        assert_eq!(next.opened_word(), None);
        assert!(Arc::ptr_eq(&s.messages()[0], &next.messages()[0]));
        assert_eq!(s.messages().len(), 3);
        assert_eq!(s.messages()[1].content.len(), 4);
    }

    #[test]
    fn select_out_of_range_fails() {
        let s = state_with(vec![text_message("user", &["a"])]);
        for (i, j) in [(0, 1), (1, 0)] {
            let err = apply(
                &s,
                Event::SelectAlternateWord {
                    i,
                    j,
                    previous_word: "a".to_string(),
                    new_word: "b".to_string(),
                },
            )
            .unwrap_err();
            assert!(matches!(err, TransitionError::IndexOutOfRange { i: ei, j: ej } if ei == i && ej == j));
        }
    }

    #[test]
    fn commit_clones_before_insert() {
        let s = state_with(vec![text_message("user", &["a", "b"])]);
        let c1 = apply(&s, Event::MessageEnd { end_of_sequence: true }).unwrap();
        let c2 = apply(&c1, Event::MessageEnd { end_of_sequence: true }).unwrap();

        assert!(s.trie().is_empty());
        assert!(!Arc::ptr_eq(c1.trie(), c2.trie()));
        assert_eq!(c1.trie().root_count(), 1);
        assert_eq!(c2.trie().root_count(), 2);

        let path = [TokenKey::new("user", "a"), TokenKey::new("user", "b")];
        assert_eq!(c1.trie().node(&path).unwrap().occurrence_count(), 1);
        assert_eq!(c2.trie().node(&path).unwrap().occurrence_count(), 2);
    }

    #[test]
    fn commit_of_nothing_fails() {
        let err = apply(
            &ConversationState::default(),
            Event::MessageEnd { end_of_sequence: true },
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::Trie(TrieError::EmptyPath)));
    }

    #[test]
    fn refresh_word_keeps_displayed_word() {
        let list = WordProbList::from_pairs([("cat", 0.6), ("dog", 0.2)]).unwrap();
        let s = state_with(vec![
            Message::new("assistant", vec![Segment::text("A"), Segment::Words(list)]),
            text_message("user", &["ok"]),
        ]);
        let fresh = WordProbList::from_pairs([("cat", 0.5), ("cow", 0.3), ("emu", 0.1)]).unwrap();
        let next = apply(
            &s,
            Event::RefreshWordAt {
                i: 0,
                j: 1,
                candidates: fresh.clone(),
            },
        )
        .unwrap();

        let Segment::Words(refreshed) = &next.messages()[0].content[1] else {
            panic!("expected word list");
        };
        let texts: Vec<_> = refreshed.as_slice().iter().map(|w| w.text()).collect();
        assert_eq!(texts, ["cat", "cow", "emu"]);
        assert_eq!(next.messages().len(), 2);

        let err = apply(
            &s,
            Event::RefreshWordAt {
                i: 0,
                j: 0,
                candidates: fresh,
            },
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::NotAWordList { i: 0, j: 0 }));
    }

    #[test]
    fn refresh_on_picked_word_lists_fresh_candidates_after_it() {
        let s = state_with(vec![Message::new(
            "assistant",
            vec![
                Segment::text("A"),
                Segment::Picked {
                    picked: " dog".to_string(),
                    previous: " cat".to_string(),
                },
            ],
        )]);
        let fresh = WordProbList::from_pairs([(" cat", 0.5), (" dog", 0.3), (" emu", 0.1)]).unwrap();
        let next = apply(
            &s,
            Event::RefreshWordAt {
                i: 0,
                j: 1,
                candidates: fresh,
            },
        )
        .unwrap();

        let Segment::Words(refreshed) = &next.messages()[0].content[1] else {
            panic!("expected word list");
        };
        let texts: Vec<_> = refreshed.as_slice().iter().map(|w| w.text()).collect();
        assert_eq!(texts, [" dog", " cat", " emu"]);
        assert_eq!(next.messages()[0].text(), "A dog");
    }

    #[test]
    fn reset_and_send_discards_history_but_not_trie() {
        let s = state_with(vec![text_message("user", &["old"])]);
        let s = apply(&s, Event::MessageEnd { end_of_sequence: true }).unwrap();
        let s = apply(
            &s,
            Event::SetInputMessage {
                input_message: "draft".to_string(),
            },
        )
        .unwrap();

        let next = apply(
            &s,
            Event::ResetAndSend {
                source: "user".to_string(),
                content: "new".to_string(),
            },
        )
        .unwrap();

        assert_eq!(next.messages().len(), 1);
        assert_eq!(next.messages()[0].text(), "new");
        assert_eq!(next.input_message(), "");
        assert!(next.is_generating());
        assert!(Arc::ptr_eq(s.trie(), next.trie()));
    }

    #[test]
    fn opened_word_must_exist() {
        let s = state_with(vec![text_message("user", &["a"])]);
        let err = apply(
            &s,
            Event::SetOpenedWord {
                position: Some(WordPosition::new(0, 3)),
            },
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::IndexOutOfRange { i: 0, j: 3 }));

        let s = apply(
            &s,
            Event::SetOpenedWord {
                position: Some(WordPosition::new(0, 0)),
            },
        )
        .unwrap();
        assert_eq!(s.opened_segment(), Some(&Segment::text("a")));
    }

    #[test]
    fn parameter_setters_replace_fields() {
        let s = ConversationState::default();
        let s = apply(&s, Event::SetTemperature { temperature: 0.7 }).unwrap();
        let s = apply(&s, Event::SetMaxNewTokens { max_new_tokens: 42 }).unwrap();
        let s = apply(&s, Event::SetMinProb { min_prob: 0.05 }).unwrap();
        let s = apply(&s, Event::ToggleHeatMap).unwrap();

        assert_eq!(s.params().temperature, 0.7);
        assert_eq!(s.params().max_new_tokens, 42);
        assert_eq!(s.params().min_prob, 0.05);
        assert!(s.show_heat_map());
        assert!(s.messages().is_empty());
    }
}

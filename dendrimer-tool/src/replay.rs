use std::io::BufRead;

use dendrimer_core::{Branch, TokenKey};
use dendrimer_state::{Event, Session};
use tracing::debug;

use crate::error::DmrError;

/// Reads a JSON-lines event log. Blank lines and lines starting with `#` are skipped.
pub fn read_events(reader: impl BufRead) -> Result<Vec<(usize, Event)>, DmrError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|source| DmrError::Event {
            line: index + 1,
            source,
        })?;
        events.push((index + 1, event));
    }
    Ok(events)
}

/// Dispatches events in log order, stopping at the first rejected one.
pub fn replay(session: &mut Session, events: Vec<(usize, Event)>) -> Result<(), DmrError> {
    for (line, event) in events {
        debug!(line, event = event.kind(), "dispatching");
        session
            .dispatch(event)
            .map_err(|source| DmrError::Transition { line, source })?;
    }
    Ok(())
}

/// Parses `source:text`; the text may itself contain colons.
pub fn parse_token(arg: &str) -> Result<TokenKey, DmrError> {
    match arg.split_once(':') {
        Some((source, text)) if !source.is_empty() && !text.is_empty() => {
            Ok(TokenKey::new(source, text))
        }
        _ => Err(DmrError::InvalidToken(arg.to_string())),
    }
}

/// Renders a path as one line per speaker turn.
pub fn format_path(path: &[TokenKey]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Option<&str> = None;
    for key in path {
        if current != Some(key.source.as_str()) {
            lines.push(format!("{}: ", key.source));
            current = Some(key.source.as_str());
        }
        if let Some(line) = lines.last_mut() {
            line.push_str(&key.text);
        }
    }
    lines.join("\n")
}

pub fn format_branch(branch: &Branch) -> String {
    let end = if branch.terminal { " (end)" } else { "" };
    format!("{:>6}  {}{}", branch.occurrence_count, branch.key, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = r#"
# greeting
{"type": "send_new_message", "source": "user", "content": "Hello"}
{"type": "append_segment", "source": "assistant", "segment": {"text": "Hi"}}
{"type": "message_end", "end_of_sequence": true}
"#;

    #[test]
    fn reads_and_replays_log() {
        let events = read_events(LOG.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].0, 3);

        let mut session = Session::new();
        replay(&mut session, events).unwrap();
        let state = session.state();
        assert_eq!(state.trie().root_count(), 1);
        assert_eq!(
            format_path(&state.trie().paths()[0]),
            "user: Hello\nassistant: Hi"
        );
    }

    #[test]
    fn bad_line_reports_line_number() {
        let log = "{\"type\": \"toggle_heat_map\"}\nnot json\n";
        match read_events(log.as_bytes()) {
            Err(DmrError::Event { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected event error, got {other:?}"),
        }
    }

    #[test]
    fn rejected_event_reports_line_number() {
        let log = r#"{"type": "select_alternate_word", "i": 0, "j": 0, "previous_word": "a", "new_word": "b"}"#;
        let events = read_events(log.as_bytes()).unwrap();
        let mut session = Session::new();
        match replay(&mut session, events) {
            Err(DmrError::Transition { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected transition error, got {other:?}"),
        }
    }

    #[test]
    fn token_arguments() {
        assert_eq!(
            parse_token("assistant:a:b").unwrap(),
            TokenKey::new("assistant", "a:b")
        );
        assert!(matches!(parse_token("nocolon"), Err(DmrError::InvalidToken(_))));
        assert!(parse_token(":x").is_err());
    }
}

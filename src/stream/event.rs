use serde::Deserialize;
use thiserror::Error;

/// Prefix of every event line
pub const DATA_PREFIX: &str = "data: ";

/// Payload signalling a clean end of the stream
pub const TERMINATOR: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Incremental assistant text
    Token,
    /// Progress note, e.g. a tool being called
    Thinking,
    /// Tool or agent failure reported by the server. Shown as a log entry,
    /// it does not fail the send.
    Error,
    /// Any discriminant this client does not know yet
    Other(String),
}

impl EventKind {
    fn from_discriminant(name: &str) -> Self {
        match name {
            "token" => EventKind::Token,
            "thinking" => EventKind::Thinking,
            "error" => EventKind::Error,
            other => EventKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub content: String,
}

impl StreamEvent {
    pub fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("malformed event payload {payload:?}: {error}")]
    Malformed { payload: String, error: String },

    #[error("'{kind}' event without content")]
    MissingContent { kind: String },
}

/// Result of classifying one complete line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not an event line (blank separators, comments, other SSE fields)
    Ignored,
    /// The stream ended cleanly
    Terminator,
    Parsed(StreamEvent),
    /// An event line whose payload could not be used
    Skipped(SkipReason),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
}

/// Classify a single line of the event stream
pub fn parse_line(line: &str) -> LineOutcome {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Ignored;
    };
    let data = data.trim();

    if data == TERMINATOR {
        return LineOutcome::Terminator;
    }

    let raw: RawEvent = match serde_json::from_str(data) {
        Ok(raw) => raw,
        Err(e) => {
            return LineOutcome::Skipped(SkipReason::Malformed {
                payload: data.to_string(),
                error: e.to_string(),
            })
        }
    };

    let kind = EventKind::from_discriminant(&raw.kind);
    match raw.content {
        Some(content) => LineOutcome::Parsed(StreamEvent { kind, content }),
        None if matches!(kind, EventKind::Other(_)) => LineOutcome::Parsed(StreamEvent {
            kind,
            content: String::new(),
        }),
        None => LineOutcome::Skipped(SkipReason::MissingContent { kind: raw.kind }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_event() {
        assert_eq!(
            parse_line(r#"data: {"type":"token","content":"Hello"}"#),
            LineOutcome::Parsed(StreamEvent::new(EventKind::Token, "Hello"))
        );
    }

    #[test]
    fn test_thinking_and_error_events() {
        assert_eq!(
            parse_line(r#"data: {"type": "thinking", "content": "Accessing Tool: web_search..."}"#),
            LineOutcome::Parsed(StreamEvent::new(
                EventKind::Thinking,
                "Accessing Tool: web_search..."
            ))
        );
        assert_eq!(
            parse_line(r#"data: {"type": "error", "content": "Tool Failed: 404"}"#),
            LineOutcome::Parsed(StreamEvent::new(EventKind::Error, "Tool Failed: 404"))
        );
    }

    #[test]
    fn test_token_content_whitespace_is_preserved() {
        // Only the payload is trimmed, not the JSON string inside it
        assert_eq!(
            parse_line("data: {\"type\":\"token\",\"content\":\" there\"}  \r"),
            LineOutcome::Parsed(StreamEvent::new(EventKind::Token, " there"))
        );
    }

    #[test]
    fn test_terminator() {
        assert_eq!(parse_line("data: [DONE]"), LineOutcome::Terminator);
        assert_eq!(parse_line("data: [DONE]\r"), LineOutcome::Terminator);
        assert_eq!(parse_line("data:  [DONE] "), LineOutcome::Terminator);
    }

    #[test]
    fn test_non_event_lines_are_ignored() {
        assert_eq!(parse_line(""), LineOutcome::Ignored);
        assert_eq!(parse_line(": keep-alive"), LineOutcome::Ignored);
        assert_eq!(parse_line("event: message"), LineOutcome::Ignored);
        assert_eq!(parse_line("data:{\"type\":\"token\"}"), LineOutcome::Ignored);
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        match parse_line("data: {\"type\":\"token\",\"content\":") {
            LineOutcome::Skipped(SkipReason::Malformed { payload, .. }) => {
                assert_eq!(payload, "{\"type\":\"token\",\"content\":");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(matches!(
            parse_line("data: not json"),
            LineOutcome::Skipped(SkipReason::Malformed { .. })
        ));
        assert!(matches!(
            parse_line(r#"data: {"content":"no type"}"#),
            LineOutcome::Skipped(SkipReason::Malformed { .. })
        ));
    }

    #[test]
    fn test_known_kind_without_content_is_skipped() {
        assert_eq!(
            parse_line(r#"data: {"type":"token"}"#),
            LineOutcome::Skipped(SkipReason::MissingContent {
                kind: "token".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_kind_is_parsed_as_other() {
        assert_eq!(
            parse_line(r#"data: {"type":"usage","tokens":12}"#),
            LineOutcome::Parsed(StreamEvent::new(
                EventKind::Other("usage".to_string()),
                ""
            ))
        );
    }
}

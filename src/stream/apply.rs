use super::event::{EventKind, StreamEvent};
use crate::conversation::{ConversationStore, MessageId};
use tracing::debug;

/// The single store change an event maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation<'a> {
    AppendContent(&'a str),
    AppendLog(&'a str),
}

/// Map an event to its mutation. Events of unknown kinds map to nothing.
pub fn dispatch(event: &StreamEvent) -> Option<Mutation<'_>> {
    match &event.kind {
        EventKind::Token => Some(Mutation::AppendContent(&event.content)),
        EventKind::Thinking | EventKind::Error => Some(Mutation::AppendLog(&event.content)),
        EventKind::Other(_) => None,
    }
}

/// Apply an event to the target message. Returns whether the store changed.
pub fn apply(store: &ConversationStore, target: MessageId, event: &StreamEvent) -> bool {
    match dispatch(event) {
        Some(Mutation::AppendContent(delta)) => store.append_content(target, delta),
        Some(Mutation::AppendLog(entry)) => store.append_log(target, entry),
        None => {
            debug!("Ignoring stream event of kind {:?}", event.kind);
            false
        }
    }
}

use super::message::{ImageAttachment, Message, MessageId, Role};
use crate::error::SendRejected;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Everything a reader of the conversation sees at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    /// True while a send is active. New sends are rejected until it clears.
    pub loading: bool,
}

impl ConversationSnapshot {
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

struct StoreInner {
    sender: watch::Sender<ConversationSnapshot>,
    next_id: AtomicU64,
}

/// Ordered message history shared between the stream driver and its readers.
///
/// Each mutation is applied in one step on the watch channel, so receivers
/// only ever observe whole snapshots and are woken after every change.
#[derive(Clone)]
pub struct ConversationStore {
    inner: Arc<StoreInner>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::from_messages(Vec::new())
    }

    /// Resume a conversation. New ids continue after the highest existing one.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let next_id = messages
            .iter()
            .map(|message| message.id.0 + 1)
            .max()
            .unwrap_or(1);
        let (sender, _) = watch::channel(ConversationSnapshot {
            messages,
            loading: false,
        });

        Self {
            inner: Arc::new(StoreInner {
                sender,
                next_id: AtomicU64::new(next_id),
            }),
        }
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.inner.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.inner.sender.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.sender.borrow().loading
    }

    fn allocate_id(&self) -> MessageId {
        MessageId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn append_message(
        &self,
        role: Role,
        content: impl Into<String>,
        images: Vec<ImageAttachment>,
    ) -> MessageId {
        let content = content.into();
        let mut id = MessageId(0);
        self.inner.sender.send_modify(|state| {
            // Allocated under the write lock so ids follow insertion order
            id = self.allocate_id();
            state.messages.push(Message::new(id, role, content, images));
        });
        trace!("Appended {:?} message {}", role, id);
        id
    }

    /// Concatenate `delta` onto the message content. Returns false when the
    /// id is unknown.
    pub fn append_content(&self, id: MessageId, delta: &str) -> bool {
        self.modify_message(id, |message| message.content.push_str(delta))
    }

    pub fn append_log(&self, id: MessageId, entry: impl Into<String>) -> bool {
        let entry = entry.into();
        self.modify_message(id, move |message| message.logs.push(entry))
    }

    /// Record a failure on the message. The error flag stays set for the
    /// rest of the conversation.
    pub fn mark_error(&self, id: MessageId, note: impl Into<String>) -> bool {
        let note = note.into();
        self.modify_message(id, move |message| {
            message.logs.push(note);
            message.error = true;
        })
    }

    fn modify_message<F>(&self, id: MessageId, update: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        let applied = self.inner.sender.send_if_modified(|state| {
            match state.messages.iter_mut().find(|message| message.id == id) {
                Some(message) => {
                    update(message);
                    true
                }
                None => false,
            }
        });
        if !applied {
            debug!("Ignoring update for unknown message {}", id);
        }
        applied
    }

    /// Start a send: append the user message and an empty assistant message
    /// and raise the loading flag, all in one update.
    ///
    /// The returned ticket clears the loading flag when dropped.
    pub fn begin_send(
        &self,
        prompt: &str,
        images: Vec<ImageAttachment>,
    ) -> Result<SendTicket, SendRejected> {
        let mut ids = None;
        self.inner.sender.send_if_modified(|state| {
            if state.loading {
                return false;
            }
            let user_message = self.allocate_id();
            state.messages.push(Message::new(
                user_message,
                Role::User,
                prompt.to_string(),
                images,
            ));
            let assistant_message = self.allocate_id();
            state.messages.push(Message::new(
                assistant_message,
                Role::Assistant,
                String::new(),
                Vec::new(),
            ));
            state.loading = true;
            ids = Some((user_message, assistant_message));
            true
        });

        let (user_message, assistant_message) = ids.ok_or(SendRejected::Busy)?;
        debug!(
            "Send started: user message {}, assistant message {}",
            user_message, assistant_message
        );
        Ok(SendTicket {
            store: self.clone(),
            user_message,
            assistant_message,
        })
    }

    fn clear_loading(&self) {
        self.inner.sender.send_if_modified(|state| {
            let was_loading = state.loading;
            state.loading = false;
            was_loading
        });
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of an active send. Dropping it clears the loading flag on every
/// path, including early returns and a dropped send future.
pub struct SendTicket {
    store: ConversationStore,
    user_message: MessageId,
    assistant_message: MessageId,
}

impl SendTicket {
    pub fn user_message(&self) -> MessageId {
        self.user_message
    }

    /// The in-flight message all stream events are applied to
    pub fn assistant_message(&self) -> MessageId {
        self.assistant_message
    }
}

impl Drop for SendTicket {
    fn drop(&mut self) {
        self.store.clear_loading();
        trace!("Loading flag cleared after {}", self.assistant_message);
    }
}

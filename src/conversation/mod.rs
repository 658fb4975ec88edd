mod message;
mod persistence;
mod store;

pub use message::{ImageAttachment, Message, MessageId, Role};
pub use persistence::{Transcript, TranscriptFile};
pub use store::{ConversationSnapshot, ConversationStore, SendTicket};

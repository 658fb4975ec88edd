//! Streaming chat client for the Oswald agent server.
//!
//! A send appends the user prompt and an empty assistant message to the
//! [`conversation::ConversationStore`], then the [`driver::StreamDriver`]
//! reads the server's event stream and grows the assistant message as
//! events arrive.

pub mod client;
pub mod config;
pub mod conversation;
pub mod driver;
pub mod error;
pub mod logging;
pub mod stream;
pub mod ui;

pub use client::{ChatRequest, ChatTransport, HttpTransport};
pub use config::ClientConfig;
pub use conversation::{ConversationSnapshot, ConversationStore, Message, MessageId, Role};
pub use driver::{SendOutcome, StreamDriver, StreamEnd};
pub use error::{SendRejected, StreamError};

use crate::client::{ChatRequest, ChatTransport};
use crate::conversation::{ConversationStore, ImageAttachment, MessageId};
use crate::error::{SendRejected, StreamError};
use crate::stream::{apply, EventPipeline, LineOutcome};
use futures::StreamExt;
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

/// How a completed stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server sent the terminator line
    Terminator,
    /// The body closed without a terminator
    EndOfBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The prompt was blank. Nothing was appended or sent.
    Ignored,
    Completed { message: MessageId, end: StreamEnd },
    /// The send failed and `note` was recorded on `message`
    Failed { message: MessageId, note: String },
}

/// Runs one send end to end: appends the message pair, opens the response
/// stream and applies every event to the in-flight assistant message.
pub struct StreamDriver {
    store: ConversationStore,
    transport: Box<dyn ChatTransport>,
    user_id: String,
    flush_partial_line: bool,
}

impl StreamDriver {
    pub fn new(
        store: ConversationStore,
        transport: Box<dyn ChatTransport>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            user_id: user_id.into(),
            flush_partial_line: false,
        }
    }

    pub fn with_flush_partial_line(mut self, flush: bool) -> Self {
        self.flush_partial_line = flush;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Send a prompt and stream the answer into the conversation.
    ///
    /// Stream failures are recorded on the assistant message and reported as
    /// [`SendOutcome::Failed`]. The only error is a rejection because another
    /// send is still active. The loading flag is cleared before this returns.
    pub async fn send(
        &self,
        prompt: &str,
        images: Vec<ImageAttachment>,
    ) -> Result<SendOutcome, SendRejected> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            debug!("Ignoring empty prompt");
            return Ok(SendOutcome::Ignored);
        }

        let ticket = self.store.begin_send(prompt, images)?;
        let target = ticket.assistant_message();
        let request = ChatRequest {
            prompt: prompt.to_string(),
            user_id: self.user_id.clone(),
        };

        let outcome = match self.stream_into(&request, target).await {
            Ok(end) => {
                info!("Response {} completed ({:?})", target, end);
                SendOutcome::Completed {
                    message: target,
                    end,
                }
            }
            Err(e) => {
                let note = e.to_string();
                warn!("Response {} failed: {}", target, note);
                self.store.mark_error(target, note.clone());
                SendOutcome::Failed {
                    message: target,
                    note,
                }
            }
        };

        drop(ticket);
        Ok(outcome)
    }

    async fn stream_into(
        &self,
        request: &ChatRequest,
        target: MessageId,
    ) -> Result<StreamEnd, StreamError> {
        let mut body = self
            .transport
            .open_stream(request)
            .await?
            .ok_or(StreamError::NoResponseBody)?;
        debug!("Streaming response into {}", target);

        let mut pipeline = EventPipeline::new().with_flush_partial_line(self.flush_partial_line);

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if self.handle_lines(pipeline.feed(&chunk), target).is_break() {
                return Ok(StreamEnd::Terminator);
            }
        }

        if self.handle_lines(pipeline.finish(), target).is_break() {
            return Ok(StreamEnd::Terminator);
        }
        Ok(StreamEnd::EndOfBody)
    }

    fn handle_lines(&self, outcomes: Vec<LineOutcome>, target: MessageId) -> ControlFlow<()> {
        for outcome in outcomes {
            match outcome {
                LineOutcome::Parsed(event) => {
                    apply(&self.store, target, &event);
                }
                LineOutcome::Terminator => return ControlFlow::Break(()),
                LineOutcome::Skipped(reason) => warn!("Skipping stream event: {}", reason),
                LineOutcome::Ignored => {}
            }
        }
        ControlFlow::Continue(())
    }
}

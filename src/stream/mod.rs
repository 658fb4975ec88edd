//! Turns a response body into stream events.
//!
//! Bytes go through [`Utf8StreamDecoder`], the decoded text is cut into lines
//! by [`LineBuffer`] and every complete line is classified by [`parse_line`].
//! [`apply`] then maps events onto the conversation store.

pub mod apply;
mod decoder;
mod event;
mod line_buffer;

pub use apply::{apply, dispatch, Mutation};
pub use decoder::Utf8StreamDecoder;
pub use event::{
    parse_line, EventKind, LineOutcome, SkipReason, StreamEvent, DATA_PREFIX, TERMINATOR,
};
pub use line_buffer::LineBuffer;

use tracing::debug;

/// Decoder, line framer and parser chained for one response body
pub struct EventPipeline {
    decoder: Utf8StreamDecoder,
    lines: LineBuffer,
    flush_partial_line: bool,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self {
            decoder: Utf8StreamDecoder::new(),
            lines: LineBuffer::new(),
            flush_partial_line: false,
        }
    }

    /// Also parse an unterminated last line when the body ends. By default
    /// such a fragment is dropped.
    pub fn with_flush_partial_line(mut self, flush: bool) -> Self {
        self.flush_partial_line = flush;
        self
    }

    /// Feed one body chunk and classify the lines it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<LineOutcome> {
        let text = self.decoder.decode(chunk);
        self.lines
            .push(&text)
            .iter()
            .map(|line| parse_line(line))
            .collect()
    }

    /// Classify what is left once the body has ended
    pub fn finish(&mut self) -> Vec<LineOutcome> {
        let text = self.decoder.finish();
        let mut outcomes: Vec<LineOutcome> = self
            .lines
            .push(&text)
            .iter()
            .map(|line| parse_line(line))
            .collect();

        if let Some(remainder) = self.lines.take_remainder() {
            if self.flush_partial_line {
                outcomes.push(parse_line(&remainder));
            } else {
                debug!("Dropping unterminated line at end of stream: {:?}", remainder);
            }
        }

        outcomes
    }
}

impl Default for EventPipeline {
    fn default() -> Self {
        Self::new()
    }
}

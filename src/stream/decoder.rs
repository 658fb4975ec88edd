use encoding_rs::{CoderResult, Decoder, UTF_8};

/// Incremental UTF-8 decoder for response body chunks.
///
/// Bytes of a character split across two chunks are held back until the rest
/// arrives. Invalid sequences decode to U+FFFD instead of failing.
pub struct Utf8StreamDecoder {
    decoder: Decoder,
    finished: bool,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_with_bom_removal(),
            finished: false,
        }
    }

    /// Decode the next chunk, returning text for complete characters only
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.decode_bytes(chunk, false)
    }

    /// Flush any held back bytes at end of stream. Further calls return
    /// an empty string.
    pub fn finish(&mut self) -> String {
        self.decode_bytes(&[], true)
    }

    fn decode_bytes(&mut self, bytes: &[u8], last: bool) -> String {
        if self.finished {
            return String::new();
        }
        self.finished = last;

        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 4);
        let mut output = String::with_capacity(capacity);
        let mut remaining = bytes;

        loop {
            let (result, read, _had_replacements) =
                self.decoder
                    .decode_to_string(remaining, &mut output, last);
            remaining = &remaining[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => output.reserve(remaining.len() * 3 + 4),
            }
        }

        output
    }
}

impl Default for Utf8StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

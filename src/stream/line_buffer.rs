/// Splits decoded text into newline terminated lines.
///
/// The segment after the last newline stays buffered until a later push
/// completes it.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Append a text fragment and return every line it completed, in order.
    /// Empty lines are returned as empty strings.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let mut complete = std::mem::replace(&mut self.buffer, rest);
        complete.pop();

        complete.split('\n').map(str::to_owned).collect()
    }

    /// Text received after the last newline
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Take the unterminated remainder, if there is any
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

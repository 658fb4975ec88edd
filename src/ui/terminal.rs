use super::UIError;
use crate::conversation::{
    ConversationSnapshot, ImageAttachment, Message, MessageId, Role,
};
use crate::driver::{SendOutcome, StreamDriver};
use crate::error::SendRejected;
use std::collections::HashMap;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

// ANSI color codes for terminal formatting
struct Colors {
    reset: &'static str,
    dim: &'static str,
    bold: &'static str,
    italic: &'static str,
    green: &'static str,
    red: &'static str,
    cyan: &'static str,
}

impl Colors {
    fn new() -> Self {
        Colors {
            reset: "\x1b[0m",
            dim: "\x1b[2m",
            bold: "\x1b[1m",
            italic: "\x1b[3m",
            green: "\x1b[32m",
            red: "\x1b[31m",
            cyan: "\x1b[36m",
        }
    }

    fn plain() -> Self {
        Colors {
            reset: "",
            dim: "",
            bold: "",
            italic: "",
            green: "",
            red: "",
            cyan: "",
        }
    }
}

// How much of a message has already been written out
#[derive(Default)]
struct Progress {
    header_shown: bool,
    content_len: usize,
    logs_len: usize,
}

/// Prints the conversation incrementally as snapshots arrive
pub struct TerminalUI {
    colors: Colors,
    progress: HashMap<MessageId, Progress>,
    at_line_start: bool,
    was_loading: bool,
    input: BufReader<Stdin>,
}

impl TerminalUI {
    pub fn new() -> Self {
        Self::with_colors(Colors::new())
    }

    /// Same output without escape codes, for pipes and files
    pub fn plain() -> Self {
        Self::with_colors(Colors::plain())
    }

    fn with_colors(colors: Colors) -> Self {
        Self {
            colors,
            progress: HashMap::new(),
            at_line_start: true,
            was_loading: false,
            input: BufReader::new(tokio::io::stdin()),
        }
    }

    /// Write whatever changed since the previous snapshot
    pub fn render<W: Write>(
        &mut self,
        snapshot: &ConversationSnapshot,
        out: &mut W,
    ) -> Result<(), UIError> {
        for message in &snapshot.messages {
            self.render_message(message, out)?;
        }

        // Finish the answer line once the send is over
        if self.was_loading && !snapshot.loading && !self.at_line_start {
            writeln!(out)?;
            self.at_line_start = true;
        }
        self.was_loading = snapshot.loading;

        out.flush()?;
        Ok(())
    }

    fn render_message<W: Write>(&mut self, message: &Message, out: &mut W) -> Result<(), UIError> {
        let mut progress = self.progress.remove(&message.id).unwrap_or_default();

        if !progress.header_shown {
            self.start_line(out)?;
            match message.role {
                Role::User => {
                    write!(
                        out,
                        "{}{}You:{} ",
                        self.colors.green, self.colors.bold, self.colors.reset
                    )?;
                    if !message.images.is_empty() {
                        write!(
                            out,
                            "{}[{} image(s)]{} ",
                            self.colors.dim,
                            message.images.len(),
                            self.colors.reset
                        )?;
                    }
                }
                Role::Assistant => write!(
                    out,
                    "{}{}Oswald:{} ",
                    self.colors.cyan, self.colors.bold, self.colors.reset
                )?,
            }
            self.at_line_start = false;
            progress.header_shown = true;
        }

        for (index, entry) in message.logs.iter().enumerate().skip(progress.logs_len) {
            self.start_line(out)?;
            // mark_error appends the note and sets the flag in one update
            if message.error && index + 1 == message.logs.len() {
                writeln!(out, "  {}✗ {}{}", self.colors.red, entry, self.colors.reset)?;
            } else {
                writeln!(
                    out,
                    "  {}{}· {}{}",
                    self.colors.dim, self.colors.italic, entry, self.colors.reset
                )?;
            }
            self.at_line_start = true;
        }
        progress.logs_len = message.logs.len();

        if message.content.len() > progress.content_len {
            let delta = &message.content[progress.content_len..];
            write!(out, "{}", delta)?;
            self.at_line_start = delta.ends_with('\n');
            progress.content_len = message.content.len();
        }

        self.progress.insert(message.id, progress);
        Ok(())
    }

    fn start_line<W: Write>(&mut self, out: &mut W) -> Result<(), UIError> {
        if !self.at_line_start {
            writeln!(out)?;
            self.at_line_start = true;
        }
        Ok(())
    }

    /// Read the next prompt. Returns None at end of input.
    pub async fn read_prompt(&mut self) -> Result<Option<String>, UIError> {
        print!("{}> {}", self.colors.green, self.colors.reset);
        io::stdout().flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Run a send and print the conversation as it streams in
    pub async fn send(
        &mut self,
        driver: &StreamDriver,
        prompt: &str,
        images: Vec<ImageAttachment>,
    ) -> Result<Result<SendOutcome, SendRejected>, UIError> {
        let mut updates = driver.store().subscribe();
        let mut stdout = io::stdout();

        let send = driver.send(prompt, images);
        tokio::pin!(send);

        let outcome = loop {
            tokio::select! {
                outcome = &mut send => break outcome,
                Ok(()) = updates.changed() => {
                    let snapshot = updates.borrow_and_update().clone();
                    self.render(&snapshot, &mut stdout)?;
                }
            }
        };

        self.render(&driver.store().snapshot(), &mut stdout)?;
        Ok(outcome)
    }
}

impl Default for TerminalUI {
    fn default() -> Self {
        Self::new()
    }
}

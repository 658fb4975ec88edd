use super::message::Message;
use super::store::ConversationStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk form of a conversation
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transcript {
    pub messages: Vec<Message>,
}

/// Saves and restores the message history as pretty printed JSON
pub struct TranscriptFile {
    path: PathBuf,
}

impl TranscriptFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, store: &ConversationStore) -> Result<()> {
        let transcript = Transcript {
            messages: store.snapshot().messages,
        };
        debug!("Saving transcript to {}", self.path.display());
        let json = serde_json::to_string_pretty(&transcript)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write transcript {}", self.path.display()))?;
        Ok(())
    }

    /// Load the stored conversation, or start an empty one if the file does
    /// not exist yet
    pub fn load(&self) -> Result<ConversationStore> {
        if !self.path.exists() {
            return Ok(ConversationStore::new());
        }

        debug!("Loading transcript from {}", self.path.display());
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read transcript {}", self.path.display()))?;
        let transcript: Transcript = serde_json::from_str(&json)
            .with_context(|| format!("Invalid transcript {}", self.path.display()))?;
        Ok(ConversationStore::from_messages(transcript.messages))
    }
}

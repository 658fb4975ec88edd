use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

pub const ENV_SERVER_URL: &str = "OSWALD_SERVER_URL";
pub const ENV_API_VERSION: &str = "OSWALD_API_VERSION";
pub const ENV_USER_ID: &str = "OSWALD_USER_ID";

/// Connection settings for the chat server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub api_version: String,
    /// Sent with every prompt so the server can scope memory and tools
    pub user_id: String,
    pub connect_timeout_secs: u64,
    /// Parse a last event line that is missing its newline when the body ends
    pub flush_partial_line: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            api_version: "v1".to_string(),
            user_id: "anonymous".to_string(),
            connect_timeout_secs: 10,
            flush_partial_line: false,
        }
    }
}

/// Get the path to the configuration file
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("oswald-client").join("config.json"))
}

impl ClientConfig {
    /// Load the config file (the default location when `path` is None),
    /// then apply environment overrides. A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => get_config_path()?,
        };

        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Overwrite fields from variables found by `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(server_url) = lookup(ENV_SERVER_URL) {
            self.server_url = server_url;
        }
        if let Some(api_version) = lookup(ENV_API_VERSION) {
            self.api_version = api_version;
        }
        if let Some(user_id) = lookup(ENV_USER_ID) {
            self.user_id = user_id;
        }
    }

    /// URL of the streaming send endpoint
    pub fn endpoint(&self) -> Result<Url> {
        let base = format!("{}/", self.server_url.trim_end_matches('/'));
        let base = Url::parse(&base)
            .with_context(|| format!("Invalid server URL: {}", self.server_url))?;
        Ok(base.join(&format!("api/{}/chat/send", self.api_version))?)
    }
}

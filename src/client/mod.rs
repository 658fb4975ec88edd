mod http;

pub use http::HttpTransport;

use crate::error::StreamError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;

/// Response body as it arrives from the server
pub type ByteStream = BoxStream<'static, Result<Bytes, StreamError>>;

/// Body of the chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub user_id: String,
}

/// Opens the streamed response for a prompt
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Returns `Ok(None)` when the server answered without a readable body
    async fn open_stream(&self, request: &ChatRequest) -> Result<Option<ByteStream>, StreamError>;
}

#[cfg(test)]
mod tests;

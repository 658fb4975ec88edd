use super::{ByteStream, ChatRequest, ChatTransport};
use crate::config::ClientConfig;
use crate::error::StreamError;
use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Talks to the chat server's streaming send endpoint
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint()?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_stream(&self, request: &ChatRequest) -> Result<Option<ByteStream>, StreamError> {
        debug!("Sending prompt to {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Ok(None);
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(StreamError::from));
        Ok(Some(body.boxed()))
    }
}

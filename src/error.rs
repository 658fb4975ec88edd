use thiserror::Error;

/// Failures that end a send. The driver turns these into an error note on the
/// in-flight assistant message; they never reach the caller.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("No response body")]
    NoResponseBody,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Returned by a send that could not start.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    #[error("A response is still streaming")]
    Busy,
}

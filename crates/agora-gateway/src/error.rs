use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("model backend unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("invalid structured output: {0}")]
    InvalidStructuredOutput(String),

    #[error("model call timed out after {} seconds", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("model backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

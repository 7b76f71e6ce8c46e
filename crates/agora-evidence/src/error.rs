use thiserror::Error;

/// A single backend's failure. Never escapes [`EvidenceSource`](crate::EvidenceSource).
#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} returned status {status}")]
    Status { backend: &'static str, status: u16 },

    #[error("{0} quota exhausted")]
    Quota(&'static str),

    #[error("failed to parse {backend} response: {reason}")]
    Parse {
        backend: &'static str,
        reason: String,
    },

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

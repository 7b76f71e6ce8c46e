use agora_gateway::GatewayError;
use agora_threads::ThreadError;
use thiserror::Error;

/// Failures of the storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(ThreadError),

    #[error("database connection failed: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("storage task failed: {0}")]
    Task(String),
}

impl From<ThreadError> for StoreError {
    fn from(err: ThreadError) -> Self {
        match err {
            ThreadError::NotFound(id) | ThreadError::MessageNotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

/// Internal to the policy. Always degraded to a non-acting decision.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to count messages since last summary: {0}")]
    Store(#[from] StoreError),
}

/// Failures of a facilitation action. Caught by the orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("thread {0} has no messages to summarize")]
    NothingToSummarize(String),

    #[error("no claim to fact-check")]
    NoClaim,

    #[error("thread {0} has nothing to observe yet")]
    NothingToObserve(String),

    #[error("conversation state of thread {0} kept changing during the update")]
    StateConflict(String),

    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

//! Thread, message, and claim persistence for Agora.
//!
//! Plain functions over a borrowed `rusqlite::Connection`; callers own the
//! pool and decide where blocking happens. Threads carry their facilitation
//! settings and the living conversation state, messages are either user
//! content or facilitator output tagged with a [`MessageKind`], and claims
//! record fact-check verdicts together with the evidence that backed them.
//!
//! [`MessageKind`]: agora_types::MessageKind

use thiserror::Error;

mod claims;
mod facilitation;
mod messages;
mod threads;

pub use claims::{insert_claim, list_claims, ClaimRecord, CreateClaimParams};
pub use facilitation::{commit_fact_check, commit_summary};
pub use messages::{
    count_user_messages_since, create_message, delete_message, get_message, list_messages,
    recent_user_messages, CreateMessageParams, Message,
};
pub use threads::{
    create_thread, get_thread, list_threads, update_conversation_state, update_thread_settings,
    CreateThreadParams, UpdateThreadSettings,
};

/// Errors that can occur during thread storage operations.
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("thread not found: {0}")]
    NotFound(String),
    #[error("message not found: {0}")]
    MessageNotFound(String),
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wraps a column decode failure so it surfaces as a `rusqlite` error.
pub(crate) fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

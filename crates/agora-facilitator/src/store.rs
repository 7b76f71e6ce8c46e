//! The storage collaborator and its SQLite implementation.

use agora_db::DbPool;
use agora_threads::{CreateClaimParams, CreateMessageParams, Message, ThreadError};
use agora_types::{ConversationState, InterventionMetadata, MessageKind, ThreadConfig, Verdict};
use async_trait::async_trait;
use rusqlite::Connection;

use crate::StoreError;

/// Author recorded on facilitator messages.
pub const FACILITATOR_AUTHOR_ID: &str = "agora-facilitator";
pub const FACILITATOR_AUTHOR_NAME: &str = "Facilitator";

/// A facilitator message about to be written.
#[derive(Debug, Clone)]
pub struct NewFacilitatorMessage {
    pub thread_id: String,
    pub kind: MessageKind,
    pub content: String,
    pub metadata: Option<InterventionMetadata>,
}

/// A verdict about to be recorded alongside its fact-check message.
#[derive(Debug, Clone)]
pub struct NewVerdictRecord {
    pub source_message_id: Option<String>,
    pub claim_text: String,
    pub verdict: Verdict,
}

/// Everything the facilitator reads or writes.
#[async_trait]
pub trait FacilitatorStore: Send + Sync {
    async fn get_thread(&self, thread_id: &str) -> Result<ThreadConfig, StoreError>;

    /// Looks up a message by ID. Soft-deleted messages are returned with
    /// `deleted` set.
    async fn get_message(&self, message_id: &str) -> Result<Option<Message>, StoreError>;

    /// Non-deleted user messages created after `since` (all of them when `None`).
    async fn count_user_messages_since(
        &self,
        thread_id: &str,
        since: Option<&str>,
    ) -> Result<u64, StoreError>;

    /// Up to `limit` most recent user messages, oldest first.
    async fn recent_user_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError>;

    async fn create_facilitator_message(
        &self,
        message: NewFacilitatorMessage,
    ) -> Result<Message, StoreError>;

    /// Writes a summary message and the new state atomically, with a
    /// compare-and-set on the state revision that also records
    /// `last_summary_at`. `Ok(None)` means the revision no longer matched and
    /// nothing was written.
    async fn commit_summary(
        &self,
        message: NewFacilitatorMessage,
        expected_revision: u64,
        state: &ConversationState,
        last_summary_at: &str,
    ) -> Result<Option<Message>, StoreError>;

    /// Writes a fact-check message and its claim record atomically.
    async fn commit_fact_check(
        &self,
        message: NewFacilitatorMessage,
        record: NewVerdictRecord,
    ) -> Result<Message, StoreError>;
}

/// [`FacilitatorStore`] over the SQLite pool. Each call runs on the blocking
/// thread pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, ThreadError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn).map_err(StoreError::from)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl FacilitatorStore for SqliteStore {
    async fn get_thread(&self, thread_id: &str) -> Result<ThreadConfig, StoreError> {
        let thread_id = thread_id.to_string();
        self.with_conn(move |conn| agora_threads::get_thread(conn, &thread_id))
            .await
    }

    async fn get_message(&self, message_id: &str) -> Result<Option<Message>, StoreError> {
        let message_id = message_id.to_string();
        match self
            .with_conn(move |conn| agora_threads::get_message(conn, &message_id))
            .await
        {
            Ok(message) => Ok(Some(message)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn count_user_messages_since(
        &self,
        thread_id: &str,
        since: Option<&str>,
    ) -> Result<u64, StoreError> {
        let thread_id = thread_id.to_string();
        let since = since.map(str::to_string);
        self.with_conn(move |conn| {
            agora_threads::count_user_messages_since(conn, &thread_id, since.as_deref())
        })
        .await
    }

    async fn recent_user_messages(
        &self,
        thread_id: &str,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError> {
        let thread_id = thread_id.to_string();
        self.with_conn(move |conn| agora_threads::recent_user_messages(conn, &thread_id, limit))
            .await
    }

    async fn create_facilitator_message(
        &self,
        message: NewFacilitatorMessage,
    ) -> Result<Message, StoreError> {
        let params = message_params(message);
        self.with_conn(move |conn| agora_threads::create_message(conn, &params))
            .await
    }

    async fn commit_summary(
        &self,
        message: NewFacilitatorMessage,
        expected_revision: u64,
        state: &ConversationState,
        last_summary_at: &str,
    ) -> Result<Option<Message>, StoreError> {
        let params = message_params(message);
        let state = state.clone();
        let last_summary_at = last_summary_at.to_string();
        self.with_conn(move |conn| {
            agora_threads::commit_summary(
                conn,
                &params,
                expected_revision,
                &state,
                &last_summary_at,
            )
        })
        .await
    }

    async fn commit_fact_check(
        &self,
        message: NewFacilitatorMessage,
        record: NewVerdictRecord,
    ) -> Result<Message, StoreError> {
        let claim = CreateClaimParams {
            thread_id: message.thread_id.clone(),
            verdict_message_id: None,
            source_message_id: record.source_message_id,
            claim_text: record.claim_text,
            verdict: record.verdict,
        };
        let params = message_params(message);
        self.with_conn(move |conn| {
            agora_threads::commit_fact_check(conn, &params, &claim).map(|(message, _)| message)
        })
        .await
    }
}

fn message_params(message: NewFacilitatorMessage) -> CreateMessageParams {
    CreateMessageParams {
        thread_id: message.thread_id,
        message_id: uuid::Uuid::new_v4().to_string(),
        author_id: FACILITATOR_AUTHOR_ID.to_string(),
        author_name: FACILITATOR_AUTHOR_NAME.to_string(),
        kind: message.kind,
        content: message.content,
        metadata: message.metadata,
    }
}

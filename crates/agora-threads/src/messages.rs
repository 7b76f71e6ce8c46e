//! Message rows: user posts and facilitator output.

use agora_types::{InterventionMetadata, MessageKind};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{conversion_error, ThreadError};

/// A message in a thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Internal database ID.
    pub id: i64,
    pub thread_id: String,
    /// Unique public ID of the message.
    pub message_id: String,
    pub author_id: String,
    /// Display name shown in transcripts.
    pub author_name: String,
    pub kind: MessageKind,
    pub content: String,
    /// Present on facilitator messages.
    pub metadata: Option<InterventionMetadata>,
    pub deleted: bool,
    /// Creation timestamp, millisecond precision.
    pub created_at: String,
}

/// Parameters for creating a new message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageParams {
    pub thread_id: String,
    pub message_id: String,
    pub author_id: String,
    pub author_name: String,
    pub kind: MessageKind,
    pub content: String,
    pub metadata: Option<InterventionMetadata>,
}

const MESSAGE_COLUMNS: &str = "id, thread_id, message_id, author_id, author_name, kind, content,
     intervention_metadata_json, deleted, created_at";

/// Creates a message in an existing thread.
pub fn create_message(
    conn: &Connection,
    params: &CreateMessageParams,
) -> Result<Message, ThreadError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM threads WHERE thread_id = ?1)",
        [&params.thread_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(ThreadError::NotFound(params.thread_id.clone()));
    }

    let metadata_json = params
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let message = conn.query_row(
        &format!(
            "INSERT INTO messages (
                thread_id, message_id, author_id, author_name, kind, content,
                intervention_metadata_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING {MESSAGE_COLUMNS}"
        ),
        params![
            params.thread_id,
            params.message_id,
            params.author_id,
            params.author_name,
            params.kind.as_str(),
            params.content,
            metadata_json,
        ],
        map_row_to_message,
    )?;
    Ok(message)
}

/// Retrieves a message by its ID, including soft-deleted ones.
pub fn get_message(conn: &Connection, message_id: &str) -> Result<Message, ThreadError> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?1"),
        [message_id],
        map_row_to_message,
    )
    .optional()?
    .ok_or_else(|| ThreadError::MessageNotFound(message_id.to_string()))
}

/// Lists non-deleted messages of every kind, newest first.
///
/// `before` filters on `created_at`; `limit` defaults to 50 and is capped
/// at 100.
pub fn list_messages(
    conn: &Connection,
    thread_id: &str,
    before: Option<&str>,
    limit: Option<u32>,
) -> Result<Vec<Message>, ThreadError> {
    let limit = limit.unwrap_or(50).min(100);

    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS}
         FROM messages
         WHERE thread_id = ?1 AND deleted = 0 AND (?2 IS NULL OR created_at < ?2)
         ORDER BY created_at DESC, id DESC
         LIMIT ?3"
    ))?;
    let rows = stmt.query_map(params![thread_id, before, limit], map_row_to_message)?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

/// Soft-deletes a message. Deleted messages stop counting toward summaries.
pub fn delete_message(
    conn: &Connection,
    thread_id: &str,
    message_id: &str,
) -> Result<(), ThreadError> {
    let count = conn.execute(
        "UPDATE messages SET deleted = 1
         WHERE thread_id = ?1 AND message_id = ?2 AND deleted = 0",
        [thread_id, message_id],
    )?;
    if count == 0 {
        return Err(ThreadError::MessageNotFound(message_id.to_string()));
    }
    Ok(())
}

/// Counts non-deleted user messages created strictly after `since`, or all
/// of them when `since` is `None`.
pub fn count_user_messages_since(
    conn: &Connection,
    thread_id: &str,
    since: Option<&str>,
) -> Result<u64, ThreadError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages
         WHERE thread_id = ?1 AND kind = 'user' AND deleted = 0
           AND (?2 IS NULL OR created_at > ?2)",
        params![thread_id, since],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

/// Returns up to `limit` of the most recent non-deleted user messages, in
/// chronological order.
pub fn recent_user_messages(
    conn: &Connection,
    thread_id: &str,
    limit: u32,
) -> Result<Vec<Message>, ThreadError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS}
         FROM messages
         WHERE thread_id = ?1 AND kind = 'user' AND deleted = 0
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![thread_id, limit], map_row_to_message)?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    messages.reverse();
    Ok(messages)
}

fn map_row_to_message(row: &Row) -> rusqlite::Result<Message> {
    let kind_str: String = row.get(5)?;
    let kind: MessageKind = kind_str.parse().map_err(|e| conversion_error(5, e))?;

    let metadata_json: Option<String> = row.get(7)?;
    let metadata = match metadata_json {
        Some(json) => Some(serde_json::from_str(&json).map_err(|e| conversion_error(7, e))?),
        None => None,
    };

    Ok(Message {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        message_id: row.get(2)?,
        author_id: row.get(3)?,
        author_name: row.get(4)?,
        kind,
        content: row.get(6)?,
        metadata,
        deleted: row.get(8)?,
        created_at: row.get(9)?,
    })
}

//! Thread rows: settings and the living conversation state.

use agora_types::{ConversationState, InterventionLevel, ThreadConfig};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{conversion_error, ThreadError};

/// Upper bound accepted for `summary_frequency`.
const MAX_SUMMARY_FREQUENCY: u32 = 1_000;

/// Parameters for creating a new thread. Unset settings take the defaults
/// from [`ThreadConfig::new`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateThreadParams {
    pub thread_id: String,
    pub title: String,
    #[serde(default)]
    pub intervention_level: Option<InterventionLevel>,
    #[serde(default)]
    pub auto_summary_enabled: Option<bool>,
    #[serde(default)]
    pub summary_frequency: Option<u32>,
    #[serde(default)]
    pub auto_fact_check_enabled: Option<bool>,
}

impl CreateThreadParams {
    pub fn new(thread_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a thread's facilitation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateThreadSettings {
    pub title: Option<String>,
    pub intervention_level: Option<InterventionLevel>,
    pub auto_summary_enabled: Option<bool>,
    pub summary_frequency: Option<u32>,
    pub auto_fact_check_enabled: Option<bool>,
}

fn validate_frequency(frequency: u32) -> Result<(), ThreadError> {
    if frequency == 0 || frequency > MAX_SUMMARY_FREQUENCY {
        return Err(ThreadError::InvalidSettings(format!(
            "summary_frequency must be between 1 and {MAX_SUMMARY_FREQUENCY}, got {frequency}"
        )));
    }
    Ok(())
}

const SELECT_THREAD: &str = "SELECT
        t.thread_id, t.title, t.intervention_level, t.auto_summary_enabled,
        t.summary_frequency, t.auto_fact_check_enabled, t.last_summary_at,
        t.conversation_state_json, t.state_revision,
        (SELECT COUNT(*) FROM messages m
         WHERE m.thread_id = t.thread_id AND m.kind = 'user' AND m.deleted = 0)
    FROM threads t";

/// Creates a thread and returns its stored settings.
pub fn create_thread(
    conn: &Connection,
    params: &CreateThreadParams,
) -> Result<ThreadConfig, ThreadError> {
    let mut config = ThreadConfig::new(params.thread_id.clone(), params.title.clone());
    if let Some(level) = params.intervention_level {
        config.intervention_level = level;
    }
    if let Some(enabled) = params.auto_summary_enabled {
        config.auto_summary_enabled = enabled;
    }
    if let Some(frequency) = params.summary_frequency {
        validate_frequency(frequency)?;
        config.summary_frequency = frequency;
    }
    if let Some(enabled) = params.auto_fact_check_enabled {
        config.auto_fact_check_enabled = enabled;
    }

    let state_json = serde_json::to_string(&config.state)?;
    conn.execute(
        "INSERT INTO threads (
            thread_id, title, intervention_level, auto_summary_enabled,
            summary_frequency, auto_fact_check_enabled, conversation_state_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            config.thread_id,
            config.title,
            config.intervention_level.as_str(),
            config.auto_summary_enabled,
            config.summary_frequency,
            config.auto_fact_check_enabled,
            state_json,
        ],
    )?;
    Ok(config)
}

/// Retrieves a thread by its public ID.
pub fn get_thread(conn: &Connection, thread_id: &str) -> Result<ThreadConfig, ThreadError> {
    conn.query_row(
        &format!("{SELECT_THREAD} WHERE t.thread_id = ?1"),
        [thread_id],
        map_row_to_thread,
    )
    .optional()?
    .ok_or_else(|| ThreadError::NotFound(thread_id.to_string()))
}

/// Lists all threads, newest first.
pub fn list_threads(conn: &Connection) -> Result<Vec<ThreadConfig>, ThreadError> {
    let mut stmt = conn.prepare(&format!("{SELECT_THREAD} ORDER BY t.created_at DESC, t.id DESC"))?;
    let rows = stmt.query_map([], map_row_to_thread)?;
    let mut threads = Vec::new();
    for row in rows {
        threads.push(row?);
    }
    Ok(threads)
}

/// Applies a partial settings update in one UPDATE statement and returns the
/// resulting thread.
pub fn update_thread_settings(
    conn: &Connection,
    thread_id: &str,
    updates: &UpdateThreadSettings,
) -> Result<ThreadConfig, ThreadError> {
    let mut set_parts: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(title) = &updates.title {
        values.push(Box::new(title.clone()));
        set_parts.push(format!("title = ?{}", values.len()));
    }
    if let Some(level) = updates.intervention_level {
        values.push(Box::new(level.as_str()));
        set_parts.push(format!("intervention_level = ?{}", values.len()));
    }
    if let Some(enabled) = updates.auto_summary_enabled {
        values.push(Box::new(enabled));
        set_parts.push(format!("auto_summary_enabled = ?{}", values.len()));
    }
    if let Some(frequency) = updates.summary_frequency {
        validate_frequency(frequency)?;
        values.push(Box::new(frequency));
        set_parts.push(format!("summary_frequency = ?{}", values.len()));
    }
    if let Some(enabled) = updates.auto_fact_check_enabled {
        values.push(Box::new(enabled));
        set_parts.push(format!("auto_fact_check_enabled = ?{}", values.len()));
    }

    if set_parts.is_empty() {
        return get_thread(conn, thread_id);
    }

    values.push(Box::new(thread_id.to_string()));
    let sql = format!(
        "UPDATE threads SET {} WHERE thread_id = ?{}",
        set_parts.join(", "),
        values.len()
    );
    let params: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let count = conn.execute(&sql, params.as_slice())?;
    if count == 0 {
        return Err(ThreadError::NotFound(thread_id.to_string()));
    }
    get_thread(conn, thread_id)
}

/// Writes a new conversation state if the stored revision still equals
/// `expected_revision`, and records `last_summary_at`.
///
/// Returns `Ok(false)` when another writer got there first; the caller
/// decides whether to re-read and retry.
pub fn update_conversation_state(
    conn: &Connection,
    thread_id: &str,
    expected_revision: u64,
    state: &ConversationState,
    last_summary_at: &str,
) -> Result<bool, ThreadError> {
    let state_json = serde_json::to_string(state)?;
    let count = conn.execute(
        "UPDATE threads
         SET conversation_state_json = ?1, state_revision = ?2, last_summary_at = ?3
         WHERE thread_id = ?4 AND state_revision = ?5",
        params![
            state_json,
            state.revision as i64,
            last_summary_at,
            thread_id,
            expected_revision as i64,
        ],
    )?;
    if count > 0 {
        return Ok(true);
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM threads WHERE thread_id = ?1)",
        [thread_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(ThreadError::NotFound(thread_id.to_string()));
    }
    tracing::debug!(thread_id, expected_revision, "conversation state revision conflict");
    Ok(false)
}

fn map_row_to_thread(row: &Row) -> rusqlite::Result<ThreadConfig> {
    let level_str: String = row.get(2)?;
    let intervention_level: InterventionLevel =
        level_str.parse().map_err(|e| conversion_error(2, e))?;

    let state_json: String = row.get(7)?;
    let mut state: ConversationState =
        serde_json::from_str(&state_json).map_err(|e| conversion_error(7, e))?;
    let revision: i64 = row.get(8)?;
    state.revision = revision.max(0) as u64;

    let message_count: i64 = row.get(9)?;

    Ok(ThreadConfig {
        thread_id: row.get(0)?,
        title: row.get(1)?,
        intervention_level,
        auto_summary_enabled: row.get(3)?,
        summary_frequency: row.get(4)?,
        auto_fact_check_enabled: row.get(5)?,
        last_summary_at: row.get(6)?,
        message_count: message_count.max(0) as u64,
        state,
    })
}

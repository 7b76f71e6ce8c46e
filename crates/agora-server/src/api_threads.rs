//! Thread and message handlers.

use crate::api::{require_text, with_conn, ApiError};
use crate::AppState;
use agora_threads::{
    create_message, create_thread, delete_message, get_thread, list_messages, list_threads,
    update_thread_settings, CreateMessageParams, CreateThreadParams, Message,
    UpdateThreadSettings,
};
use agora_types::{EventContext, MessageKind, ThreadConfig};
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;

const MAX_ID_LEN: usize = 128;
const MAX_TITLE_LEN: usize = 256;
const MAX_AUTHOR_LEN: usize = 128;
const MAX_CONTENT_LEN: usize = 10_000;

#[derive(Deserialize)]
pub struct HistoryParams {
    pub before: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    /// Client-chosen ID; generated when absent.
    #[serde(default)]
    pub message_id: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
}

/// POST /api/threads
pub async fn create_thread_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateThreadParams>,
) -> Result<(StatusCode, Json<ThreadConfig>), ApiError> {
    require_text("thread_id", &payload.thread_id, MAX_ID_LEN)?;
    require_text("title", &payload.title, MAX_TITLE_LEN)?;

    let thread = with_conn(&state.pool, move |conn| create_thread(conn, &payload)).await?;
    tracing::info!(
        thread_id = %thread.thread_id,
        level = thread.intervention_level.as_str(),
        "thread created"
    );
    Ok((StatusCode::CREATED, Json(thread)))
}

/// GET /api/threads
pub async fn list_threads_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<ThreadConfig>>, ApiError> {
    let threads = with_conn(&state.pool, list_threads).await?;
    Ok(Json(threads))
}

/// GET /api/threads/{threadId}
pub async fn get_thread_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<Json<ThreadConfig>, ApiError> {
    let thread = with_conn(&state.pool, move |conn| get_thread(conn, &thread_id)).await?;
    Ok(Json(thread))
}

/// PATCH /api/threads/{threadId}/settings
pub async fn update_settings_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(payload): Json<UpdateThreadSettings>,
) -> Result<Json<ThreadConfig>, ApiError> {
    if let Some(title) = &payload.title {
        require_text("title", title, MAX_TITLE_LEN)?;
    }
    let thread = with_conn(&state.pool, move |conn| {
        update_thread_settings(conn, &thread_id, &payload)
    })
    .await?;
    Ok(Json(thread))
}

/// POST /api/threads/{threadId}/messages
///
/// Stores the message, then hands it to the facilitator in the background.
/// Facilitation never delays or fails the post.
pub async fn post_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    require_text("author_id", &payload.author_id, MAX_AUTHOR_LEN)?;
    require_text("author_name", &payload.author_name, MAX_AUTHOR_LEN)?;
    require_text("content", &payload.content, MAX_CONTENT_LEN)?;
    if let Some(id) = &payload.message_id {
        require_text("message_id", id, MAX_ID_LEN)?;
    }

    let params = CreateMessageParams {
        thread_id,
        message_id: payload
            .message_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        author_id: payload.author_id,
        author_name: payload.author_name,
        kind: MessageKind::User,
        content: payload.content,
        metadata: None,
    };
    let message = with_conn(&state.pool, move |conn| create_message(conn, &params)).await?;

    state.facilitate_in_background(
        &message.thread_id,
        EventContext::NewMessage {
            message_id: Some(message.message_id.clone()),
            text: message.content.clone(),
            author: message.author_name.clone(),
        },
    );

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/threads/{threadId}/messages
pub async fn list_messages_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = with_conn(&state.pool, move |conn| {
        get_thread(conn, &thread_id)?;
        list_messages(conn, &thread_id, params.before.as_deref(), params.limit)
    })
    .await?;
    Ok(Json(messages))
}

/// DELETE /api/threads/{threadId}/messages/{messageId}
pub async fn delete_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((thread_id, message_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.pool, move |conn| {
        delete_message(conn, &thread_id, &message_id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

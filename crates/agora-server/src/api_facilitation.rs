//! Reaction, explicit-request, and claim handlers.

use crate::api::{require_text, with_conn, ApiError};
use crate::AppState;
use agora_facilitator::{ExplicitRequestContext, OutcomeReport};
use agora_threads::{get_message, get_thread, list_claims, ClaimRecord, ThreadError};
use agora_types::{ActionKind, EventContext};
use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_EMOJI_LEN: usize = 32;
const MAX_CLAIM_LEN: usize = 2_000;

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FacilitateRequest {
    /// Requested action; a summary when absent.
    #[serde(default)]
    pub kind: Option<ActionKind>,
    #[serde(default)]
    pub claim_text: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// POST /api/threads/{threadId}/messages/{messageId}/reactions
///
/// Reactions are not stored; they are only passed to the facilitator.
pub async fn react_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((thread_id, message_id)): Path<(String, String)>,
    Json(payload): Json<ReactionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_text("emoji", &payload.emoji, MAX_EMOJI_LEN)?;

    let lookup_thread = thread_id.clone();
    let lookup_message = message_id.clone();
    with_conn(&state.pool, move |conn| {
        let message = get_message(conn, &lookup_message)?;
        if message.deleted || message.thread_id != lookup_thread {
            return Err(ThreadError::MessageNotFound(lookup_message));
        }
        Ok(())
    })
    .await?;

    let event = EventContext::Reaction {
        emoji: payload.emoji,
        message_id,
    };
    let verify = event.is_verify_reaction();
    state.facilitate_in_background(&thread_id, event);

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "accepted": true, "verify": verify })),
    ))
}

/// POST /api/threads/{threadId}/facilitate
///
/// Runs an explicit facilitation request to completion and returns what
/// happened. An empty body asks for a summary.
pub async fn facilitate_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(thread_id): Path<String>,
    body: Bytes,
) -> Result<Json<OutcomeReport>, ApiError> {
    let payload: FacilitateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        FacilitateRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?
    };
    if let Some(claim) = &payload.claim_text {
        require_text("claim_text", claim, MAX_CLAIM_LEN)?;
    }

    let lookup = thread_id.clone();
    with_conn(&state.pool, move |conn| get_thread(conn, &lookup)).await?;

    let report = state
        .orchestrator
        .handle_explicit_request(
            &thread_id,
            payload.kind,
            ExplicitRequestContext {
                claim_text: payload.claim_text,
                message_id: payload.message_id,
            },
        )
        .await;
    Ok(Json(report))
}

/// GET /api/threads/{threadId}/claims
pub async fn list_claims_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<Json<Vec<ClaimRecord>>, ApiError> {
    let claims = with_conn(&state.pool, move |conn| {
        get_thread(conn, &thread_id)?;
        list_claims(conn, &thread_id)
    })
    .await?;
    Ok(Json(claims))
}

//! Shared API plumbing: error mapping and blocking database access.

use agora_db::DbPool;
use agora_threads::ThreadError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use rusqlite::Connection;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<ThreadError> for ApiError {
    fn from(err: ThreadError) -> Self {
        match err {
            ThreadError::NotFound(id) => ApiError::NotFound(format!("thread not found: {id}")),
            ThreadError::MessageNotFound(id) => {
                ApiError::NotFound(format!("message not found: {id}"))
            }
            ThreadError::InvalidSettings(msg) => ApiError::BadRequest(msg),
            ThreadError::Database(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ApiError::Conflict("resource already exists".to_string())
            }
            other => {
                tracing::error!(error = %other, "storage operation failed");
                ApiError::InternalServerError("storage operation failed".to_string())
            }
        }
    }
}

/// Runs `f` with a pooled connection on the blocking thread pool.
pub(crate) async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, ThreadError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;
        f(&conn).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
}

/// Rejects blank or oversized required text fields.
pub(crate) fn require_text(field: &str, value: &str, max_len: usize) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(ApiError::BadRequest(format!(
            "{field} exceeds {max_len} bytes"
        )));
    }
    Ok(())
}

//! SSE stream of facilitator notifications for one thread.

use crate::api::{with_conn, ApiError};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::{sse::Event, Sse},
};
use futures_util::Stream;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Handler for `GET /api/threads/{threadId}/events`.
///
/// Each notification is sent with its wire name (`summary:new`,
/// `factcheck:complete`, `observation:new`, `thread:state`) as the SSE event
/// name and its JSON payload as data.
pub async fn thread_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let lookup = thread_id.clone();
    with_conn(&state.pool, move |conn| agora_threads::get_thread(conn, &lookup)).await?;

    let stream = BroadcastStream::new(state.notifier.subscribe());
    let mapped_stream = stream.filter_map(move |result| match result {
        Ok(notification) if notification.thread_id == thread_id => {
            match serde_json::to_string(&notification.payload) {
                Ok(data) => Some(Ok(Event::default()
                    .event(notification.event.as_str())
                    .data(data))),
                Err(e) => {
                    tracing::error!("failed to serialize thread notification: {}", e);
                    None
                }
            }
        }
        Ok(_) => None,
        Err(broadcast_error) => {
            tracing::warn!(
                thread_id = %thread_id,
                error = %broadcast_error,
                "thread SSE stream lagged; notifications were dropped for this subscriber"
            );
            None
        }
    });

    Ok(Sse::new(mapped_stream).keep_alive(axum::response::sse::KeepAlive::default()))
}

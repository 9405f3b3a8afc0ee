use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::Router;
use axum::routing::get;
use tokio_stream::StreamExt;
use tokio_stream::{Stream, wrappers};

use crate::services::EventBus;

#[derive(Clone)]
pub struct SSEState {
    pub events: Arc<EventBus>,
}

pub fn sse_router(sse_state: SSEState) -> Router {
    Router::new()
        .route("/api/events", get(sse_handler))
        .with_state(sse_state)
}

#[utoipa::path(
    get,
    path = "/api/events",
    tag = "event",
    responses(
        (status = 200, description = "Server-sent stream of sync events")
    )
)]
pub async fn sse_handler(
    State(state): State<SSEState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.events.subscribe();

    // Lagged receivers skip the dropped events and keep streaming
    let stream = wrappers::BroadcastStream::new(receiver).filter_map(|result| {
        let event = result.ok()?;
        let data = serde_json::to_string(&event).ok()?;

        Some(Ok(Event::default().data(data)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

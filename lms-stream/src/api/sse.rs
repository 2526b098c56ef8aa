//! Server-Sent Events for ingestion and progress notifications

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events - SSE event stream
///
/// Streams `ModuleContentIngested`, `StreamAdvanced` and `ModuleCompleted`
/// events plus a periodic heartbeat.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    lms_common::sse::create_event_sse_stream("lms-stream", &state.event_bus)
}

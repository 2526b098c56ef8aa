//! Server-Sent Events (SSE) utilities

use crate::events::{EventBus, LmsEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Convert one event into an SSE frame named after its variant
pub fn to_sse_event(event: &LmsEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event.event_type(), e);
            None
        }
    }
}

/// Stream every bus event to one SSE client
///
/// Sends a `ConnectionStatus: connected` frame first, then forwards events
/// with a 15-second heartbeat. A lagging client skips the events it missed
/// instead of being disconnected.
pub fn create_event_sse_stream(
    service_name: &'static str,
    event_bus: &EventBus,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} events", service_name);

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => match received {
                    Ok(event) => {
                        if let Some(frame) = to_sse_event(&event) {
                            yield Ok(frame);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("SSE: {} client lagged, skipped {} events", service_name, skipped);
                    }
                    Err(RecvError::Closed) => {
                        info!("SSE: {} event bus closed", service_name);
                        break;
                    }
                },
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

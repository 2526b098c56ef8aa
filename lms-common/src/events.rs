//! Event types and broadcast bus for the learning-platform services
//!
//! Events are broadcast via [`EventBus`] and serialized for SSE delivery.
//! They carry identifiers and counters only; chunk text never travels over
//! the event channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Learning-platform event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LmsEvent {
    /// A module's chunk set was (re)written
    ModuleContentIngested {
        module_id: Uuid,
        chunk_count: usize,
        /// True when the fallback sentence stood in for non-extractable content
        fallback: bool,
        timestamp: DateTime<Utc>,
    },

    /// A student's cursor moved forward without finishing the module
    StreamAdvanced {
        student_id: Uuid,
        module_id: Uuid,
        next_index: i64,
        timestamp: DateTime<Utc>,
    },

    /// A student's cursor reached the end of the module
    ModuleCompleted {
        student_id: Uuid,
        module_id: Uuid,
        course_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
    },
}

impl LmsEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            LmsEvent::ModuleContentIngested { .. } => "ModuleContentIngested",
            LmsEvent::StreamAdvanced { .. } => "StreamAdvanced",
            LmsEvent::ModuleCompleted { .. } => "ModuleCompleted",
        }
    }
}

/// Broadcast channel shared by every handler of a service
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LmsEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per slow subscriber
    ///
    /// ```
    /// use lms_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<LmsEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LmsEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

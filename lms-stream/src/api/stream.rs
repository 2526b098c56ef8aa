//! Text-stream reading endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use lms_common::events::LmsEvent;
use uuid::Uuid;

use crate::api::StudentId;
use crate::error::ApiResult;
use crate::stream::{AdvanceOutcome, StreamView};
use crate::AppState;

/// GET /api/modules/:module_id/stream
///
/// Starts the module on first access. Completed modules return every chunk.
pub async fn get_module_stream(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path(module_id): Path<Uuid>,
) -> ApiResult<Json<StreamView>> {
    let view = state.cursors.fetch_view(student_id, module_id).await?;
    Ok(Json(view))
}

/// POST /api/modules/:module_id/stream/advance
///
/// `ModuleCompleted` is emitted once, by the advance that completes the module.
pub async fn advance_module_stream(
    State(state): State<AppState>,
    StudentId(student_id): StudentId,
    Path(module_id): Path<Uuid>,
) -> ApiResult<Json<AdvanceOutcome>> {
    let outcome = state.cursors.advance(student_id, module_id).await?;

    let event = match outcome.next_index {
        Some(next_index) if !outcome.completed => Some(LmsEvent::StreamAdvanced {
            student_id,
            module_id,
            next_index,
            timestamp: lms_common::time::now(),
        }),
        _ if outcome.newly_completed => Some(LmsEvent::ModuleCompleted {
            student_id,
            module_id,
            course_id: Some(outcome.course_id),
            timestamp: lms_common::time::now(),
        }),
        _ => None,
    };
    if let Some(event) = event {
        state.event_bus.emit_lossy(event);
    }

    Ok(Json(outcome))
}

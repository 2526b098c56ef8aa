//! Module creation and content replacement

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use lms_common::db::ModuleType;
use lms_common::events::LmsEvent;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::stream::{ContentInput, IngestOutcome, NewModule};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateModuleRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub module_type: String,
    pub content_url: Option<String>,
    pub text: Option<String>,
    pub order_index: Option<i64>,
    pub duration: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateModuleResponse {
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    pub content_url: Option<String>,
    pub module_order: i64,
    pub duration_mins: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceContentRequest {
    pub content_url: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplaceContentResponse {
    pub module_id: Uuid,
    pub chunk_count: usize,
    pub fallback: bool,
}

fn emit_ingested(state: &AppState, outcome: &IngestOutcome) {
    state.event_bus.emit_lossy(LmsEvent::ModuleContentIngested {
        module_id: outcome.module_id,
        chunk_count: outcome.chunk_count,
        fallback: outcome.fallback,
        timestamp: lms_common::time::now(),
    });
}

/// POST /api/courses/:course_id/modules
///
/// Text-stream modules are written together with their chunks; a module
/// whose content yields no text is not created.
pub async fn create_module(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(request): Json<CreateModuleRequest>,
) -> ApiResult<(StatusCode, Json<CreateModuleResponse>)> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Module title is required".to_string()));
    }
    if matches!(request.order_index, Some(order) if order < 1) {
        return Err(ApiError::BadRequest("order_index must be at least 1".to_string()));
    }
    if matches!(request.duration, Some(duration) if duration < 0) {
        return Err(ApiError::BadRequest("duration must not be negative".to_string()));
    }

    let new = NewModule {
        title: title.to_string(),
        module_type: ModuleType::from_str_lossy(&request.module_type),
        content_url: request.content_url,
        text: request.text,
        order_index: request.order_index,
        duration: request.duration,
        notes: request.notes,
    };

    let created = state.ingestor.create_module(course_id, new).await?;
    if let Some(outcome) = &created.ingest {
        emit_ingested(&state, outcome);
    }

    info!(
        "Created {} module {} in course {}",
        created.module.module_type, created.module.module_id, course_id
    );

    let module = created.module;
    Ok((
        StatusCode::CREATED,
        Json(CreateModuleResponse {
            module_id: module.module_id,
            course_id: module.course_id,
            title: module.title,
            module_type: module.module_type,
            content_url: module.content_url,
            module_order: module.module_order,
            duration_mins: module.duration_mins,
            chunk_count: created.ingest.map(|outcome| outcome.chunk_count),
        }),
    ))
}

/// PUT /api/modules/:module_id/content
///
/// Replaces the whole chunk set. Existing cursors are kept.
pub async fn replace_module_content(
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
    Json(request): Json<ReplaceContentRequest>,
) -> ApiResult<Json<ReplaceContentResponse>> {
    let input = ContentInput::from_parts(request.text.as_deref(), request.content_url.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Either text or content_url is required".to_string()))?;

    let outcome = state.ingestor.ingest(module_id, &input).await?;
    emit_ingested(&state, &outcome);

    Ok(Json(ReplaceContentResponse {
        module_id,
        chunk_count: outcome.chunk_count,
        fallback: outcome.fallback,
    }))
}

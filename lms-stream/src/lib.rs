//! lms-stream library - text-stream delivery service
//!
//! Splits text-stream module content into word chunks and tracks each
//! student's reading cursor through them.

use axum::Router;
use lms_common::events::EventBus;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod stream;

use stream::{ContentResolver, Ingestor, PresentationHosts, ProgressCursorManager};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub event_bus: EventBus,
    pub cursors: ProgressCursorManager,
    pub ingestor: Ingestor,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        uploads_dir: PathBuf,
        legacy_root: PathBuf,
        hosts: PresentationHosts,
    ) -> Self {
        let resolver = ContentResolver::new(uploads_dir, legacy_root);
        Self {
            cursors: ProgressCursorManager::new(db.clone()),
            ingestor: Ingestor::new(db, resolver, hosts),
            event_bus,
        }
    }
}

/// Build application router
///
/// `/health` needs no caller identity; stream routes read it from `X-User-Id`.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let api = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/events", get(api::event_stream))
        .route("/api/modules/:module_id/stream", get(api::get_module_stream))
        .route("/api/modules/:module_id/stream/advance", post(api::advance_module_stream))
        .route("/api/modules/:module_id/content", put(api::replace_module_content))
        .route("/api/courses/:course_id/modules", post(api::create_module));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    /// Fresh in-memory database with the full schema
    ///
    /// Pinned to one connection that never expires: every `sqlite::memory:`
    /// connection is a separate database.
    pub async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        lms_common::db::create_tables(&pool).await.unwrap();
        lms_common::db::run_migrations(&pool).await.unwrap();
        pool
    }

    pub async fn insert_course(pool: &SqlitePool) -> Uuid {
        let course_id = Uuid::new_v4();
        sqlx::query("INSERT INTO courses (course_id, title, status) VALUES (?, 'Test course', 'approved')")
            .bind(course_id.to_string())
            .execute(pool)
            .await
            .unwrap();
        course_id
    }

    /// Append a module of `kind` to the end of a course
    pub async fn insert_module(pool: &SqlitePool, course_id: Uuid, kind: &str) -> Uuid {
        let module_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO modules (module_id, course_id, title, type, module_order)
            VALUES (?, ?, 'Test module', ?,
                    (SELECT COALESCE(MAX(module_order), 0) + 1 FROM modules WHERE course_id = ?))
            "#,
        )
        .bind(module_id.to_string())
        .bind(course_id.to_string())
        .bind(kind)
        .bind(course_id.to_string())
        .execute(pool)
        .await
        .unwrap();
        module_id
    }
}

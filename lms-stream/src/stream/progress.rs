//! Per-student progress cursors
//!
//! One `module_progress` row per (student, module) records how far the
//! student has read:
//!
//! ```text
//! NotStarted --fetch--> InProgress { index < total } --advance x N--> Completed
//! ```
//!
//! Rows are created lazily by the first fetch and mutated by advance.
//! Re-ingestion realigns them to the new chunk count inside the ingest
//! transaction, so `completed_at` is set exactly when the index equals the
//! total. There is no in-process locking: insert-if-absent on the
//! `(module_id, student_id)` unique key collapses concurrent first fetches,
//! and advance's conditional UPDATE uses `MAX(...)` to keep the index from
//! moving backwards or skipping when two advances race.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::chunk_store::{Chunk, ChunkStore};
use super::registry::ModuleRegistry;
use super::{uuid_column, StreamError, StreamResult};

/// Stored cursor row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressCursor {
    pub progress_id: Uuid,
    pub student_id: Uuid,
    pub module_id: Uuid,
    pub course_id: Uuid,
    pub current_chunk_index: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    NotStarted,
    InProgress { index: i64, total: i64 },
    Completed,
}

impl CursorState {
    /// State of an optional cursor against the module's current chunk count
    pub fn of(cursor: Option<&ProgressCursor>, total: i64) -> Self {
        match cursor {
            None => CursorState::NotStarted,
            Some(c) if c.completed_at.is_some() || c.current_chunk_index >= total => {
                CursorState::Completed
            }
            Some(c) => CursorState::InProgress {
                index: c.current_chunk_index,
                total,
            },
        }
    }
}

/// What a student sees when opening a text-stream module
///
/// In review mode only `completed` and `chunks` are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamView {
    pub completed: bool,
    pub chunks: Vec<Chunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_chunk: Option<Chunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

impl StreamView {
    fn review(chunks: Vec<Chunk>) -> Self {
        Self {
            completed: true,
            chunks,
            current_chunk: None,
            index: None,
            total: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOutcome {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_index: Option<i64>,
    /// Owning course, for completion notifications
    #[serde(skip)]
    pub course_id: Uuid,
    /// This advance is the one that set `completed_at`
    #[serde(skip)]
    pub newly_completed: bool,
}

type CursorRow = (String, String, i64, Option<DateTime<Utc>>, DateTime<Utc>);

#[derive(Clone)]
pub struct ProgressCursorManager {
    db: SqlitePool,
    chunks: ChunkStore,
    registry: ModuleRegistry,
}

impl ProgressCursorManager {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            chunks: ChunkStore::new(db.clone()),
            registry: ModuleRegistry::new(db.clone()),
            db,
        }
    }

    pub async fn find_cursor(
        &self,
        student_id: Uuid,
        module_id: Uuid,
    ) -> StreamResult<Option<ProgressCursor>> {
        let row: Option<CursorRow> = sqlx::query_as(
            r#"
            SELECT progress_id, course_id, current_chunk_index, completed_at, last_accessed_at
            FROM module_progress
            WHERE module_id = ? AND student_id = ?
            "#,
        )
        .bind(module_id.to_string())
        .bind(student_id.to_string())
        .fetch_optional(&self.db)
        .await?;

        let Some((progress_id, course_id, current_chunk_index, completed_at, last_accessed_at)) = row
        else {
            return Ok(None);
        };

        Ok(Some(ProgressCursor {
            progress_id: uuid_column(&progress_id)?,
            student_id,
            module_id,
            course_id: uuid_column(&course_id)?,
            current_chunk_index,
            completed_at,
            last_accessed_at,
        }))
    }

    /// Create the cursor at index 0 unless one already exists
    async fn start(&self, student_id: Uuid, module_id: Uuid) -> StreamResult<ProgressCursor> {
        let course_id = self.registry.course_for_module(module_id).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO module_progress
                (progress_id, module_id, student_id, course_id, current_chunk_index, last_accessed_at)
            VALUES (?, ?, ?, ?, 0, ?)
            ON CONFLICT (module_id, student_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(module_id.to_string())
        .bind(student_id.to_string())
        .bind(course_id.to_string())
        .bind(Utc::now())
        .execute(&self.db)
        .await?
        .rows_affected();

        if inserted > 0 {
            info!("Student {} started module {}", student_id, module_id);
        } else {
            debug!("Cursor for student {} on module {} created concurrently", student_id, module_id);
        }

        // Re-read: a concurrent start may have won and already advanced
        self.find_cursor(student_id, module_id)
            .await?
            .ok_or(StreamError::ProgressRecordNotFound)
    }

    /// The student's current view of a module, starting it on first access
    pub async fn fetch_view(&self, student_id: Uuid, module_id: Uuid) -> StreamResult<StreamView> {
        let mut chunks = self.chunks.list_chunks(module_id).await?;
        if chunks.is_empty() {
            return Err(StreamError::NoContent);
        }

        let cursor = match self.find_cursor(student_id, module_id).await? {
            Some(cursor) => cursor,
            None => self.start(student_id, module_id).await?,
        };

        let total = chunks.len() as i64;
        match CursorState::of(Some(&cursor), total) {
            CursorState::InProgress { index, total } => {
                chunks.truncate(index as usize + 1);
                let current_chunk = chunks.last().cloned();
                Ok(StreamView {
                    completed: false,
                    chunks,
                    current_chunk,
                    index: Some(index),
                    total: Some(total),
                })
            }
            _ => Ok(StreamView::review(chunks)),
        }
    }

    /// Move the student's cursor forward by one chunk
    pub async fn advance(&self, student_id: Uuid, module_id: Uuid) -> StreamResult<AdvanceOutcome> {
        let cursor = self
            .find_cursor(student_id, module_id)
            .await?
            .ok_or(StreamError::NoProgress)?;

        let total = self.chunks.count_chunks(module_id).await?;
        let next_index = cursor.current_chunk_index + 1;
        let now = Utc::now();
        let completed = next_index >= total;

        let mut tx = self.db.begin().await?;

        // Only the advance that flips `completed_at` reports a fresh completion
        let newly_completed = if completed {
            sqlx::query(
                r#"
                UPDATE module_progress
                SET completed_at = ?
                WHERE module_id = ? AND student_id = ? AND completed_at IS NULL
                "#,
            )
            .bind(now)
            .bind(module_id.to_string())
            .bind(student_id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected()
                > 0
        } else {
            false
        };

        let result = if completed {
            sqlx::query(
                r#"
                UPDATE module_progress
                SET current_chunk_index = ?,
                    last_accessed_at = ?
                WHERE module_id = ? AND student_id = ?
                "#,
            )
            .bind(total)
            .bind(now)
            .bind(module_id.to_string())
            .bind(student_id.to_string())
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE module_progress
                SET current_chunk_index = MAX(current_chunk_index, ?),
                    last_accessed_at = ?
                WHERE module_id = ? AND student_id = ?
                "#,
            )
            .bind(next_index)
            .bind(now)
            .bind(module_id.to_string())
            .bind(student_id.to_string())
            .execute(&mut *tx)
            .await?
        };

        if result.rows_affected() == 0 {
            warn!(
                "Progress for student {} on module {} disappeared before advance",
                student_id, module_id
            );
            return Err(StreamError::ProgressRecordNotFound);
        }
        tx.commit().await?;

        if completed {
            if newly_completed {
                info!("Student {} completed module {}", student_id, module_id);
            }
            Ok(AdvanceOutcome {
                completed: true,
                next_index: None,
                course_id: cursor.course_id,
                newly_completed,
            })
        } else {
            debug!("Student {} advanced module {} to {}", student_id, module_id, next_index);
            Ok(AdvanceOutcome {
                completed: false,
                next_index: Some(next_index),
                course_id: cursor.course_id,
                newly_completed: false,
            })
        }
    }

    /// Realign a module's cursors with a new chunk count on a caller-owned connection
    ///
    /// Cursors that were complete, or that now point at or past the end, are
    /// set complete at `total`. In-progress cursors inside the new range keep
    /// their index.
    pub async fn realign_in(
        conn: &mut SqliteConnection,
        module_id: Uuid,
        total: i64,
    ) -> StreamResult<u64> {
        let realigned = sqlx::query(
            r#"
            UPDATE module_progress
            SET current_chunk_index = ?,
                completed_at = COALESCE(completed_at, ?)
            WHERE module_id = ?
              AND (completed_at IS NOT NULL OR current_chunk_index >= ?)
            "#,
        )
        .bind(total)
        .bind(Utc::now())
        .bind(module_id.to_string())
        .bind(total)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if realigned > 0 {
            debug!("Realigned {} cursors on module {} to {} chunks", realigned, module_id, total);
        }
        Ok(realigned)
    }
}

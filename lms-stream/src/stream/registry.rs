//! Module/course registry
//!
//! Read access to module records, plus the two writes the text-stream
//! service performs on them (inserting a module, updating its content
//! reference). Writes run on a caller-owned transaction.

use lms_common::db::{ModuleRecord, ModuleType};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{uuid_column, StreamError, StreamResult};

#[derive(Clone)]
pub struct ModuleRegistry {
    db: SqlitePool,
}

impl ModuleRegistry {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Owning course of a module
    pub async fn course_for_module(&self, module_id: Uuid) -> StreamResult<Uuid> {
        let course_id: Option<String> =
            sqlx::query_scalar("SELECT course_id FROM modules WHERE module_id = ?")
                .bind(module_id.to_string())
                .fetch_optional(&self.db)
                .await?;

        match course_id {
            Some(id) => uuid_column(&id),
            None => Err(StreamError::ModuleNotFound(module_id)),
        }
    }

    pub async fn get_module(&self, module_id: Uuid) -> StreamResult<ModuleRecord> {
        let row: Option<(String, String, String, Option<String>, i64, i64, Option<String>)> =
            sqlx::query_as(
                r#"
                SELECT course_id, title, type, content_url, module_order, duration_mins, notes
                FROM modules
                WHERE module_id = ?
                "#,
            )
            .bind(module_id.to_string())
            .fetch_optional(&self.db)
            .await?;

        let Some((course_id, title, kind, content_url, module_order, duration_mins, notes)) = row
        else {
            return Err(StreamError::ModuleNotFound(module_id));
        };

        Ok(ModuleRecord {
            module_id,
            course_id: uuid_column(&course_id)?,
            title,
            module_type: ModuleType::from_str_lossy(&kind),
            content_url,
            module_order,
            duration_mins,
            notes,
        })
    }

    pub async fn course_exists(&self, course_id: Uuid) -> StreamResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE course_id = ?)")
                .bind(course_id.to_string())
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    /// Position for a module appended to the end of a course
    pub async fn next_module_order(&self, course_id: Uuid) -> StreamResult<i64> {
        let max_order: Option<i64> =
            sqlx::query_scalar("SELECT MAX(module_order) FROM modules WHERE course_id = ?")
                .bind(course_id.to_string())
                .fetch_one(&self.db)
                .await?;
        Ok(max_order.unwrap_or(0) + 1)
    }

    /// Insert a module row on a caller-owned connection
    pub async fn insert_module_in(
        conn: &mut SqliteConnection,
        module: &ModuleRecord,
    ) -> StreamResult<()> {
        sqlx::query(
            r#"
            INSERT INTO modules (module_id, course_id, title, type, content_url, module_order, duration_mins, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(module.module_id.to_string())
        .bind(module.course_id.to_string())
        .bind(&module.title)
        .bind(module.module_type.as_str())
        .bind(&module.content_url)
        .bind(module.module_order)
        .bind(module.duration_mins)
        .bind(&module.notes)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn set_content_url_in(
        conn: &mut SqliteConnection,
        module_id: Uuid,
        content_url: &str,
    ) -> StreamResult<()> {
        let updated = sqlx::query("UPDATE modules SET content_url = ? WHERE module_id = ?")
            .bind(content_url)
            .bind(module_id.to_string())
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(StreamError::ModuleNotFound(module_id));
        }
        Ok(())
    }
}

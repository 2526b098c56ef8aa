//! Database initialization
//!
//! Opens (creating if needed) the shared SQLite database, applies connection
//! pragmas, creates every table idempotently and then runs versioned
//! migrations.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection, in milliseconds
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas here apply to every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_tables(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent)
///
/// Exposed separately so tests can build the schema on an in-memory pool.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_courses_table(pool).await?;
    create_modules_table(pool).await?;
    create_module_text_chunks_table(pool).await?;
    create_module_progress_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_courses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            course_id TEXT PRIMARY KEY,
            instructor_id TEXT,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_modules_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS modules (
            module_id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            type TEXT NOT NULL,
            content_url TEXT,
            module_order INTEGER NOT NULL,
            duration_mins INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_modules_course ON modules (course_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Ordered text chunks of text-stream modules
///
/// The unique `(module_id, chunk_order)` index is created by migration v2.
async fn create_module_text_chunks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS module_text_chunks (
            chunk_id TEXT PRIMARY KEY,
            module_id TEXT NOT NULL REFERENCES modules(module_id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            chunk_order INTEGER NOT NULL CHECK (chunk_order >= 0),
            duration_seconds INTEGER NOT NULL DEFAULT 60,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Per-(student, module) progress cursor
async fn create_module_progress_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS module_progress (
            progress_id TEXT PRIMARY KEY,
            module_id TEXT NOT NULL REFERENCES modules(module_id) ON DELETE CASCADE,
            student_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            current_chunk_index INTEGER NOT NULL DEFAULT 0 CHECK (current_chunk_index >= 0),
            completed_at TIMESTAMP,
            last_accessed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (module_id, student_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

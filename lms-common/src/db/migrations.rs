//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//! Databases created by the current `init_database` already have the final
//! schema; migrations bring older databases forward without data loss.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - users may upgrade from any older version
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Check before altering** - every migration must be safe to run twice
//! 4. **Use ALTER TABLE / CREATE ... IF NOT EXISTS** - never DROP user data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    if !table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version: Option<i32> = sqlx::query_scalar(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1"
    )
    .fetch_optional(pool)
    .await?;

    Ok(version.unwrap_or(0))
}

/// Set schema version in database
async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name=?
        )
        "#
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: Add current_chunk_index to module_progress
///
/// Progress rows written before text-stream modules existed only recorded
/// completion. Existing rows start at index 0.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Add current_chunk_index to module_progress");

    if !table_exists(pool, "module_progress").await? {
        info!("  module_progress table doesn't exist yet - skipping migration");
        return Ok(());
    }

    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('module_progress') WHERE name = 'current_chunk_index'"
    )
    .fetch_one(pool)
    .await?;

    if has_column > 0 {
        info!("  current_chunk_index column already exists - skipping");
        return Ok(());
    }

    // Concurrent initialization may race us to the same ALTER
    match sqlx::query(
        "ALTER TABLE module_progress ADD COLUMN current_chunk_index INTEGER NOT NULL DEFAULT 0"
    )
    .execute(pool)
    .await
    {
        Ok(_) => {
            info!("  ✓ Added current_chunk_index column to module_progress");
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
            info!("  current_chunk_index column added by concurrent initializer - skipping");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Migration v2: Unique chunk ordinal per module
///
/// Chunk ordinals must be unique within a module; older databases only had
/// a plain lookup index.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: Unique (module_id, chunk_order) on module_text_chunks");

    if !table_exists(pool, "module_text_chunks").await? {
        info!("  module_text_chunks table doesn't exist yet - skipping migration");
        return Ok(());
    }

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_module_text_chunks_order \
         ON module_text_chunks (module_id, chunk_order)"
    )
    .execute(pool)
    .await?;

    info!("  ✓ Unique chunk ordinal index present");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    // One connection: every `sqlite::memory:` connection is its own database
    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn create_schema_version_table(pool: &SqlitePool) {
        sqlx::query(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)"
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn create_legacy_progress_table(pool: &SqlitePool) {
        sqlx::query(
            r#"
            CREATE TABLE module_progress (
                progress_id TEXT PRIMARY KEY,
                module_id TEXT NOT NULL,
                student_id TEXT NOT NULL,
                course_id TEXT NOT NULL,
                UNIQUE (module_id, student_id)
            )
            "#
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn column_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('module_progress') WHERE name = 'current_chunk_index'"
        )
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_schema_version_no_table() {
        let pool = setup_test_db().await;
        let version = get_schema_version(&pool).await.unwrap();
        assert_eq!(version, 0);
    }

    #[tokio::test]
    async fn test_set_and_get_schema_version() {
        let pool = setup_test_db().await;
        create_schema_version_table(&pool).await;

        assert_eq!(get_schema_version(&pool).await.unwrap(), 0);

        set_schema_version(&pool, 1).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_migrate_v1_no_table() {
        let pool = setup_test_db().await;
        migrate_v1(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_migrate_v1_adds_column_with_zero_default() {
        let pool = setup_test_db().await;
        create_legacy_progress_table(&pool).await;

        sqlx::query(
            "INSERT INTO module_progress (progress_id, module_id, student_id, course_id) VALUES ('p', 'm', 's', 'c')"
        )
        .execute(&pool)
        .await
        .unwrap();

        migrate_v1(&pool).await.unwrap();
        assert_eq!(column_count(&pool).await, 1);

        let index: i64 = sqlx::query_scalar(
            "SELECT current_chunk_index FROM module_progress WHERE progress_id = 'p'"
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(index, 0);
    }

    #[tokio::test]
    async fn test_migrate_v1_idempotent() {
        let pool = setup_test_db().await;
        create_legacy_progress_table(&pool).await;

        migrate_v1(&pool).await.unwrap();
        migrate_v1(&pool).await.unwrap();

        assert_eq!(column_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_migrate_v2_rejects_duplicate_ordinals_afterwards() {
        let pool = setup_test_db().await;
        sqlx::query(
            "CREATE TABLE module_text_chunks (chunk_id TEXT PRIMARY KEY, module_id TEXT NOT NULL, content TEXT NOT NULL, chunk_order INTEGER NOT NULL)"
        )
        .execute(&pool)
        .await
        .unwrap();

        migrate_v2(&pool).await.unwrap();

        sqlx::query("INSERT INTO module_text_chunks VALUES ('a', 'm', 'x ', 0)")
            .execute(&pool)
            .await
            .unwrap();
        let duplicate = sqlx::query("INSERT INTO module_text_chunks VALUES ('b', 'm', 'y ', 0)")
            .execute(&pool)
            .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_run_migrations_complete_flow() {
        let pool = setup_test_db().await;
        create_schema_version_table(&pool).await;
        create_legacy_progress_table(&pool).await;

        run_migrations(&pool).await.unwrap();

        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
        assert_eq!(column_count(&pool).await, 1);

        // Second run is a no-op
        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }
}

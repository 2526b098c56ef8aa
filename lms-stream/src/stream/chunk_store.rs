//! Chunk persistence
//!
//! A module's chunks are written as one batch inside a transaction and are
//! never updated piecemeal: re-ingestion deletes the old set and inserts the
//! new one in the same transaction.

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::chunker::ChunkDraft;
use super::{uuid_column, StreamResult};

/// Rows per multi-row INSERT (5 bound values each, well under SQLite's limit)
const INSERT_BATCH_ROWS: usize = 150;

/// One stored chunk, as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub chunk_id: Uuid,
    pub content: String,
    pub chunk_order: i64,
    pub duration_seconds: i64,
}

#[derive(Clone)]
pub struct ChunkStore {
    db: SqlitePool,
}

impl ChunkStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Replace a module's chunk set atomically
    pub async fn replace_chunks(&self, module_id: Uuid, drafts: &[ChunkDraft]) -> StreamResult<usize> {
        let mut tx = self.db.begin().await?;
        let written = Self::replace_chunks_in(&mut tx, module_id, drafts).await?;
        tx.commit().await?;
        Ok(written)
    }

    /// Replace a module's chunk set on a caller-owned connection
    ///
    /// The caller is responsible for running this inside a transaction.
    pub async fn replace_chunks_in(
        conn: &mut SqliteConnection,
        module_id: Uuid,
        drafts: &[ChunkDraft],
    ) -> StreamResult<usize> {
        let removed = sqlx::query("DELETE FROM module_text_chunks WHERE module_id = ?")
            .bind(module_id.to_string())
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if removed > 0 {
            debug!("Cleared {} existing chunks for module {}", removed, module_id);
        }

        for batch in drafts.chunks(INSERT_BATCH_ROWS) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO module_text_chunks (chunk_id, module_id, content, chunk_order, duration_seconds) ",
            );
            builder.push_values(batch, |mut row, draft| {
                row.push_bind(Uuid::new_v4().to_string())
                    .push_bind(module_id.to_string())
                    .push_bind(draft.content.clone())
                    .push_bind(draft.order)
                    .push_bind(draft.duration_seconds);
            });
            builder.build().execute(&mut *conn).await?;
        }

        Ok(drafts.len())
    }

    /// All chunks of a module in ordinal order
    pub async fn list_chunks(&self, module_id: Uuid) -> StreamResult<Vec<Chunk>> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT chunk_id, content, chunk_order, duration_seconds
            FROM module_text_chunks
            WHERE module_id = ?
            ORDER BY chunk_order ASC
            "#,
        )
        .bind(module_id.to_string())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|(chunk_id, content, chunk_order, duration_seconds)| {
                Ok(Chunk {
                    chunk_id: uuid_column(&chunk_id)?,
                    content,
                    chunk_order,
                    duration_seconds,
                })
            })
            .collect()
    }

    /// Number of chunks a module currently has
    pub async fn count_chunks(&self, module_id: Uuid) -> StreamResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM module_text_chunks WHERE module_id = ?")
            .bind(module_id.to_string())
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::split_into_chunks;
    use crate::test_support::{insert_course, insert_module, memory_pool};

    #[tokio::test]
    async fn test_replace_and_list_in_order() {
        let pool = memory_pool().await;
        let course_id = insert_course(&pool).await;
        let module_id = insert_module(&pool, course_id, "text_stream").await;
        let store = ChunkStore::new(pool);

        let written = store
            .replace_chunks(module_id, &split_into_chunks("one two three"))
            .await
            .unwrap();
        assert_eq!(written, 3);

        let chunks = store.list_chunks(module_id).await.unwrap();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["one ", "two ", "three "]);
        assert_eq!(chunks[2].chunk_order, 2);
        assert_eq!(store.count_chunks(module_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_replace_overwrites_previous_set() {
        let pool = memory_pool().await;
        let course_id = insert_course(&pool).await;
        let module_id = insert_module(&pool, course_id, "text_stream").await;
        let store = ChunkStore::new(pool);

        store
            .replace_chunks(module_id, &split_into_chunks("a b c d e"))
            .await
            .unwrap();
        store
            .replace_chunks(module_id, &split_into_chunks("x y"))
            .await
            .unwrap();

        let chunks = store.list_chunks(module_id).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "x ");
    }

    #[tokio::test]
    async fn test_large_batches_are_split() {
        let pool = memory_pool().await;
        let course_id = insert_course(&pool).await;
        let module_id = insert_module(&pool, course_id, "text_stream").await;
        let store = ChunkStore::new(pool);

        let text = (0..(INSERT_BATCH_ROWS * 2 + 7))
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        store
            .replace_chunks(module_id, &split_into_chunks(&text))
            .await
            .unwrap();

        let chunks = store.list_chunks(module_id).await.unwrap();
        assert_eq!(chunks.len(), INSERT_BATCH_ROWS * 2 + 7);
        assert!(chunks
            .iter()
            .enumerate()
            .all(|(i, c)| c.chunk_order == i as i64));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_previous_set_intact() {
        let pool = memory_pool().await;
        let course_id = insert_course(&pool).await;
        let module_id = insert_module(&pool, course_id, "text_stream").await;
        let store = ChunkStore::new(pool);

        store
            .replace_chunks(module_id, &split_into_chunks("keep me"))
            .await
            .unwrap();

        // Duplicate ordinals violate the unique index mid-transaction
        let mut broken = split_into_chunks("p q r");
        broken[2].order = 0;
        assert!(store.replace_chunks(module_id, &broken).await.is_err());

        let chunks = store.list_chunks(module_id).await.unwrap();
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["keep ", "me "]);
    }

    #[tokio::test]
    async fn test_unknown_module_has_no_chunks() {
        let pool = memory_pool().await;
        let store = ChunkStore::new(pool);
        assert!(store.list_chunks(Uuid::new_v4()).await.unwrap().is_empty());
        assert_eq!(store.count_chunks(Uuid::new_v4()).await.unwrap(), 0);
    }
}

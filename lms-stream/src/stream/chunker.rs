//! Word-level chunking
//!
//! Text is split into one chunk per whitespace-separated token, each followed
//! by a single space, for the word-by-word "typewriter" reveal. There is no
//! sentence or paragraph grouping.

/// Display duration assigned to every chunk at ingestion
pub const CHUNK_DURATION_SECONDS: i64 = 1;

/// A chunk ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    /// Zero-based, contiguous position within the module
    pub order: i64,
    pub content: String,
    pub duration_seconds: i64,
}

/// Split text into ordered word chunks
///
/// Returns an empty vector when the text holds no tokens; callers treat that
/// as empty content.
pub fn split_into_chunks(text: &str) -> Vec<ChunkDraft> {
    text.split_whitespace()
        .enumerate()
        .map(|(order, token)| ChunkDraft {
            order: order as i64,
            content: format!("{} ", token),
            duration_seconds: CHUNK_DURATION_SECONDS,
        })
        .collect()
}

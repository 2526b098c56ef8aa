//! Text-stream core: chunk ingestion and per-student progress cursors
//!
//! - [`source`] / [`chunker`]: pure classification, extraction and splitting
//! - [`chunk_store`]: ordered chunk sets per module
//! - [`progress`]: the per-(student, module) cursor state machine
//! - [`ingest`]: ties resolver, classification and chunk store together
//! - [`registry`] / [`resolver`]: module records and uploaded content

pub mod chunk_store;
pub mod chunker;
pub mod ingest;
pub mod progress;
pub mod registry;
pub mod resolver;
pub mod source;

pub use chunk_store::{Chunk, ChunkStore};
pub use chunker::{split_into_chunks, ChunkDraft, CHUNK_DURATION_SECONDS};
pub use ingest::{ContentInput, CreatedModule, IngestOutcome, Ingestor, NewModule};
pub use progress::{AdvanceOutcome, CursorState, ProgressCursor, ProgressCursorManager, StreamView};
pub use registry::ModuleRegistry;
pub use resolver::ContentResolver;
pub use source::{PresentationHosts, ResolvedContent, SourceText, FALLBACK_TEXT};

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the text-stream core
///
/// Every variant is terminal for the current request; nothing is retried.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Ingestion found no extractable tokens
    #[error("No text content found")]
    EmptyContent,

    /// Module has zero chunks at fetch time
    #[error("No content found for this module")]
    NoContent,

    /// Module (or its owning course) could not be resolved
    #[error("Module not found: {0}")]
    ModuleNotFound(Uuid),

    /// Course referenced by a new module does not exist
    #[error("Course not found: {0}")]
    CourseNotFound(Uuid),

    /// Re-ingestion targeted a video or PDF module
    #[error("Module {0} is not a text-stream module")]
    NotTextStream(Uuid),

    /// Advance called before the cursor was created by a fetch
    #[error("No progress found. Start the module first.")]
    NoProgress,

    /// Advance's conditional update touched no row
    #[error("Progress record not found")]
    ProgressRecordNotFound,

    /// Reading uploaded content failed for a reason other than absence
    #[error("Content source error: {0}")]
    ContentSource(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StreamResult<T> = Result<T, StreamError>;

/// Parse a UUID stored as TEXT
pub(crate) fn uuid_column(value: &str) -> StreamResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| StreamError::Database(sqlx::Error::Decode(Box::new(e))))
}

//! Module content ingestion
//!
//! Resolves a module's content, classifies it, extracts text and writes the
//! resulting chunk set. Everything that can fail without touching the
//! database (resolution, classification, empty-content detection) runs before
//! the transaction opens.

use lms_common::db::{ModuleRecord, ModuleType};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use super::chunk_store::ChunkStore;
use super::chunker::{split_into_chunks, ChunkDraft};
use super::progress::ProgressCursorManager;
use super::registry::ModuleRegistry;
use super::resolver::ContentResolver;
use super::source::{classify_inline, classify_reference, PresentationHosts};
use super::{StreamError, StreamResult};

/// Default duration, in minutes, of a new text-stream module
const TEXT_STREAM_DEFAULT_DURATION_MINS: i64 = 5;

/// Where a module's text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentInput {
    /// Text supplied directly by the caller
    Inline(String),
    /// Upload path or URL
    Reference(String),
}

impl ContentInput {
    /// Pick the content source from optional inline text and reference
    ///
    /// Non-blank inline text wins over a reference.
    pub fn from_parts(text: Option<&str>, content_url: Option<&str>) -> Option<Self> {
        match (text, content_url) {
            (Some(text), _) if !text.trim().is_empty() => Some(ContentInput::Inline(text.to_string())),
            (_, Some(url)) if !url.trim().is_empty() => {
                Some(ContentInput::Reference(url.trim().to_string()))
            }
            _ => None,
        }
    }

    fn reference(&self) -> Option<&str> {
        match self {
            ContentInput::Reference(reference) => Some(reference),
            ContentInput::Inline(_) => None,
        }
    }
}

/// Request to create a module in a course
#[derive(Debug, Clone)]
pub struct NewModule {
    pub title: String,
    pub module_type: ModuleType,
    pub content_url: Option<String>,
    pub text: Option<String>,
    pub order_index: Option<i64>,
    pub duration: Option<i64>,
    pub notes: Option<String>,
}

/// Result of writing a module's chunk set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub module_id: Uuid,
    pub chunk_count: usize,
    /// Content was replaced by the fallback sentence
    pub fallback: bool,
}

#[derive(Debug, Clone)]
pub struct CreatedModule {
    pub module: ModuleRecord,
    /// Present for text-stream modules only
    pub ingest: Option<IngestOutcome>,
}

/// Chunks ready to be written, plus how they were obtained
struct PreparedContent {
    drafts: Vec<ChunkDraft>,
    fallback: bool,
}

#[derive(Clone)]
pub struct Ingestor {
    db: SqlitePool,
    registry: ModuleRegistry,
    resolver: ContentResolver,
    hosts: PresentationHosts,
}

impl Ingestor {
    pub fn new(db: SqlitePool, resolver: ContentResolver, hosts: PresentationHosts) -> Self {
        Self {
            registry: ModuleRegistry::new(db.clone()),
            db,
            resolver,
            hosts,
        }
    }

    async fn prepare(&self, input: &ContentInput) -> StreamResult<PreparedContent> {
        let source = match input {
            ContentInput::Inline(text) => classify_inline(text),
            ContentInput::Reference(reference) => {
                let resolved = if self.hosts.matches(reference) {
                    None
                } else {
                    self.resolver.resolve(reference).await?
                };
                classify_reference(reference, resolved, &self.hosts)
            }
        };

        let drafts = split_into_chunks(&source.extract());
        if drafts.is_empty() {
            return Err(StreamError::EmptyContent);
        }

        Ok(PreparedContent {
            drafts,
            fallback: source.is_fallback(),
        })
    }

    /// Replace the chunk set of an existing text-stream module
    ///
    /// A reference input also becomes the module's stored `content_url`.
    /// Existing cursors are realigned to the new chunk count in the same
    /// transaction.
    pub async fn ingest(&self, module_id: Uuid, input: &ContentInput) -> StreamResult<IngestOutcome> {
        let module = self.registry.get_module(module_id).await?;
        if module.module_type != ModuleType::TextStream {
            return Err(StreamError::NotTextStream(module_id));
        }

        let prepared = self.prepare(input).await?;

        let mut tx = self.db.begin().await?;
        if let Some(reference) = input.reference() {
            ModuleRegistry::set_content_url_in(&mut tx, module_id, reference).await?;
        }
        let chunk_count = ChunkStore::replace_chunks_in(&mut tx, module_id, &prepared.drafts).await?;
        ProgressCursorManager::realign_in(&mut tx, module_id, chunk_count as i64).await?;
        tx.commit().await?;

        info!(
            "Ingested {} chunks for module {}{}",
            chunk_count,
            module_id,
            if prepared.fallback { " (fallback text)" } else { "" }
        );

        Ok(IngestOutcome {
            module_id,
            chunk_count,
            fallback: prepared.fallback,
        })
    }

    /// Create a module; text-stream modules get their chunks in the same transaction
    pub async fn create_module(&self, course_id: Uuid, new: NewModule) -> StreamResult<CreatedModule> {
        if !self.registry.course_exists(course_id).await? {
            return Err(StreamError::CourseNotFound(course_id));
        }

        let prepared = if new.module_type == ModuleType::TextStream {
            let input = ContentInput::from_parts(new.text.as_deref(), new.content_url.as_deref())
                .ok_or(StreamError::EmptyContent)?;
            Some(self.prepare(&input).await?)
        } else {
            None
        };

        let module_order = match new.order_index {
            Some(order) => order,
            None => self.registry.next_module_order(course_id).await?,
        };
        let duration_mins = new.duration.unwrap_or(match new.module_type {
            ModuleType::TextStream => TEXT_STREAM_DEFAULT_DURATION_MINS,
            _ => 0,
        });

        let module = ModuleRecord {
            module_id: Uuid::new_v4(),
            course_id,
            title: new.title,
            module_type: new.module_type,
            content_url: new.content_url.filter(|url| !url.trim().is_empty()),
            module_order,
            duration_mins,
            notes: new.notes,
        };

        let mut tx = self.db.begin().await?;
        ModuleRegistry::insert_module_in(&mut tx, &module).await?;
        let ingest = match prepared {
            Some(prepared) => {
                let chunk_count =
                    ChunkStore::replace_chunks_in(&mut tx, module.module_id, &prepared.drafts).await?;
                Some(IngestOutcome {
                    module_id: module.module_id,
                    chunk_count,
                    fallback: prepared.fallback,
                })
            }
            None => None,
        };
        tx.commit().await?;

        debug!(
            "Created {} module {} in course {} at position {}",
            module.module_type, module.module_id, course_id, module.module_order
        );

        Ok(CreatedModule { module, ingest })
    }
}

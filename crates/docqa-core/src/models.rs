//! Core data models used throughout docqa.
//!
//! These types represent the chunks, index entries, search results, and
//! answers that flow through the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

/// A contiguous window of a document's text.
///
/// Offsets are in characters (Unicode scalar values), not bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// UUIDv5 derived from `(filename, start)`.
    pub id: String,
    pub filename: String,
    pub year: Option<i32>,
    pub chunk_index: i64,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// Metadata stored alongside every vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub filename: String,
    pub year: Option<i32>,
    pub chunk_index: i64,
    pub start: usize,
    pub end: usize,
}

/// The persisted unit of the vector index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            vector,
            text: chunk.text.clone(),
            metadata: EntryMetadata {
                filename: chunk.filename.clone(),
                year: chunk.year,
                chunk_index: chunk.chunk_index,
                start: chunk.start,
                end: chunk.end,
            },
        }
    }
}

/// A search hit: entry text and metadata with its cosine similarity.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub chunk_id: String,
    pub text: String,
    pub metadata: EntryMetadata,
    pub score: f32,
}

/// Restricts a search to entries of a single year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearFilter {
    pub year: i32,
}

/// Bookkeeping row for an ingested document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub filename: String,
    pub year: Option<i32>,
    /// SHA-256 of the extracted text; used to skip unchanged documents.
    pub content_hash: String,
    pub word_count: i64,
    pub chunk_count: i64,
    /// Unix seconds.
    pub ingested_at: i64,
}

/// Aggregate view of the index for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub document_count: i64,
    pub chunk_count: i64,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

/// Input of the answer pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub year: Option<i32>,
}

/// A cited document accompanying a substantive answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub filename: String,
    pub year: Option<i32>,
    pub preview: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// The model produced a substantive answer from the retrieved context.
    Answered,
    /// Nothing relevant was retrieved, or the model declined to answer.
    NotFound,
    /// Context was retrieved but the generation model failed.
    GenerationUnavailable,
}

/// Output of the answer pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Source>,
    pub year_filter: Option<i32>,
    pub status: AnswerStatus,
}

//! Ingestion pipeline orchestration.
//!
//! Coordinates the corpus flow: scan → extract → chunk → embed → persist.
//!
//! ```text
//! Idle → Scanning → Extracting → Chunking → Embedding → Persisting → Idle
//!                        (any state) ── index failure ──→ Failed
//! ```
//!
//! Failures are scoped as tightly as possible:
//! - an unreadable or textless PDF is skipped, named in
//!   [`IngestSummary::errors`] and explained in [`IngestSummary::failures`];
//! - an embedding failure stops that document only. Batches already
//!   persisted stay in the index, but the document is not recorded, so the
//!   next incremental run re-ingests it from scratch;
//! - an index failure aborts the run.

use anyhow::{bail, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

use docqa_core::chunk::{chunk_text, ChunkParams};
use docqa_core::embedding::{embed_batch, Embedder};
use docqa_core::models::{DocumentRecord, IndexEntry};
use docqa_core::store::VectorIndex;

use crate::config::CorpusConfig;
use crate::extract::PdfExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Skip documents whose content hash is unchanged; replace changed ones.
    Incremental,
    /// Clear the index and ingest everything.
    Rebuild,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Idle,
    Scanning,
    Extracting,
    Chunking,
    Embedding,
    Persisting,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Documents fully chunked, embedded and recorded.
    pub processed: usize,
    /// Documents that failed extraction or embedding.
    pub skipped: usize,
    /// Documents left alone because their content hash was unchanged.
    pub unchanged: usize,
    /// Entries written during this run.
    pub chunks: usize,
    /// Filenames of every skipped document, in scan order.
    pub errors: Vec<String>,
    /// Why each document in `errors` was skipped.
    pub failures: Vec<IngestFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestFailure {
    pub filename: String,
    pub reason: String,
}

pub struct IngestionPipeline {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    extractor: PdfExtractor,
    corpus: CorpusConfig,
    chunking: ChunkParams,
    batch_size: usize,
    state: Mutex<IngestState>,
}

enum DocumentOutcome {
    Processed(usize),
    Unchanged,
    Skipped(String),
}

impl IngestionPipeline {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        corpus: CorpusConfig,
        chunking: ChunkParams,
        batch_size: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            extractor: PdfExtractor::default(),
            corpus,
            chunking,
            batch_size: batch_size.max(1),
            state: Mutex::new(IngestState::Idle),
        }
    }

    pub fn state(&self) -> IngestState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(IngestState::Failed)
    }

    fn set_state(&self, next: IngestState) {
        if let Ok(mut state) = self.state.lock() {
            let prev = *state;
            if prev != next {
                tracing::debug!(from = ?prev, to = ?next, "ingest state");
                *state = next;
            }
        }
    }

    pub async fn run(&self, mode: IngestMode) -> Result<IngestSummary> {
        match self.run_inner(mode).await {
            Ok(summary) => {
                self.set_state(IngestState::Idle);
                Ok(summary)
            }
            Err(e) => {
                self.set_state(IngestState::Failed);
                tracing::error!(error = %e, "ingestion failed");
                Err(e)
            }
        }
    }

    async fn run_inner(&self, mode: IngestMode) -> Result<IngestSummary> {
        self.set_state(IngestState::Scanning);
        let files = scan_corpus(&self.corpus)?;
        tracing::info!(
            files = files.len(),
            root = %self.corpus.root.display(),
            ?mode,
            "corpus scanned"
        );

        if mode == IngestMode::Rebuild {
            self.index.clear().await?;
        }

        let mut summary = IngestSummary::default();
        for (path, filename) in &files {
            match self.ingest_document(path, filename, mode).await? {
                DocumentOutcome::Processed(n) => {
                    summary.processed += 1;
                    summary.chunks += n;
                }
                DocumentOutcome::Unchanged => summary.unchanged += 1,
                DocumentOutcome::Skipped(reason) => {
                    summary.skipped += 1;
                    summary.errors.push(filename.clone());
                    summary.failures.push(IngestFailure {
                        filename: filename.clone(),
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            unchanged = summary.unchanged,
            chunks = summary.chunks,
            "ingestion complete"
        );
        Ok(summary)
    }

    async fn ingest_document(
        &self,
        path: &std::path::Path,
        filename: &str,
        mode: IngestMode,
    ) -> Result<DocumentOutcome> {
        self.set_state(IngestState::Extracting);
        let doc = match self.extractor.extract(path, filename).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(filename, error = %e, "skipping document");
                return Ok(DocumentOutcome::Skipped(e.to_string()));
            }
        };

        let content_hash = sha256_hex(&doc.text);
        if mode == IngestMode::Incremental {
            if let Some(existing) = self.index.document(filename).await? {
                if existing.content_hash == content_hash {
                    tracing::debug!(filename, "unchanged");
                    return Ok(DocumentOutcome::Unchanged);
                }
            }
            // Drops stale entries, including partial ones from a failed run.
            self.index.remove_document(filename).await?;
        }

        self.set_state(IngestState::Chunking);
        let chunks = chunk_text(filename, doc.year, &doc.text, self.chunking);

        let mut written = 0;
        for batch in chunks.chunks(self.batch_size) {
            self.set_state(IngestState::Embedding);
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = match embed_batch(self.embedder.as_ref(), &texts).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(
                        filename,
                        persisted = written,
                        total = chunks.len(),
                        error = %e,
                        "embedding failed; document left incomplete"
                    );
                    return Ok(DocumentOutcome::Skipped(e.to_string()));
                }
            };

            self.set_state(IngestState::Persisting);
            let entries: Vec<IndexEntry> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry::from_chunk(chunk, vector))
                .collect();
            self.index.upsert(&entries).await?;
            written += entries.len();
        }

        self.index
            .record_document(&DocumentRecord {
                filename: filename.to_string(),
                year: doc.year,
                content_hash,
                word_count: doc.text.split_whitespace().count() as i64,
                chunk_count: chunks.len() as i64,
                ingested_at: chrono::Utc::now().timestamp(),
            })
            .await?;

        tracing::info!(filename, year = ?doc.year, chunks = written, "ingested");
        Ok(DocumentOutcome::Processed(written))
    }
}

/// List corpus files matching `include_globs`, as `(path, relative name)`,
/// sorted by name. A missing root yields an empty list.
pub fn scan_corpus(corpus: &CorpusConfig) -> Result<Vec<(PathBuf, String)>> {
    let root = &corpus.root;
    if !root.exists() {
        tracing::warn!(root = %root.display(), "corpus directory does not exist");
        return Ok(Vec::new());
    }
    if !root.is_dir() {
        bail!("corpus.root is not a directory: {}", root.display());
    }

    let include_set = corpus.glob_set()?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if !include_set.is_match(&rel_str) {
            continue;
        }
        files.push((path.to_path_buf(), rel_str));
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

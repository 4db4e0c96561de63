//! In-memory [`VectorIndex`] implementation for tests and embedding hosts.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock`. Search is a
//! brute-force cosine scan over every stored vector. Nothing is persisted.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::IndexError;
use crate::models::{DocumentRecord, IndexEntry, IndexStats, ScoredEntry, YearFilter};

use super::{matches_filter, min_max, rank, VectorIndex};

#[derive(Default)]
struct Inner {
    /// `(insertion sequence, entry)` in insertion order.
    entries: Vec<(i64, IndexEntry)>,
    documents: HashMap<String, DocumentRecord>,
    next_seq: i64,
}

/// In-memory vector index.
#[derive(Default)]
pub struct InMemoryIndex {
    inner: RwLock<Inner>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, IndexError> {
        self.inner.read().map_err(|_| IndexError::Poisoned)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, IndexError> {
        self.inner.write().map_err(|_| IndexError::Poisoned)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<(), IndexError> {
        let mut inner = self.write()?;
        for entry in entries {
            if let Some(slot) = inner
                .entries
                .iter_mut()
                .find(|(_, e)| e.chunk_id == entry.chunk_id)
            {
                slot.1 = entry.clone();
                continue;
            }
            inner.next_seq += 1;
            let seq = inner.next_seq;
            inner.entries.push((seq, entry.clone()));
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<YearFilter>,
    ) -> Result<Vec<ScoredEntry>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let inner = self.read()?;
        let hits = inner
            .entries
            .iter()
            .filter(|(_, e)| e.vector.len() == query_vec.len())
            .filter(|(_, e)| matches_filter(e.metadata.year, filter))
            .map(|(seq, e)| {
                (
                    *seq,
                    ScoredEntry {
                        chunk_id: e.chunk_id.clone(),
                        text: e.text.clone(),
                        metadata: e.metadata.clone(),
                        score: cosine_similarity(query_vec, &e.vector),
                    },
                )
            })
            .collect();
        Ok(rank(hits, k))
    }

    async fn clear(&self) -> Result<(), IndexError> {
        let mut inner = self.write()?;
        inner.entries.clear();
        inner.documents.clear();
        Ok(())
    }

    async fn count(&self) -> Result<i64, IndexError> {
        Ok(self.read()?.entries.len() as i64)
    }

    async fn year_range(&self) -> Result<Option<(i32, i32)>, IndexError> {
        let inner = self.read()?;
        Ok(min_max(inner.entries.iter().filter_map(|(_, e)| e.metadata.year)))
    }

    async fn years(&self) -> Result<Vec<i32>, IndexError> {
        let inner = self.read()?;
        let years: BTreeSet<i32> = inner
            .entries
            .iter()
            .filter_map(|(_, e)| e.metadata.year)
            .collect();
        Ok(years.into_iter().collect())
    }

    async fn stats(&self) -> Result<IndexStats, IndexError> {
        let inner = self.read()?;
        let files: HashSet<&str> = inner
            .entries
            .iter()
            .map(|(_, e)| e.metadata.filename.as_str())
            .collect();
        let range = min_max(inner.entries.iter().filter_map(|(_, e)| e.metadata.year));
        Ok(IndexStats {
            document_count: files.len() as i64,
            chunk_count: inner.entries.len() as i64,
            year_min: range.map(|r| r.0),
            year_max: range.map(|r| r.1),
        })
    }

    async fn document(&self, filename: &str) -> Result<Option<DocumentRecord>, IndexError> {
        Ok(self.read()?.documents.get(filename).cloned())
    }

    async fn record_document(&self, record: &DocumentRecord) -> Result<(), IndexError> {
        self.write()?
            .documents
            .insert(record.filename.clone(), record.clone());
        Ok(())
    }

    async fn remove_document(&self, filename: &str) -> Result<(), IndexError> {
        let mut inner = self.write()?;
        inner.documents.remove(filename);
        inner.entries.retain(|(_, e)| e.metadata.filename != filename);
        Ok(())
    }
}

//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait defines every storage operation the ingestion
//! and query pipelines need, enabling pluggable backends (SQLite in the app
//! crate, [`memory::InMemoryIndex`] here).
//!
//! # Contract
//!
//! | Method | Behaviour |
//! |--------|-----------|
//! | [`upsert`](VectorIndex::upsert) | Insert or replace entries keyed by chunk id; never duplicates |
//! | [`search`](VectorIndex::search) | Top-`k` by cosine similarity, ties by insertion order, optional year filter |
//! | [`clear`](VectorIndex::clear) | Remove all entries and document records; index stays usable |
//! | [`count`](VectorIndex::count) | Number of persisted entries |
//! | [`year_range`](VectorIndex::year_range) | `(min, max)` over entry years, `None` when no entry has a year |
//! | [`years`](VectorIndex::years) | Distinct entry years, ascending |
//! | [`stats`](VectorIndex::stats) | Document/entry counts and year range |
//!
//! Searching an empty index, or with a filter nothing matches, returns an
//! empty vector rather than an error. Entries without a year never match a
//! year filter. Entries whose vector length differs from the query's (left
//! over from a different embedding model) are never returned.

pub mod memory;

use async_trait::async_trait;

use crate::error::IndexError;
use crate::models::{DocumentRecord, IndexEntry, IndexStats, ScoredEntry, YearFilter};

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Persist entries, replacing any existing entry with the same chunk id.
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<(), IndexError>;

    /// Return up to `k` entries nearest to `query_vec`, considering only
    /// entries of the same dimensionality.
    async fn search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<YearFilter>,
    ) -> Result<Vec<ScoredEntry>, IndexError>;

    /// Remove every entry and document record.
    async fn clear(&self) -> Result<(), IndexError>;

    /// Number of persisted entries.
    /// Aggregates reflect the persisted state, including writes made
    /// through another handle on the same storage.
    async fn count(&self) -> Result<i64, IndexError>;

    async fn year_range(&self) -> Result<Option<(i32, i32)>, IndexError>;

    async fn years(&self) -> Result<Vec<i32>, IndexError>;

    async fn stats(&self) -> Result<IndexStats, IndexError>;

    /// Look up the bookkeeping record of an ingested document.
    async fn document(&self, filename: &str) -> Result<Option<DocumentRecord>, IndexError>;

    /// Insert or replace a document's bookkeeping record.
    async fn record_document(&self, record: &DocumentRecord) -> Result<(), IndexError>;

    /// Remove a document's record and all of its entries.
    async fn remove_document(&self, filename: &str) -> Result<(), IndexError>;
}

/// Order search hits by score descending, then insertion sequence ascending.
///
/// `hits` pairs each entry with its insertion sequence number. NaN scores
/// sort last.
pub fn rank(mut hits: Vec<(i64, ScoredEntry)>, k: usize) -> Vec<ScoredEntry> {
    hits.sort_by(|(seq_a, a), (seq_b, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or_else(|| a.score.is_nan().cmp(&b.score.is_nan()))
            .then(seq_a.cmp(seq_b))
    });
    hits.truncate(k);
    hits.into_iter().map(|(_, e)| e).collect()
}

/// Whether an entry's year passes `filter`.
pub fn matches_filter(year: Option<i32>, filter: Option<YearFilter>) -> bool {
    match filter {
        None => true,
        Some(f) => year == Some(f.year),
    }
}

/// Collapse a list of years into `(min, max)`.
pub fn min_max(years: impl IntoIterator<Item = i32>) -> Option<(i32, i32)> {
    years.into_iter().fold(None, |acc, y| match acc {
        None => Some((y, y)),
        Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryMetadata;

    fn hit(seq: i64, id: &str, score: f32) -> (i64, ScoredEntry) {
        (
            seq,
            ScoredEntry {
                chunk_id: id.to_string(),
                text: String::new(),
                metadata: EntryMetadata {
                    filename: "f.pdf".to_string(),
                    year: None,
                    chunk_index: 0,
                    start: 0,
                    end: 0,
                },
                score,
            },
        )
    }

    #[test]
    fn rank_breaks_ties_by_insertion_order() {
        let ranked = rank(
            vec![hit(3, "c", 0.5), hit(1, "a", 0.5), hit(2, "b", 0.9)],
            10,
        );
        let ids: Vec<&str> = ranked.iter().map(|e| e.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn rank_puts_nan_last_and_truncates() {
        let ranked = rank(
            vec![hit(1, "nan", f32::NAN), hit(2, "low", -0.2), hit(3, "high", 0.4)],
            2,
        );
        let ids: Vec<&str> = ranked.iter().map(|e| e.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low"]);
    }

    #[test]
    fn filter_excludes_null_years() {
        assert!(matches_filter(None, None));
        assert!(matches_filter(Some(2020), None));
        assert!(matches_filter(Some(2020), Some(YearFilter { year: 2020 })));
        assert!(!matches_filter(Some(2021), Some(YearFilter { year: 2020 })));
        assert!(!matches_filter(None, Some(YearFilter { year: 2020 })));
    }

    #[test]
    fn min_max_of_years() {
        assert_eq!(min_max(Vec::<i32>::new()), None);
        assert_eq!(min_max(vec![2019, 2003, 2021]), Some((2003, 2021)));
    }
}

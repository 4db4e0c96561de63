//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Entries live in the `entries` table with their embedding as a
//! little-endian f32 BLOB; search is a brute-force cosine scan over the
//! (optionally year-filtered) rows of the query's dimensionality.
//!
//! Aggregates used by `stats`, `count` and `year_range` are cached in
//! memory, tagged with the `index_meta.generation` counter. Every write
//! bumps the counter in the same transaction, so a cache entry is reused
//! only while no handle on the database file (this process or a CLI run
//! alongside a server) has changed the entries since.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::sync::Mutex;

use docqa_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use docqa_core::error::IndexError;
use docqa_core::models::{
    DocumentRecord, EntryMetadata, IndexEntry, IndexStats, ScoredEntry, YearFilter,
};
use docqa_core::store::{rank, VectorIndex};

pub struct SqliteIndex {
    pool: SqlitePool,
    /// `(generation, stats)` as of the last computation.
    stats_cache: Mutex<Option<(i64, IndexStats)>>,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            stats_cache: Mutex::new(None),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn cached(&self, generation: i64) -> Result<Option<IndexStats>, IndexError> {
        let cache = *self.stats_cache.lock().map_err(|_| IndexError::Poisoned)?;
        Ok(cache.filter(|(g, _)| *g == generation).map(|(_, stats)| stats))
    }

    fn store_cache(&self, generation: i64, stats: IndexStats) -> Result<(), IndexError> {
        *self.stats_cache.lock().map_err(|_| IndexError::Poisoned)? = Some((generation, stats));
        Ok(())
    }

    async fn generation(&self) -> Result<i64, IndexError> {
        let generation: Option<i64> =
            sqlx::query_scalar("SELECT generation FROM index_meta WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
        Ok(generation.unwrap_or(0))
    }

    async fn compute_stats(&self) -> Result<IndexStats, IndexError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(DISTINCT filename) AS document_count,
                   COUNT(*) AS chunk_count,
                   MIN(year) AS year_min,
                   MAX(year) AS year_max
            FROM entries
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(IndexStats {
            document_count: row.get("document_count"),
            chunk_count: row.get("chunk_count"),
            year_min: row.get::<Option<i64>, _>("year_min").map(|y| y as i32),
            year_max: row.get::<Option<i64>, _>("year_max").map(|y| y as i32),
        })
    }
}

fn storage(e: sqlx::Error) -> IndexError {
    IndexError::Storage(e.to_string())
}

async fn bump_generation(conn: &mut SqliteConnection) -> Result<(), IndexError> {
    sqlx::query("UPDATE index_meta SET generation = generation + 1 WHERE id = 1")
        .execute(conn)
        .await
        .map_err(storage)?;
    Ok(())
}

fn scored_from_row(row: &SqliteRow, query_vec: &[f32]) -> Result<(i64, ScoredEntry), IndexError> {
    let blob: Vec<u8> = row.get("embedding");
    let dims: i64 = row.get("dims");
    let chunk_id: String = row.get("chunk_id");
    if blob.len() as i64 != dims * 4 {
        return Err(IndexError::Corrupt(format!(
            "entry {} has a {}-byte embedding for {} dims",
            chunk_id,
            blob.len(),
            dims
        )));
    }
    let vector = blob_to_vec(&blob);
    Ok((
        row.get("seq"),
        ScoredEntry {
            chunk_id,
            text: row.get("text"),
            metadata: EntryMetadata {
                filename: row.get("filename"),
                year: row.get::<Option<i64>, _>("year").map(|y| y as i32),
                chunk_index: row.get("chunk_index"),
                start: row.get::<i64, _>("start_offset") as usize,
                end: row.get::<i64, _>("end_offset") as usize,
            },
            score: cosine_similarity(query_vec, &vector),
        },
    ))
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<(), IndexError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(storage)?;

        for entry in entries {
            let blob = vec_to_blob(&entry.vector);
            // Conflict updates in place so the row keeps its original seq.
            sqlx::query(
                r#"
                INSERT INTO entries (chunk_id, filename, year, chunk_index, start_offset,
                                     end_offset, text, dims, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(chunk_id) DO UPDATE SET
                    filename = excluded.filename,
                    year = excluded.year,
                    chunk_index = excluded.chunk_index,
                    start_offset = excluded.start_offset,
                    end_offset = excluded.end_offset,
                    text = excluded.text,
                    dims = excluded.dims,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&entry.chunk_id)
            .bind(&entry.metadata.filename)
            .bind(entry.metadata.year)
            .bind(entry.metadata.chunk_index)
            .bind(entry.metadata.start as i64)
            .bind(entry.metadata.end as i64)
            .bind(&entry.text)
            .bind(entry.vector.len() as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        bump_generation(&mut tx).await?;
        tx.commit().await.map_err(storage)?;
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

        let mut sql = String::from(
            "SELECT seq, chunk_id, filename, year, chunk_index, start_offset, end_offset, \
             text, dims, embedding FROM entries WHERE dims = ?",
        );
        if filter.is_some() {
            sql.push_str(" AND year = ?");
        }
        let mut query = sqlx::query(&sql).bind(query_vec.len() as i64);
        if let Some(f) = filter {
            query = query.bind(f.year);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(storage)?;

        let hits = rows
            .iter()
            .map(|row| scored_from_row(row, query_vec))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rank(hits, k))
    }

    async fn clear(&self) -> Result<(), IndexError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query("DELETE FROM entries")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        bump_generation(&mut tx).await?;
        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn count(&self) -> Result<i64, IndexError> {
        Ok(self.stats().await?.chunk_count)
    }

    async fn year_range(&self) -> Result<Option<(i32, i32)>, IndexError> {
        let stats = self.stats().await?;
        Ok(stats.year_min.zip(stats.year_max))
    }

    async fn years(&self) -> Result<Vec<i32>, IndexError> {
        let years: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT year FROM entries WHERE year IS NOT NULL ORDER BY year ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(years.into_iter().map(|y| y as i32).collect())
    }

    async fn stats(&self) -> Result<IndexStats, IndexError> {
        // Read the counter first: a write landing mid-computation leaves
        // the cache tagged with an older generation, so it is recomputed.
        let generation = self.generation().await?;
        if let Some(stats) = self.cached(generation)? {
            return Ok(stats);
        }
        let stats = self.compute_stats().await?;
        self.store_cache(generation, stats)?;
        Ok(stats)
    }

    async fn document(&self, filename: &str) -> Result<Option<DocumentRecord>, IndexError> {
        let row = sqlx::query(
            "SELECT filename, year, content_hash, word_count, chunk_count, ingested_at FROM documents WHERE filename = ?",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(|r| DocumentRecord {
            filename: r.get("filename"),
            year: r.get::<Option<i64>, _>("year").map(|y| y as i32),
            content_hash: r.get("content_hash"),
            word_count: r.get("word_count"),
            chunk_count: r.get("chunk_count"),
            ingested_at: r.get("ingested_at"),
        }))
    }

    async fn record_document(&self, record: &DocumentRecord) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            INSERT INTO documents (filename, year, content_hash, word_count, chunk_count, ingested_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(filename) DO UPDATE SET
                year = excluded.year,
                content_hash = excluded.content_hash,
                word_count = excluded.word_count,
                chunk_count = excluded.chunk_count,
                ingested_at = excluded.ingested_at
            "#,
        )
        .bind(&record.filename)
        .bind(record.year)
        .bind(&record.content_hash)
        .bind(record.word_count)
        .bind(record.chunk_count)
        .bind(record.ingested_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn remove_document(&self, filename: &str) -> Result<(), IndexError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query("DELETE FROM entries WHERE filename = ?")
            .bind(filename)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        sqlx::query("DELETE FROM documents WHERE filename = ?")
            .bind(filename)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        bump_generation(&mut tx).await?;
        tx.commit().await.map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};
    use tempfile::TempDir;

    async fn open(tmp: &TempDir) -> SqliteIndex {
        let cfg = Config::minimal(tmp.path().join("data/docqa.sqlite"), tmp.path());
        let pool = db::connect(&cfg).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        SqliteIndex::new(pool)
    }

    fn entry(id: &str, file: &str, year: Option<i32>, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk_id: id.to_string(),
            vector,
            text: format!("text {}", id),
            metadata: EntryMetadata {
                filename: file.to_string(),
                year,
                chunk_index: 0,
                start: 0,
                end: 6,
            },
        }
    }

    #[tokio::test]
    async fn empty_index() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;
        assert!(index.search(&[1.0, 0.0], 5, None).await.unwrap().is_empty());
        assert_eq!(index.count().await.unwrap(), 0);
        assert_eq!(index.year_range().await.unwrap(), None);
        assert!(index.years().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_ranks_and_filters() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;
        index
            .upsert(&[
                entry("a", "2020_a.pdf", Some(2020), vec![1.0, 0.0]),
                entry("b", "2021_b.pdf", Some(2021), vec![0.6, 0.8]),
                entry("c", "c.pdf", None, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 2, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        let hits = index
            .search(&[1.0, 0.0], 5, Some(YearFilter { year: 2021 }))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.filename, "2021_b.pdf");
        assert!((hits[0].score - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn stats_cache_tracks_writes() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;
        index
            .upsert(&[entry("a", "2003_a.pdf", Some(2003), vec![1.0])])
            .await
            .unwrap();
        assert_eq!(index.year_range().await.unwrap(), Some((2003, 2003)));

        index
            .upsert(&[
                entry("b", "2021_b.pdf", Some(2021), vec![1.0]),
                entry("a", "2003_a.pdf", Some(2003), vec![0.5]),
            ])
            .await
            .unwrap();
        let stats = index.stats().await.unwrap();
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.chunk_count, 2);
        assert_eq!((stats.year_min, stats.year_max), (Some(2003), Some(2021)));

        index.remove_document("2021_b.pdf").await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        index.clear().await.unwrap();
        assert_eq!(index.stats().await.unwrap(), IndexStats::default());
    }

    #[tokio::test]
    async fn stats_see_writes_from_another_handle() {
        let tmp = TempDir::new().unwrap();
        let server = open(&tmp).await;
        let cli = open(&tmp).await;

        assert_eq!(server.count().await.unwrap(), 0);
        assert_eq!(server.year_range().await.unwrap(), None);

        cli.upsert(&[entry("a", "2019_a.pdf", Some(2019), vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(server.count().await.unwrap(), 1);
        assert_eq!(server.year_range().await.unwrap(), Some((2019, 2019)));
        assert_eq!(server.stats().await.unwrap().document_count, 1);

        cli.upsert(&[entry("b", "2022_b.pdf", Some(2022), vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(server.year_range().await.unwrap(), Some((2019, 2022)));

        cli.remove_document("2019_a.pdf").await.unwrap();
        assert_eq!(server.count().await.unwrap(), 1);

        cli.clear().await.unwrap();
        assert_eq!(server.stats().await.unwrap(), IndexStats::default());
    }

    #[tokio::test]
    async fn search_ignores_entries_of_other_dims() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;
        index
            .upsert(&[
                entry("old", "2020_a.pdf", Some(2020), vec![1.0, 0.0, 0.0]),
                entry("new", "2020_a.pdf", Some(2020), vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 5, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["new"]);

        let hits = index
            .search(&[1.0, 0.0], 5, Some(YearFilter { year: 2020 }))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn document_records_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let index = open(&tmp).await;
        let record = DocumentRecord {
            filename: "2021_sample.pdf".to_string(),
            year: Some(2021),
            content_hash: "abc".to_string(),
            word_count: 12,
            chunk_count: 3,
            ingested_at: 1_700_000_000,
        };
        index.record_document(&record).await.unwrap();
        assert_eq!(
            index.document("2021_sample.pdf").await.unwrap(),
            Some(record)
        );
        assert_eq!(index.document("missing.pdf").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let index = open(&tmp).await;
            index
                .upsert(&[entry("a", "2020_a.pdf", Some(2020), vec![1.0, 2.0])])
                .await
                .unwrap();
            index.pool().close().await;
        }
        let index = open(&tmp).await;
        assert_eq!(index.count().await.unwrap(), 1);
        assert_eq!(index.years().await.unwrap(), vec![2020]);
    }
}

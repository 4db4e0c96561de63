//! Schema creation. Every statement is idempotent.
//!
//! - `documents`: one bookkeeping row per ingested PDF (content hash for
//!   incremental skips).
//! - `entries`: one row per chunk with its embedding BLOB. `seq` is the
//!   insertion order used to break similarity ties.
//! - `index_meta`: a single row whose `generation` every entry write bumps;
//!   cached aggregates are keyed on it.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            filename TEXT PRIMARY KEY,
            year INTEGER,
            content_hash TEXT NOT NULL,
            word_count INTEGER NOT NULL,
            chunk_count INTEGER NOT NULL,
            ingested_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No foreign key to documents: a document whose embedding failed
    // midway keeps its persisted batches without a bookkeeping row.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            chunk_id TEXT NOT NULL UNIQUE,
            filename TEXT NOT NULL,
            year INTEGER,
            chunk_index INTEGER NOT NULL,
            start_offset INTEGER NOT NULL,
            end_offset INTEGER NOT NULL,
            text TEXT NOT NULL,
            dims INTEGER NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_filename ON entries(filename)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_year ON entries(year)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            generation INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query("INSERT OR IGNORE INTO index_meta (id, generation) VALUES (1, 0)")
        .execute(pool)
        .await?;

    Ok(())
}

//! Index statistics for the CLI.
//!
//! `docqa stats` prints what is indexed: document and chunk counts, the
//! year range, a per-year breakdown, and when the corpus was last ingested.
//! `docqa years` prints the distinct years, one per line.

use anyhow::Result;
use sqlx::Row;

use docqa_core::store::VectorIndex;

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteIndex;

struct YearStats {
    year: Option<i32>,
    doc_count: i64,
    chunk_count: i64,
}

async fn open_index(config: &Config) -> Result<SqliteIndex> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    Ok(SqliteIndex::new(pool))
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let index = open_index(config).await?;
    let stats = index.stats().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docqa — Index Stats");
    println!("===================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", stats.document_count);
    println!("  Chunks:      {}", stats.chunk_count);
    match (stats.year_min, stats.year_max) {
        (Some(lo), Some(hi)) => println!("  Years:       {} – {}", lo, hi),
        _ => println!("  Years:       none"),
    }

    let rows = sqlx::query(
        r#"
        SELECT year,
               COUNT(DISTINCT filename) AS doc_count,
               COUNT(*) AS chunk_count
        FROM entries
        GROUP BY year
        ORDER BY year IS NULL, year ASC
        "#,
    )
    .fetch_all(index.pool())
    .await?;

    let by_year: Vec<YearStats> = rows
        .iter()
        .map(|row| YearStats {
            year: row.get::<Option<i64>, _>("year").map(|y| y as i32),
            doc_count: row.get("doc_count"),
            chunk_count: row.get("chunk_count"),
        })
        .collect();

    if !by_year.is_empty() {
        println!();
        println!("  By year:");
        println!("  {:<10} {:>6} {:>8}", "YEAR", "DOCS", "CHUNKS");
        println!("  {}", "-".repeat(26));
        for s in &by_year {
            let label = s
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "undated".to_string());
            println!("  {:<10} {:>6} {:>8}", label, s.doc_count, s.chunk_count);
        }
    }

    let last_ingest: Option<i64> = sqlx::query_scalar("SELECT MAX(ingested_at) FROM documents")
        .fetch_one(index.pool())
        .await?;
    println!();
    println!(
        "  Last ingest: {}",
        last_ingest
            .map(format_ts_relative)
            .unwrap_or_else(|| "never".to_string())
    );
    println!();

    index.pool().close().await;
    Ok(())
}

/// Run the years command: print each indexed year on its own line.
pub async fn run_years(config: &Config) -> Result<()> {
    let index = open_index(config).await?;
    let years = index.years().await?;
    if years.is_empty() {
        println!("No dated documents indexed.");
    }
    for year in years {
        println!("{}", year);
    }
    index.pool().close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn recent_timestamps_are_relative() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 7200), "2 hours ago");
        assert_eq!(format_ts_relative(0), "1970-01-01 00:00");
    }
}

//! # docqa CLI
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and run schema migrations |
//! | `docqa ingest` | Index new or changed PDFs from the corpus |
//! | `docqa reprocess` | Clear the index and re-ingest every PDF |
//! | `docqa ask "<question>"` | Answer a question from the indexed documents |
//! | `docqa stats` | Show document and chunk counts |
//! | `docqa years` | List the publication years present in the index |
//! | `docqa serve` | Start the HTTP server |

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use docqa::context::AppContext;
use docqa::ingest::{IngestMode, IngestSummary};
use docqa::{ask, config, db, logging, migrate, server, stats};

/// docqa: ask questions of a folder of PDF documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "docqa: question answering over a local PDF corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and its tables. Idempotent.
    Init,

    /// Index new or changed PDFs.
    ///
    /// Documents whose extracted text is unchanged since the last run are
    /// skipped; changed documents are replaced.
    Ingest,

    /// Clear the index and re-ingest the whole corpus.
    Reprocess,

    /// Answer a question from the indexed documents.
    Ask {
        /// The question to answer.
        question: String,

        /// Only use documents published in this year.
        #[arg(long)]
        year: Option<i32>,
    },

    /// Show index statistics.
    Stats,

    /// List the publication years present in the index.
    Years,

    /// Start the HTTP server.
    ///
    /// Ingests the corpus first when the index is empty.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Ingest => {
            let ctx = open_for_ingest(cfg).await?;
            let summary = ctx.ingest(IngestMode::Incremental).await;
            ctx.close().await;
            print_summary("ingest", &summary?);
        }
        Commands::Reprocess => {
            let ctx = open_for_ingest(cfg).await?;
            let summary = ctx.ingest(IngestMode::Rebuild).await;
            ctx.close().await;
            print_summary("reprocess", &summary?);
        }
        Commands::Ask { question, year } => {
            let ctx = AppContext::open(cfg).await?;
            let result = ask::run_ask(&ctx, &question, year).await;
            ctx.close().await;
            result?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Years => {
            stats::run_years(&cfg).await?;
        }
        Commands::Serve => {
            let ctx = Arc::new(AppContext::open(cfg).await?);
            if ctx.is_empty().await? {
                if ctx.embedding_configured() {
                    tracing::info!("index is empty; ingesting corpus");
                    let summary = ctx.ingest(IngestMode::Incremental).await?;
                    print_summary("ingest", &summary);
                } else {
                    tracing::warn!("index is empty and embeddings are disabled; skipping ingest");
                }
            }
            server::run_server(ctx).await?;
        }
    }

    Ok(())
}

async fn open_for_ingest(cfg: config::Config) -> anyhow::Result<AppContext> {
    if !cfg.embedding.is_enabled() {
        bail!("Ingestion requires an embedding provider. Set [embedding] provider = \"openai\".");
    }
    AppContext::open(cfg).await
}

fn print_summary(command: &str, summary: &IngestSummary) {
    println!("{}", command);
    println!("  processed: {}", summary.processed);
    println!("  unchanged: {}", summary.unchanged);
    println!("  skipped: {}", summary.skipped);
    println!("  chunks written: {}", summary.chunks);
    for failure in &summary.failures {
        println!("  error: {}: {}", failure.filename, failure.reason);
    }
    println!("ok");
}

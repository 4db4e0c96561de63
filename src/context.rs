//! Application context shared by the CLI and the HTTP server.
//!
//! [`AppContext::open`] initialises components in dependency order:
//! config → SQLite pool + migrations → index → providers → ingestion
//! pipeline. Queries and ingestion are serialised through an index gate:
//! any number of readers, or a single ingest/reprocess run, so no query
//! observes a half-rebuilt index.

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use docqa_core::answer::{answer, AnswerParams};
use docqa_core::embedding::Embedder;
use docqa_core::error::{IndexError, QaError};
use docqa_core::generation::Generator;
use docqa_core::models::{Answer, AskRequest, IndexStats};
use docqa_core::store::VectorIndex;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::generation::create_generator;
use crate::ingest::{IngestMode, IngestState, IngestSummary, IngestionPipeline};
use crate::migrate;
use crate::sqlite_store::SqliteIndex;

pub struct AppContext {
    config: Arc<Config>,
    pool: SqlitePool,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    ingestion: IngestionPipeline,
    answer_params: AnswerParams,
    gate: RwLock<()>,
}

impl AppContext {
    /// Open the index and build providers from `config`.
    pub async fn open(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        Self::with_providers(config, embedder, generator).await
    }

    /// Like [`open`](Self::open) with caller-supplied providers.
    pub async fn with_providers(
        config: Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let pool = db::connect(&config).await?;
        migrate::run_migrations(&pool).await?;
        let index: Arc<dyn VectorIndex> = Arc::new(SqliteIndex::new(pool.clone()));

        let ingestion = IngestionPipeline::new(
            index.clone(),
            embedder.clone(),
            config.corpus.clone(),
            config.chunking.params(),
            config.embedding.batch_size,
        );
        let answer_params = config.retrieval.answer_params();

        tracing::debug!(
            db = %config.db.path.display(),
            embedder = embedder.model_name(),
            generator = generator.model_name(),
            "context opened"
        );

        Ok(Self {
            config: Arc::new(config),
            pool,
            index,
            embedder,
            generator,
            ingestion,
            answer_params,
            gate: RwLock::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a real embedding provider is configured.
    pub fn embedding_configured(&self) -> bool {
        self.embedder.model_name() != "disabled"
    }

    pub fn generation_configured(&self) -> bool {
        self.generator.model_name() != "disabled"
    }

    pub async fn ask(&self, request: &AskRequest) -> Result<Answer, QaError> {
        let _read = self.gate.read().await;
        answer(
            self.index.as_ref(),
            self.embedder.as_ref(),
            self.generator.as_ref(),
            &self.answer_params,
            request,
        )
        .await
    }

    /// Run ingestion with the index gate held exclusively.
    pub async fn ingest(&self, mode: IngestMode) -> Result<IngestSummary> {
        let _write = self.gate.write().await;
        self.ingestion.run(mode).await
    }

    pub fn ingest_state(&self) -> IngestState {
        self.ingestion.state()
    }

    pub async fn stats(&self) -> Result<IndexStats, IndexError> {
        let _read = self.gate.read().await;
        self.index.stats().await
    }

    pub async fn years(&self) -> Result<Vec<i32>, IndexError> {
        let _read = self.gate.read().await;
        self.index.years().await
    }

    pub async fn is_empty(&self) -> Result<bool, IndexError> {
        let _read = self.gate.read().await;
        Ok(self.index.count().await? == 0)
    }

    /// Flush and close the database pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question, optionally restricted to one year |
//! | `GET`  | `/stats` | Document and chunk counts, year range |
//! | `GET`  | `/years` | Distinct publication years, ascending |
//! | `POST` | `/reprocess` | Clear the index and re-ingest the corpus |
//! | `GET`  | `/health` | Health check (returns version and provider status) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "validation_error", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `validation_error` (400), `embedding_error` (502),
//! `timeout` (504), `index_error` (500), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use docqa_core::error::{IndexError, QaError};
use docqa_core::models::{Answer, AskRequest, IndexStats};

use crate::context::AppContext;
use crate::ingest::{IngestMode, IngestSummary};

pub fn router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/stats", get(handle_stats))
        .route("/years", get(handle_years))
        .route("/reprocess", post(handle_reprocess))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(ctx)
}

/// Serve on `[server].bind` until Ctrl-C, then close the database.
pub async fn run_server(ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let bind_addr = ctx.config().server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("docqa server listening on http://{}", bind_addr);

    axum::serve(listener, router(ctx.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    ctx.close().await;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<QaError> for AppError {
    fn from(e: QaError) -> Self {
        let status = match e.kind() {
            "validation_error" => StatusCode::BAD_REQUEST,
            "embedding_error" => StatusCode::BAD_GATEWAY,
            "timeout" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(code = e.kind(), error = %e, "request failed");
        }
        AppError {
            status,
            code: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        QaError::from(e).into()
    }
}

fn internal(e: anyhow::Error) -> AppError {
    tracing::error!(error = %e, "internal error");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: e.to_string(),
    }
}

// ============ POST /ask ============

async fn handle_ask(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<Answer>, AppError> {
    let Json(req) = body.map_err(|e| AppError {
        status: StatusCode::BAD_REQUEST,
        code: "validation_error",
        message: e.body_text(),
    })?;
    tracing::info!(year = ?req.year, "ask");
    Ok(Json(ctx.ask(&req).await?))
}

// ============ GET /stats ============

async fn handle_stats(State(ctx): State<Arc<AppContext>>) -> Result<Json<IndexStats>, AppError> {
    Ok(Json(ctx.stats().await?))
}

// ============ GET /years ============

#[derive(Serialize)]
struct YearsResponse {
    available_years: Vec<i32>,
}

async fn handle_years(State(ctx): State<Arc<AppContext>>) -> Result<Json<YearsResponse>, AppError> {
    Ok(Json(YearsResponse {
        available_years: ctx.years().await?,
    }))
}

// ============ POST /reprocess ============

async fn handle_reprocess(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<IngestSummary>, AppError> {
    if !ctx.embedding_configured() {
        return Err(AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "embedding_error",
            message: "embedding provider is disabled".to_string(),
        });
    }
    let summary = ctx.ingest(IngestMode::Rebuild).await.map_err(internal)?;
    Ok(Json(summary))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    embedding_configured: bool,
    generation_configured: bool,
}

async fn handle_health(State(ctx): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        embedding_configured: ctx.embedding_configured(),
        generation_configured: ctx.generation_configured(),
    })
}

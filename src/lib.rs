//! # docqa
//!
//! Question answering over a local corpus of PDF documents.
//!
//! PDFs are extracted, cut into overlapping character windows, embedded,
//! and stored in a SQLite vector index with each document's publication
//! year. Questions are embedded, matched against the index (optionally
//! restricted to one year), and answered by a generation model that may
//! only use the retrieved context.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────┐
//! │  PDF corpus │──▶│ Extract + Chunk  │──▶│  SQLite   │
//! │  YYYY_*.pdf │   │ + Embed (OpenAI) │   │  vectors  │
//! └─────────────┘   └──────────────────┘   └────┬─────┘
//!                                               │
//!                         ┌─────────────────────┤
//!                         ▼                     ▼
//!                    ┌──────────┐         ┌──────────┐
//!                    │   CLI    │         │   HTTP   │
//!                    │ (docqa)  │         │  (axum)  │
//!                    └──────────┘         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docqa init                        # create database
//! docqa ingest                      # index new or changed PDFs
//! docqa ask "What is polarization?" --year 2021
//! docqa serve                       # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`context`] | Shared application context and index gate |
//! | [`extract`] | PDF text extraction |
//! | [`ingest`] | Corpus ingestion pipeline |
//! | [`embedding`] | Embedding providers |
//! | [`generation`] | Generation providers |
//! | [`openai`] | OpenAI-compatible HTTP client with retry |
//! | [`sqlite_store`] | SQLite vector index |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod ask;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod openai;
pub mod server;
pub mod sqlite_store;
pub mod stats;

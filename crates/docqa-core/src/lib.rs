//! # docqa Core
//!
//! Shared, runtime-agnostic logic for docqa: data models, the overlapping
//! window chunker, filename year extraction, the refusal classifier, the
//! error taxonomy, the embedding/generation/index traits, and the
//! retrieval-augmented answer pipeline.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or HTTP clients.
//! Concrete providers and the SQLite index live in the `docqa` app crate.

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod models;
pub mod refusal;
pub mod store;
pub mod year;

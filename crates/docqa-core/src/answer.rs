//! Question answering over the vector index.
//!
//! [`answer`] runs the full query pipeline for one [`AskRequest`]:
//!
//! ```text
//! validate → embed question → search(top_k, year) ─┬─ 0 hits → not_found
//!                                                  └─ context → generate
//!                                                        ├─ refusal → not_found
//!                                                        ├─ error   → generation_unavailable
//!                                                        └─ answer  → answered + sources
//! ```
//!
//! Validation happens before any external call. Embedding and index
//! failures are returned as [`QaError`]; a generation failure still yields
//! an [`Answer`] carrying the retrieved sources.

use std::collections::HashSet;

use crate::embedding::{embed_query, Embedder};
use crate::error::{QaError, ValidationError};
use crate::generation::{Generator, Prompt};
use crate::models::{Answer, AnswerStatus, AskRequest, ScoredEntry, Source, YearFilter};
use crate::refusal::RefusalClassifier;
use crate::store::VectorIndex;

/// Fixed response when no relevant context exists.
pub const NOT_FOUND_ANSWER: &str =
    "I couldn't find relevant information in the documents to answer your question.";

/// Fixed response when context was retrieved but the model call failed.
pub const GENERATION_UNAVAILABLE_ANSWER: &str =
    "The answer could not be generated right now. The most relevant document excerpts are listed as sources.";

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Tunables of the query pipeline.
#[derive(Debug, Clone)]
pub struct AnswerParams {
    pub top_k: usize,
    pub max_context_chars: usize,
    pub preview_chars: usize,
    pub max_question_chars: usize,
    pub refusal: RefusalClassifier,
}

impl Default for AnswerParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_context_chars: 12_000,
            preview_chars: 200,
            max_question_chars: 2_000,
            refusal: RefusalClassifier::default(),
        }
    }
}

/// Answer `request` from the indexed documents.
pub async fn answer(
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    params: &AnswerParams,
    request: &AskRequest,
) -> Result<Answer, QaError> {
    let question = validate(request, params)?;
    let filter = request.year.map(|year| YearFilter { year });

    let query_vec = embed_query(embedder, question).await?;
    let hits = index.search(&query_vec, params.top_k, filter).await?;
    tracing::debug!(hits = hits.len(), year = ?request.year, "retrieved context");

    let reply = |text: &str, sources: Vec<Source>, status| Answer {
        question: question.to_string(),
        answer: text.to_string(),
        sources,
        year_filter: request.year,
        status,
    };

    if hits.is_empty() {
        return Ok(reply(NOT_FOUND_ANSWER, Vec::new(), AnswerStatus::NotFound));
    }

    let used = select_context(&hits, params.max_context_chars);
    let context = build_context(used, params.max_context_chars);
    let sources = build_sources(used, params.preview_chars);

    let prompt = Prompt::grounded(&context, question);
    match generator.generate(&prompt).await {
        Ok(text) if params.refusal.is_refusal(&text) => {
            tracing::debug!("model declined to answer from context");
            Ok(reply(text.trim(), Vec::new(), AnswerStatus::NotFound))
        }
        Ok(text) => Ok(reply(text.trim(), sources, AnswerStatus::Answered)),
        Err(e) => {
            tracing::warn!(error = %e, model = generator.model_name(), "generation failed");
            Ok(reply(
                GENERATION_UNAVAILABLE_ANSWER,
                sources,
                AnswerStatus::GenerationUnavailable,
            ))
        }
    }
}

/// Check the request and return the trimmed question.
pub fn validate<'a>(
    request: &'a AskRequest,
    params: &AnswerParams,
) -> Result<&'a str, ValidationError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ValidationError::EmptyQuestion);
    }
    if question.chars().count() > params.max_question_chars {
        return Err(ValidationError::QuestionTooLong {
            max: params.max_question_chars,
        });
    }
    Ok(question)
}

/// The ranked prefix of `hits` that fits in `max_chars` once joined.
///
/// Always keeps the top hit; it is truncated later if it alone is too long.
fn select_context(hits: &[ScoredEntry], max_chars: usize) -> &[ScoredEntry] {
    let sep = CONTEXT_SEPARATOR.chars().count();
    let mut total = 0;
    let mut keep = 0;
    for (i, hit) in hits.iter().enumerate() {
        let len = hit.text.chars().count() + if i == 0 { 0 } else { sep };
        if i > 0 && total + len > max_chars {
            break;
        }
        total += len;
        keep = i + 1;
    }
    &hits[..keep]
}

fn build_context(used: &[ScoredEntry], max_chars: usize) -> String {
    let joined = used
        .iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);
    truncate_chars(&joined, max_chars).to_string()
}

fn build_sources(used: &[ScoredEntry], preview_chars: usize) -> Vec<Source> {
    let mut seen = HashSet::new();
    used.iter()
        .filter(|h| seen.insert(h.metadata.filename.as_str()))
        .map(|h| Source {
            filename: h.metadata.filename.clone(),
            year: h.metadata.year,
            preview: preview(&h.text, preview_chars),
        })
        .collect()
}

/// First `max` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max: usize) -> String {
    let head = truncate_chars(text, max);
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head.to_string()
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

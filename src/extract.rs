//! PDF text extraction.
//!
//! [`PdfExtractor`] turns a PDF on disk into an [`ExtractedDocument`]:
//! cleaned UTF-8 text plus the publication year derived from the filename.
//! Parsing runs on the blocking pool; a parser panic on a malformed file is
//! reported as an [`ExtractionError::Pdf`] for that file only.

use std::path::Path;

use docqa_core::error::ExtractionError;
use docqa_core::year::YearExtractor;

/// Text and metadata of one source document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Path relative to the corpus root, `/`-separated.
    pub filename: String,
    pub text: String,
    pub year: Option<i32>,
}

#[derive(Default)]
pub struct PdfExtractor {
    years: YearExtractor,
}

impl PdfExtractor {
    pub fn new(years: YearExtractor) -> Self {
        Self { years }
    }

    pub async fn extract(
        &self,
        path: &Path,
        filename: &str,
    ) -> Result<ExtractedDocument, ExtractionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ExtractionError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ExtractionError::Pdf {
                filename: filename.to_string(),
                message: if e.is_panic() {
                    "parser panicked on malformed input".to_string()
                } else {
                    e.to_string()
                },
            })?
            .map_err(|e| ExtractionError::Pdf {
                filename: filename.to_string(),
                message: e.to_string(),
            })?;

        let text = clean_text(&raw);
        if text.is_empty() {
            return Err(ExtractionError::Empty(filename.to_string()));
        }

        Ok(ExtractedDocument {
            filename: filename.to_string(),
            year: self.years.extract(filename),
            text,
        })
    }
}

/// Drop control characters other than newline and tab, then trim.
pub fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}

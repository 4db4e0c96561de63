//! Fixed-size overlapping window chunker.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters,
//! where each chunk repeats the last `overlap` characters of its
//! predecessor. Windows are measured in Unicode scalar values and sliced on
//! `char` boundaries, so multibyte text is never split mid-character.
//!
//! Each chunk receives a deterministic UUIDv5 derived from its document
//! filename and start offset; re-chunking unchanged text yields the same
//! ids, which is what makes index upserts idempotent.
//!
//! # Algorithm
//!
//! 1. `step = chunk_size - overlap`.
//! 2. Chunk *i* covers characters `[i * step, min(i * step + chunk_size, len))`.
//! 3. Stop after the chunk that reaches the end of the text.
//! 4. Text of length `<= chunk_size` (including empty text) yields one chunk.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::{chunk_text, ChunkParams};
//!
//! let text = "a".repeat(2_500);
//! let chunks = chunk_text("2021_report.pdf", Some(2021), &text, ChunkParams::default());
//! assert_eq!(chunks.len(), 3);
//! assert_eq!((chunks[1].start, chunks[1].end), (800, 1_800));
//! assert_eq!((chunks[2].start, chunks[2].end), (1_600, 2_500));
//! ```

use uuid::Uuid;

use crate::models::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 200;

/// Window parameters, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkParams {
    /// Rejects parameters that would never advance through the text.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }
        if self.overlap >= self.chunk_size {
            return Err(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            ));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

/// Split `text` into overlapping windows.
///
/// Returns chunks with contiguous indices starting at 0 and monotonically
/// increasing offsets. Every chunk inherits `filename` and `year`.
pub fn chunk_text(filename: &str, year: Option<i32>, text: &str, params: ChunkParams) -> Vec<Chunk> {
    // Byte offset of every char start, plus the end of the string, so that
    // character offset `c` maps to `boundaries[c]`.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let chunk_size = params.chunk_size.max(1);
    if char_len <= chunk_size {
        return vec![make_chunk(filename, year, 0, 0, char_len, text)];
    }

    let step = params.step();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0i64;

    loop {
        let end = (start + chunk_size).min(char_len);
        let piece = &text[boundaries[start]..boundaries[end]];
        chunks.push(make_chunk(filename, year, index, start, end, piece));
        if end == char_len {
            break;
        }
        start += step;
        index += 1;
    }

    chunks
}

/// Rebuild the original text from consecutive chunks by dropping the
/// repeated `overlap` prefix of every chunk after the first.
pub fn reassemble(chunks: &[Chunk], overlap: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            out.push_str(&chunk.text);
        } else {
            out.extend(chunk.text.chars().skip(overlap));
        }
    }
    out
}

/// Deterministic chunk identity from its owning document and start offset.
pub fn chunk_id(filename: &str, start: usize) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("docqa:{}#{}", filename, start).as_bytes(),
    )
    .to_string()
}

fn make_chunk(
    filename: &str,
    year: Option<i32>,
    index: i64,
    start: usize,
    end: usize,
    text: &str,
) -> Chunk {
    Chunk {
        id: chunk_id(filename, start),
        filename: filename.to_string(),
        year,
        chunk_index: index,
        start,
        end,
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(chunk_size: usize, overlap: usize) -> ChunkParams {
        ChunkParams {
            chunk_size,
            overlap,
        }
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("a.pdf", None, "Hello, world!", ChunkParams::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 13));
    }

    #[test]
    fn test_empty_text_single_chunk() {
        let chunks = chunk_text("a.pdf", None, "", ChunkParams::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
    }

    #[test]
    fn test_exactly_chunk_size_is_one_chunk() {
        let text = "x".repeat(1000);
        let chunks = chunk_text("a.pdf", None, &text, ChunkParams::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn test_window_starts_and_lengths() {
        let text: String = (0..2_345).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text("a.pdf", None, &text, ChunkParams::default());
        let starts: Vec<usize> = chunks.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0, 800, 1600]);
        assert_eq!(chunks[0].text.chars().count(), 1000);
        assert_eq!(chunks[1].text.chars().count(), 1000);
        assert_eq!(chunks[2].text.chars().count(), 745);
        assert_eq!(chunks.last().unwrap().end, 2_345);
    }

    #[test]
    fn test_consecutive_chunks_overlap_exactly() {
        let text: String = (0..5_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text("a.pdf", None, &text, ChunkParams::default());
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end - pair[1].start, 200);
            assert!(pair[1].start > pair[0].start);
            let tail: String = pair[0].text.chars().skip(800).collect();
            let head: String = pair[1].text.chars().take(200).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_reassemble_reconstructs_original() {
        for len in [0usize, 1, 999, 1000, 1001, 1799, 1800, 1801, 4321] {
            let text: String = (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
            let chunks = chunk_text("a.pdf", None, &text, ChunkParams::default());
            assert_eq!(reassemble(&chunks, 200), text, "length {}", len);
        }
    }

    #[test]
    fn test_multibyte_text_is_never_split_mid_char() {
        let text = "é日本語🦀".repeat(300);
        let chunks = chunk_text("a.pdf", None, &text, params(100, 30));
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= 100);
        }
        assert_eq!(reassemble(&chunks, 30), text);
    }

    #[test]
    fn test_zero_overlap() {
        let text = "abcdefghij";
        let chunks = chunk_text("a.pdf", None, text, params(3, 0));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abc", "def", "ghi", "j"]);
    }

    #[test]
    fn test_indices_and_metadata_inherited() {
        let text = "y".repeat(3_000);
        let chunks = chunk_text("2019_paper.pdf", Some(2019), &text, ChunkParams::default());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
            assert_eq!(c.filename, "2019_paper.pdf");
            assert_eq!(c.year, Some(2019));
        }
    }

    #[test]
    fn test_ids_are_deterministic_and_distinct() {
        let text = "z".repeat(3_000);
        let a = chunk_text("a.pdf", None, &text, ChunkParams::default());
        let b = chunk_text("a.pdf", None, &text, ChunkParams::default());
        let other = chunk_text("b.pdf", None, &text, ChunkParams::default());
        assert_eq!(a[1].id, b[1].id);
        assert_ne!(a[0].id, a[1].id);
        assert_ne!(a[0].id, other[0].id);
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        assert!(params(0, 0).validate().is_err());
        assert!(params(100, 100).validate().is_err());
        assert!(params(100, 150).validate().is_err());
        assert!(ChunkParams::default().validate().is_ok());
    }
}

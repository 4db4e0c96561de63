//! Shared fixtures for integration tests: deterministic providers, PDF
//! builders, and throwaway configs.

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docqa::config::Config;
use docqa::context::AppContext;
use docqa_core::embedding::Embedder;
use docqa_core::error::{EmbeddingError, GenerationError};
use docqa_core::generation::{Generator, Prompt};

pub const DIMS: usize = 64;

/// Bag-of-words embedder: each lowercase word increments one of `DIMS`
/// buckets chosen by an FNV-1a hash. Texts sharing words score higher.
pub struct HashEmbedder {
    calls: AtomicUsize,
    /// 1-based call numbers that fail.
    fail_on: Mutex<Vec<usize>>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(calls: &[usize]) -> Self {
        let e = Self::new();
        *e.fail_on.lock().unwrap() = calls.to_vec();
        e
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn hash_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in word.to_lowercase().bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        v[(h % DIMS as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.lock().unwrap().contains(&call) {
            return Err(EmbeddingError::Unreachable(format!("injected failure on call {}", call)));
        }
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }
}

/// Always fails, as an unreachable embedding service would.
pub struct DownEmbedder;

#[async_trait]
impl Embedder for DownEmbedder {
    fn model_name(&self) -> &str {
        "down"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Unreachable("connection refused".to_string()))
    }
}

/// Replies with a fixed text and keeps the prompts it was given.
pub struct StaticGenerator {
    reply: String,
    pub prompts: Mutex<Vec<Prompt>>,
}

impl StaticGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Generator for StaticGenerator {
    fn model_name(&self) -> &str {
        "static"
    }
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        Ok(self.reply.clone())
    }
}

/// Single-page PDF with one text line per entry of `lines`.
pub fn pdf_with_lines(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
        Operation::new("TL", vec![Object::Integer(14)]),
        Operation::new("Td", vec![Object::Integer(40), Object::Integer(780)]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content stream"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize pdf");
    out
}

pub fn pdf_with_text(text: &str) -> Vec<u8> {
    pdf_with_lines(&[text])
}

/// A paragraph of roughly `words` words about `topic`.
pub fn paragraph(topic: &str, words: usize) -> String {
    (0..words)
        .map(|i| if i % 5 == 0 { topic.to_string() } else { format!("word{}", i) })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn write_pdf(dir: &Path, name: &str, text: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), pdf_with_text(text)).unwrap();
}

/// Config rooted in `root`: database under `data/`, corpus under `docs/`.
pub fn test_config(root: &Path) -> Config {
    let mut cfg = Config::minimal(root.join("data/docqa.sqlite"), root.join("docs"));
    cfg.embedding.batch_size = 4;
    cfg
}

pub async fn open_context(
    cfg: Config,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
) -> AppContext {
    AppContext::with_providers(cfg, embedder, generator)
        .await
        .expect("open context")
}

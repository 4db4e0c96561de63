//! Generation model abstraction.
//!
//! The answer pipeline builds a [`Prompt`] and hands it to a [`Generator`].
//! Concrete chat-completion clients live in the `docqa` app crate.

use async_trait::async_trait;

use crate::error::GenerationError;

/// Instruction that constrains the model to the supplied context.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on provided \
document context. Use only the information from the provided context to answer questions. If the \
context doesn't contain relevant information, say so instead of guessing.";

/// A single-turn prompt for the generation model.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Build the constrained prompt for `question` over `context`.
    pub fn grounded(context: &str, question: &str) -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user: format!("Context:\n{}\n\nQuestion: {}", context, question),
        }
    }
}

/// An external text generation model.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-3.5-turbo"`).
    fn model_name(&self) -> &str;
    /// Produce the answer text for `prompt`.
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError>;
}

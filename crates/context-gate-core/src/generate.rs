//! Generation capability trait.
//!
//! Concrete generators (OpenAI chat completions, Ollama) live in the
//! `context-gate` app crate.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for language-model backends.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Answer `question` from the ordered `context` strings.
    async fn generate(&self, question: &str, context: &[String]) -> Result<String>;
}

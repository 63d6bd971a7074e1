//! Deterministic capability doubles for tests
//!
//! Replace the hosted embedding, completion, and translation services so
//! session and API tests exercise the real chunking/indexing/prompting
//! pipeline without network access.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;
use askdoc_core::{AskdocError, CompletionClient, Result};
use askdoc_retrieval::EmbeddingClient;

use crate::Translator;

// ============================================================================
// Embedding
// ============================================================================

/// Bag-of-words embedder: each lowercase word hashes into a fixed bucket.
///
/// Deterministic across runs, so texts sharing words land near each other
/// under cosine distance and retrieval behaves like the real thing on
/// small fixtures.
pub struct MockEmbedding {
    dimension: usize,
}

impl MockEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ============================================================================
// Completion
// ============================================================================

/// Completion double that echoes the question and retrieved context back.
///
/// With an empty context block it answers with the refusal phrase the real
/// prompt instructs the model to use, so the not-in-context contract is
/// observable in tests. Every received prompt is recorded.
pub struct MockCompletion {
    prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self::new()
    }
}

fn section<'a>(prompt: &'a str, tag: &str) -> &'a str {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let Some(start) = prompt.find(&open) else {
        return "";
    };
    let body = &prompt[start + open.len()..];
    match body.find(&close) {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

#[async_trait]
impl CompletionClient for MockCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());

        let context = section(prompt, "context");
        let question = section(prompt, "question");

        if context.is_empty() {
            return Ok("answer is not available in the context".to_string());
        }

        Ok(format!("{question} | {context}"))
    }
}

/// Completion double that is always down
pub struct FailingCompletion;

#[async_trait]
impl CompletionClient for FailingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(AskdocError::CompletionUnavailable(
            "mock completion outage".to_string(),
        ))
    }
}

// ============================================================================
// Translation
// ============================================================================

/// Translator double: known phrases translate via a fixed table, anything
/// translated out of English is tagged with its target language so tests
/// can observe that localization ran.
pub struct MockTranslator {
    phrases: HashMap<String, String>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self {
            phrases: HashMap::new(),
        }
    }

    pub fn with_phrase(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.phrases.insert(from.into(), to.into());
        self
    }
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _from: &str, to: &str) -> Result<String> {
        if to == "en" {
            return Ok(self
                .phrases
                .get(text)
                .cloned()
                .unwrap_or_else(|| text.to_string()));
        }
        Ok(format!("[{to}] {text}"))
    }
}

/// Translator double that is always down
pub struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(&self, _text: &str, _from: &str, _to: &str) -> Result<String> {
        Err(AskdocError::TranslationUnavailable(
            "mock translator outage".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedding_is_deterministic() {
        let embedder = MockEmbedding::new(32);
        let a = embedder.embed("the capital of france").await.unwrap();
        let b = embedder.embed("the capital of france").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_mock_embedding_shared_words_overlap() {
        let embedder = MockEmbedding::new(64);
        let question = embedder.embed("capital of France").await.unwrap();
        let relevant = embedder
            .embed("The capital of France is Paris.")
            .await
            .unwrap();
        let unrelated = embedder.embed("Rust borrow checker").await.unwrap();

        let dot = |x: &[f32], y: &[f32]| -> f32 { x.iter().zip(y).map(|(a, b)| a * b).sum() };
        assert!(dot(&question, &relevant) > dot(&question, &unrelated));
    }

    #[tokio::test]
    async fn test_mock_completion_refuses_without_context() {
        let completion = MockCompletion::new();
        let answer = completion
            .complete("<context>\n</context>\n\n<question>\nhm?\n</question>\n")
            .await
            .unwrap();
        assert_eq!(answer, "answer is not available in the context");
    }

    #[test]
    fn test_section_extraction() {
        let prompt = "<s>\nsys\n</s>\n\n<context>\nctx\n</context>\n\n<question>\nq\n</question>\n";
        assert_eq!(section(prompt, "context"), "ctx");
        assert_eq!(section(prompt, "question"), "q");
        assert_eq!(section(prompt, "missing"), "");
    }
}

//! Askdoc Chat - conversational retrieval-augmented answering
//!
//! A [`ChatSession`] owns one conversation: its message history and a
//! handle to the active vector index. Each question runs the same turn:
//! normalize language, embed, retrieve against an index snapshot, build a
//! bounded prompt, complete, translate back, append the turn.
//!
//! History appends are serialized per session, but no lock is ever held
//! across an embedding, completion, or translation call.

pub mod language;
pub mod llm;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use language::{
    Detection, HttpTranslator, LanguageDetector, LanguageNormalizer, RomanizedHindiRule,
    Translator, WhatlangDetector,
};
pub use llm::{create_completion_client, GeminiClient, OllamaClient, OpenAiClient};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use askdoc_core::{ChatConfig, CompletionClient, Message, Result};
use askdoc_retrieval::{EmbeddingClient, IndexHandle, ScoredChunk, VectorIndex};
use tokio::sync::Mutex;
use uuid::Uuid;

// ============================================================================
// Session State
// ============================================================================

/// Observable state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No index has been built yet; questions fail until ingestion
    Uninitialized,
    /// An index is active and no question is in flight
    Ready,
    /// At least one question is currently being answered
    Answering,
}

// ============================================================================
// Chat Session
// ============================================================================

/// One conversation: message history plus the active index.
///
/// Sessions are long-lived; there is no terminal state. Concurrent `ask`
/// calls are safe: each holds its own index snapshot and history clone, and
/// each appends exactly one turn.
pub struct ChatSession {
    id: Uuid,
    handle: IndexHandle,
    embedder: Arc<dyn EmbeddingClient>,
    completion: Arc<dyn CompletionClient>,
    normalizer: Option<Arc<LanguageNormalizer>>,
    history: Mutex<Vec<Message>>,
    in_flight: AtomicUsize,
    config: ChatConfig,
}

impl ChatSession {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        completion: Arc<dyn CompletionClient>,
        normalizer: Option<Arc<LanguageNormalizer>>,
        config: ChatConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle: IndexHandle::new(),
            embedder,
            completion,
            normalizer,
            history: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            config,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Publish a freshly built index as this session's active one.
    ///
    /// History survives re-ingestion unless the caller asks for a reset.
    pub async fn install_index(&self, index: VectorIndex, reset_history: bool) {
        self.handle.publish(index).await;
        if reset_history {
            self.history.lock().await.clear();
            tracing::info!(session = %self.id, "conversation history reset on re-ingestion");
        }
    }

    /// Answer one question against the active index and history.
    ///
    /// Fails with `EmptyIndex` before the first ingestion and with the
    /// corresponding `*Unavailable` error when an external capability is
    /// down. Translation failures degrade to the untranslated text instead
    /// of failing the turn.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let _guard = InFlightGuard::enter(&self.in_flight);

        // 1. Normalize the question's language (best-effort)
        let (query_text, source_lang) = match &self.normalizer {
            Some(normalizer) => normalizer.normalize(question).await,
            None => (question.to_string(), None),
        };

        // 2. Embed the (possibly translated) question; no lock held
        let query_vector = self.embedder.embed(&query_text).await?;

        // 3. Retrieve against a snapshot of the active index. The snapshot
        //    is ours for the whole turn even if ingestion swaps the index.
        let index = self.handle.snapshot().await?;
        let retrieved = index.query(&query_vector, self.config.retrieve_top_k);
        tracing::debug!(
            session = %self.id,
            retrieved = retrieved.len(),
            "retrieved context chunks"
        );

        // 4. Clone the prompt window of the history under a brief lock
        let window = self.history_window().await;

        // 5-6. Build the prompt and complete
        let prompt = self.build_prompt(&query_text, &retrieved, &window);
        tracing::debug!(session = %self.id, prompt_chars = prompt.len(), "calling completion");
        let answer = self.completion.complete(&prompt).await?;

        // 7. Translate the answer back to the question's language
        let answer = match (&self.normalizer, source_lang) {
            (Some(normalizer), Some(lang)) => normalizer.localize(&answer, &lang).await,
            _ => answer,
        };

        // 8. Append the turn under a brief lock
        {
            let mut history = self.history.lock().await;
            history.push(Message::user(question));
            history.push(Message::assistant(answer.clone()));
        }

        Ok(answer)
    }

    /// Construct the completion prompt for one turn.
    ///
    /// The refusal instruction ("answer is not available in the context")
    /// is a prompt-level contract: it tells the model what to say when the
    /// retrieved context does not cover the question. It is best-effort,
    /// not a guarantee enforced in code.
    fn build_prompt(&self, question: &str, retrieved: &[ScoredChunk], window: &[Message]) -> String {
        let mut builder = PromptBuilder::new().system(
            "Answer the question as detailed and structured as possible from the provided \
             context. Provide the answer in a conversational manner with clear sentences and \
             proper paragraph structure. If the answer is not in the provided context, just \
             say, \"answer is not available in the context\", and don't provide a wrong answer.",
        );

        let mut total = 0usize;
        for scored in retrieved {
            if total + scored.chunk.text.len() > self.config.max_context_chars {
                break;
            }
            total += scored.chunk.text.len();
            builder = builder.add_context(scored.chunk.text.as_str());
        }

        for message in window {
            builder = builder.add_history(message.role.to_string(), message.content.as_str());
        }

        builder.question(question).build()
    }

    /// Append a completed turn produced outside `ask` (the SQL sub-flow
    /// shares the session's conversational memory this way).
    pub async fn append_turn(&self, question: &str, answer: &str) {
        let mut history = self.history.lock().await;
        history.push(Message::user(question));
        history.push(Message::assistant(answer));
    }

    /// Prompt window of the history: the most recent turns, oldest first
    pub async fn history_window(&self) -> Vec<Message> {
        let history = self.history.lock().await;
        let keep = self.config.history_window * 2;
        let start = history.len().saturating_sub(keep);
        history[start..].to_vec()
    }

    /// Current session state
    pub async fn state(&self) -> SessionState {
        if !self.handle.is_ready().await {
            SessionState::Uninitialized
        } else if self.in_flight.load(Ordering::SeqCst) > 0 {
            SessionState::Answering
        } else {
            SessionState::Ready
        }
    }

    /// Full message history, oldest first
    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.clone()
    }

    /// Number of completed question/answer turns
    pub async fn turn_count(&self) -> usize {
        self.history.lock().await.len() / 2
    }

    /// Chunk count of the active index, if any
    pub async fn index_len(&self) -> Option<usize> {
        self.handle.snapshot().await.ok().map(|index| index.len())
    }
}

struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Prompt Builder
// ============================================================================

/// Builder for the sectioned completion prompt
pub struct PromptBuilder {
    system_instruction: String,
    context_sections: Vec<String>,
    history_lines: Vec<String>,
    question: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            system_instruction: String::new(),
            context_sections: Vec::new(),
            history_lines: Vec::new(),
            question: String::new(),
        }
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    pub fn add_history(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.history_lines
            .push(format!("{}: {}", role.into(), content.into()));
        self
    }

    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    pub fn build(self) -> String {
        let mut prompt = String::new();

        if !self.system_instruction.is_empty() {
            prompt.push_str("<s>\n");
            prompt.push_str(&self.system_instruction);
            prompt.push_str("\n</s>\n\n");
        }

        prompt.push_str("<context>\n");
        for section in &self.context_sections {
            prompt.push_str(section);
            prompt.push_str("\n\n");
        }
        prompt.push_str("</context>\n\n");

        if !self.history_lines.is_empty() {
            prompt.push_str("<history>\n");
            for line in &self.history_lines {
                prompt.push_str(line);
                prompt.push('\n');
            }
            prompt.push_str("</history>\n\n");
        }

        prompt.push_str("<question>\n");
        prompt.push_str(&self.question);
        prompt.push_str("\n</question>\n");

        prompt
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::testing::{MockCompletion, MockEmbedding, MockTranslator};
    use super::*;
    use askdoc_retrieval::{ChunkConfig, Chunker};

    fn session_with(
        completion: Arc<MockCompletion>,
        normalizer: Option<Arc<LanguageNormalizer>>,
        config: ChatConfig,
    ) -> ChatSession {
        ChatSession::new(
            Arc::new(MockEmbedding::new(64)),
            completion,
            normalizer,
            config,
        )
    }

    async fn ingest(session: &ChatSession, text: &str, reset: bool) -> usize {
        let chunker = Chunker::new(ChunkConfig {
            chunk_size: 100,
            overlap: 20,
        })
        .unwrap();
        let chunks = chunker.chunk_text(text);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedder = MockEmbedding::new(64);
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        let count = chunks.len();
        let index = VectorIndex::build(chunks, vectors).unwrap();
        session.install_index(index, reset).await;
        count
    }

    #[tokio::test]
    async fn test_ask_before_ingest_is_empty_index() {
        let session = session_with(
            Arc::new(MockCompletion::new()),
            None,
            ChatConfig::default(),
        );
        assert_eq!(session.state().await, SessionState::Uninitialized);

        let err = session.ask("anything?").await.unwrap_err();
        assert!(matches!(err, askdoc_core::AskdocError::EmptyIndex));
        assert!(session.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_answer_contains_fact() {
        let session = session_with(
            Arc::new(MockCompletion::new()),
            None,
            ChatConfig::default(),
        );
        ingest(&session, "The capital of France is Paris.", false).await;
        assert_eq!(session.state().await, SessionState::Ready);

        let answer = session.ask("What is the capital of France?").await.unwrap();
        assert!(answer.contains("Paris"));
        assert_eq!(session.turn_count().await, 1);
    }

    #[tokio::test]
    async fn test_empty_document_yields_refusal() {
        let session = session_with(
            Arc::new(MockCompletion::new()),
            None,
            ChatConfig::default(),
        );
        ingest(&session, "", false).await;

        let answer = session.ask("What is anything?").await.unwrap();
        assert_eq!(answer, "answer is not available in the context");
    }

    #[tokio::test]
    async fn test_reingestion_is_idempotent() {
        let session = session_with(
            Arc::new(MockCompletion::new()),
            None,
            ChatConfig::default(),
        );
        let text = "The capital of France is Paris. The capital of Italy is Rome. \
                    The capital of Spain is Madrid.";
        let first = ingest(&session, text, false).await;
        let answer_a = session.ask("What is the capital of Italy?").await.unwrap();

        let second = ingest(&session, text, false).await;
        let answer_b = session.ask("What is the capital of Italy?").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(session.index_len().await, Some(second));
        assert_eq!(answer_a, answer_b);
    }

    #[tokio::test]
    async fn test_history_survives_reingestion_unless_reset() {
        let session = session_with(
            Arc::new(MockCompletion::new()),
            None,
            ChatConfig::default(),
        );
        ingest(&session, "The capital of France is Paris.", false).await;
        session.ask("What is the capital of France?").await.unwrap();
        assert_eq!(session.turn_count().await, 1);

        ingest(&session, "The capital of Italy is Rome.", false).await;
        assert_eq!(session.turn_count().await, 1);

        ingest(&session, "The capital of Spain is Madrid.", true).await;
        assert_eq!(session.turn_count().await, 0);
    }

    #[tokio::test]
    async fn test_history_window_bounds_prompt() {
        let completion = Arc::new(MockCompletion::new());
        let config = ChatConfig {
            history_window: 2,
            ..Default::default()
        };
        let session = session_with(completion.clone(), None, config);
        ingest(&session, "The capital of France is Paris.", false).await;

        for i in 0..5 {
            session.ask(&format!("question number {i}?")).await.unwrap();
        }

        // all five turns are in the session record
        assert_eq!(session.turn_count().await, 5);

        // but the last prompt only carries the two most recent turns
        let prompts = completion.prompts();
        let last = prompts.last().unwrap();
        assert!(last.contains("question number 3?"));
        assert!(!last.contains("question number 0?"));
        assert!(!last.contains("question number 1?"));
    }

    #[tokio::test]
    async fn test_concurrent_asks_append_exactly_one_turn_each() {
        let session = Arc::new(session_with(
            Arc::new(MockCompletion::new()),
            None,
            ChatConfig::default(),
        ));
        ingest(&session, "The capital of France is Paris.", false).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                let question = format!("concurrent question {i}?");
                let answer = session.ask(&question).await.unwrap();
                (question, answer)
            }));
        }

        for handle in handles {
            let (question, answer) = handle.await.unwrap();
            // each answer was produced from its own question's prompt
            assert!(answer.contains(&question));
        }

        assert_eq!(session.history().await.len(), 16);
        assert_eq!(session.state().await, SessionState::Ready);
    }

    #[tokio::test]
    async fn test_hindi_question_is_translated_and_localized() {
        let question = "फ्रांस की राजधानी क्या है? कृपया मुझे विस्तार से बताइए।";
        let translator =
            MockTranslator::new().with_phrase(question, "What is the capital of France?");
        let normalizer = LanguageNormalizer::new(Arc::new(translator), "en", 0.0);
        let session = session_with(
            Arc::new(MockCompletion::new()),
            Some(Arc::new(normalizer)),
            ChatConfig::default(),
        );
        ingest(&session, "The capital of France is Paris.", false).await;

        let answer = session.ask(question).await.unwrap();
        // translated back into the detected language by the mock
        assert!(answer.starts_with("[hi] "));
        assert!(answer.contains("Paris"));
    }

    #[test]
    fn test_prompt_builder_sections() {
        let prompt = PromptBuilder::new()
            .system("Be helpful.")
            .add_context("Context passage A")
            .add_history("user", "earlier question")
            .add_history("assistant", "earlier answer")
            .question("What now?")
            .build();

        assert!(prompt.contains("<s>"));
        assert!(prompt.contains("Context passage A"));
        assert!(prompt.contains("user: earlier question"));
        assert!(prompt.contains("<question>\nWhat now?"));
    }

    #[test]
    fn test_prompt_builder_keeps_empty_context_block() {
        // the context block is always present so the refusal instruction
        // has something to refer to
        let prompt = PromptBuilder::new().question("q").build();
        assert!(prompt.contains("<context>"));
    }
}

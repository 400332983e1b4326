
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::memory::{ConversationMemory, Turn};
use crate::ollama::OllamaClient;
use crate::retriever::{RetrievedChunk, Retriever};

/// Returned when the model's response omits the answer field
pub const NO_ANSWER_FALLBACK: &str = "Could not generate a response.";

/// Swappable retriever handle shared between ingestion and answering
///
/// Ingestion replaces the inner value whole; readers clone it out and observe
/// either the old or the new binding, never a partially updated one.
pub type SharedRetriever = Arc<RwLock<Option<Retriever>>>;

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("No documents available. Please upload PDFs first.")]
    NoDocuments,
    #[error("Invalid request payload. 'question' field is missing.")]
    InvalidRequest,
    #[error("Answer generation failed: {0}")]
    Provider(#[source] anyhow::Error),
}

/// Answers questions by retrieving relevant chunks and prompting the
/// language model with chunks, conversation history, and the question
pub struct QaEngine {
    retriever: SharedRetriever,
    memory: ConversationMemory,
    client: Arc<OllamaClient>,
}

impl QaEngine {
    #[inline]
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self {
            retriever: Arc::new(RwLock::new(None)),
            memory: ConversationMemory::new(),
            client,
        }
    }

    /// The shared retriever handle, for ingestion to rebind
    #[inline]
    pub fn retriever_handle(&self) -> SharedRetriever {
        Arc::clone(&self.retriever)
    }

    /// Bind a freshly built retriever, replacing any previous one
    #[inline]
    pub async fn bind_retriever(&self, retriever: Retriever) {
        *self.retriever.write().await = Some(retriever);
        info!("Retriever rebound to fresh index snapshot");
    }

    #[inline]
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Answer a question against the currently bound index
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<String, AnswerError> {
        if question.trim().is_empty() {
            return Err(AnswerError::InvalidRequest);
        }

        let retriever = self
            .retriever
            .read()
            .await
            .clone()
            .ok_or(AnswerError::NoDocuments)?;

        debug!("Answering question (length: {})", question.len());

        let chunks = retriever
            .retrieve(question)
            .await
            .map_err(AnswerError::Provider)?;

        let history = self.memory.as_context();
        let prompt = compose_prompt(&chunks, &history, question);

        let answer = self
            .client
            .generate(&prompt)
            .map_err(AnswerError::Provider)?
            .unwrap_or_else(|| NO_ANSWER_FALLBACK.to_string());

        self.memory.append(question, &answer);
        info!("Answered question; conversation now has {} turns", self.memory.len());

        Ok(answer)
    }
}

/// Compose the model prompt from retrieved context, prior turns, and the
/// new question
///
/// History order is preserved; both retrieved context and history are always
/// present in the final prompt when available.
#[inline]
pub fn compose_prompt(chunks: &[RetrievedChunk], history: &[Turn], question: &str) -> String {
    let mut prompt = String::from(
        "Use the following pieces of context to answer the question at the end.\n\nContext:\n",
    );

    for chunk in chunks {
        prompt.push_str(&chunk.content);
        prompt.push_str("\n\n");
    }

    if !history.is_empty() {
        prompt.push_str("Conversation history:\n");
        for turn in history {
            let _ = writeln!(prompt, "Q: {}", turn.question);
            let _ = writeln!(prompt, "A: {}", turn.answer);
        }
        prompt.push('\n');
    }

    let _ = writeln!(prompt, "Question: {}", question);
    prompt.push_str("Answer:");

    prompt
}

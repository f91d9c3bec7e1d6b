//! Conversational retrieval: retrieve relevant chunks, compose the prompt,
//! delegate generation.
//!
//! The engine never touches the session history itself; the orchestration
//! layer appends the turn only after generation succeeds, so a failed turn
//! leaves history unchanged.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::Config;
use crate::history::SessionHistory;
use crate::index::VectorIndex;
use crate::llm::{ChatBackend, ChatMessage};
use crate::models::ScoredChunk;

const GROUNDED_SYSTEM_PROMPT: &str = "You are a document-grounded assistant. Answer the user's \
question using the excerpts from their uploaded documents provided below. If the excerpts do not \
contain the answer, say so instead of guessing.";

const FALLBACK_SYSTEM_PROMPT: &str = "You are a document-grounded assistant, but no documents \
have been uploaded yet. Tell the user you have no document-grounded knowledge to draw on, and \
that they should upload documents before asking about their content.";

/// Answer a question against the current index, or in degraded fallback
/// mode when no index exists (empty corpus). The model is called either
/// way; fallback is a functional mode, not an error.
pub async fn answer(
    config: &Config,
    backend: &dyn ChatBackend,
    question: &str,
    history: &SessionHistory,
    index: Option<&VectorIndex>,
) -> Result<String> {
    let retrieved = match index {
        Some(index) => {
            index
                .retrieve(&config.embedding, question, config.retrieval.top_k)
                .await
                .context("retrieval failed")?
        }
        None => {
            warn!("no index available; answering in fallback mode");
            Vec::new()
        }
    };

    let messages = build_messages(question, history, &retrieved, index.is_some());
    debug!(
        retrieved = retrieved.len(),
        prior_turns = history.len(),
        "requesting generation"
    );

    backend.complete(&messages).await.context("generation failed")
}

/// Compose the message sequence: system prompt (with retrieved excerpts
/// when grounded), then the full prior history in order, then the question.
fn build_messages(
    question: &str,
    history: &SessionHistory,
    retrieved: &[ScoredChunk],
    grounded: bool,
) -> Vec<ChatMessage> {
    let system = if grounded {
        let mut text = String::from(GROUNDED_SYSTEM_PROMPT);
        text.push_str("\n\nDocument excerpts:");
        for (i, scored) in retrieved.iter().enumerate() {
            text.push_str(&format!(
                "\n\n[{}] (from {})\n{}",
                i + 1,
                scored.chunk.document_id,
                scored.chunk.text
            ));
        }
        text
    } else {
        FALLBACK_SYSTEM_PROMPT.to_string()
    };

    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::system(system));
    for (q, a) in history.as_pairs() {
        messages.push(ChatMessage::user(q));
        messages.push(ChatMessage::assistant(a));
    }
    messages.push(ChatMessage::user(question));
    messages
}

//! Session orchestration: index lifecycle plus the ask flow.
//!
//! A [`Session`] owns the conversation history, the current vector index
//! (if any) and the fingerprint of the corpus it was built from. It is
//! created after the access gate passes and dropped when the surface
//! (REPL or server) shuts down; history does not survive it except via
//! explicit export.

use anyhow::Result;
use tracing::{info, warn};

use crate::chunk;
use crate::config::{Config, RebuildTrigger};
use crate::engine;
use crate::history::SessionHistory;
use crate::index::VectorIndex;
use crate::llm::ChatBackend;
use crate::store::DocumentStore;

pub struct Session {
    history: SessionHistory,
    index: Option<VectorIndex>,
    /// Set once the first build decision has been made, even when the
    /// corpus was empty; `None` means "never looked".
    built_from: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            history: SessionHistory::new(),
            index: None,
            built_from: None,
        }
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Bring the index in line with the rebuild policy.
    ///
    /// `OnChange` fingerprints the document set and rebuilds only when it
    /// differs from what the current index was built from. `SessionStart`
    /// builds once and never looks again within this session.
    ///
    /// An empty corpus never reaches the index builder; it clears the
    /// index and the session answers in fallback mode.
    pub async fn ensure_index(&mut self, config: &Config, store: &DocumentStore) -> Result<()> {
        match config.index.rebuild {
            RebuildTrigger::SessionStart => {
                if self.built_from.is_some() {
                    return Ok(());
                }
            }
            RebuildTrigger::OnChange => {}
        }

        let fingerprint = store.fingerprint()?;
        if self.built_from.as_deref() == Some(fingerprint.as_str()) {
            return Ok(());
        }

        let documents = store.load_all()?;
        let chunks = chunk::split_documents(&documents, &config.chunking);

        if chunks.is_empty() {
            warn!("document corpus is empty; session runs in fallback mode");
            self.index = None;
            self.built_from = Some(fingerprint);
            return Ok(());
        }

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "rebuilding vector index"
        );
        let index = VectorIndex::build(&config.embedding, chunks).await?;
        self.index = Some(index);
        self.built_from = Some(fingerprint);
        Ok(())
    }

    /// One full turn: ensure the index, answer, then record the turn.
    ///
    /// On any failure the history is left unchanged; the error surfaces to
    /// the caller and the session remains usable.
    pub async fn ask(
        &mut self,
        config: &Config,
        store: &DocumentStore,
        backend: &dyn ChatBackend,
        question: &str,
    ) -> Result<String> {
        self.ensure_index(config, store).await?;

        let answer = engine::answer(
            config,
            backend,
            question,
            &self.history,
            self.index.as_ref(),
        )
        .await?;

        self.history.append(question, answer.clone());
        Ok(answer)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

//! In-memory vector index over the current chunk set.
//!
//! Built fresh from the corpus whenever the rebuild trigger fires; never
//! persisted. Retrieval embeds the query and ranks every entry by cosine
//! similarity, most-similar first, with a deterministic tie-break on
//! (document id, offset).

use anyhow::{bail, Result};
use tracing::info;

use crate::config::EmbeddingConfig;
use crate::embedding;
use crate::models::{Chunk, ScoredChunk};

#[derive(Debug)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every chunk and build the index.
    ///
    /// Errors on an empty chunk set; callers are expected to check for an
    /// empty corpus first and run in fallback mode instead.
    pub async fn build(config: &EmbeddingConfig, chunks: Vec<Chunk>) -> Result<Self> {
        if chunks.is_empty() {
            bail!("index build: empty chunk set");
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(config.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let mut batch_vectors = embedding::embed_texts(config, &texts).await?;
            if batch_vectors.len() != batch.len() {
                bail!(
                    "index build: provider returned {} vectors for {} chunks",
                    batch_vectors.len(),
                    batch.len()
                );
            }
            vectors.append(&mut batch_vectors);
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        info!(
            chunks = entries.len(),
            model = %config.model,
            "vector index built"
        );

        Ok(Self { entries })
    }

    /// Build from precomputed (chunk, vector) pairs. Test seam; retrieval
    /// behaves identically to an embedded build.
    #[cfg(test)]
    fn from_entries(entries: Vec<(Chunk, Vec<f32>)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(chunk, vector)| IndexEntry { chunk, vector })
                .collect(),
        }
    }

    /// Retrieve the top-`k` chunks for a query, most similar first.
    pub async fn retrieve(
        &self,
        config: &EmbeddingConfig,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vec = embedding::embed_query(config, query).await?;
        Ok(self.rank(&query_vec, k))
    }

    /// Rank entries against an already-embedded query vector.
    fn rank(&self, query_vec: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: embedding::cosine_similarity(query_vec, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
                .then_with(|| a.chunk.offset.cmp(&b.chunk.offset))
        });
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(doc: &str, index: usize, text: &str, offset: usize) -> Chunk {
        Chunk {
            document_id: doc.to_string(),
            chunk_index: index,
            text: text.to_string(),
            offset,
            length: text.len(),
        }
    }

    #[test]
    fn rank_orders_most_similar_first() {
        let index = VectorIndex::from_entries(vec![
            (chunk("a.txt", 0, "east", 0), vec![1.0, 0.0]),
            (chunk("a.txt", 1, "north", 800), vec![0.0, 1.0]),
            (chunk("b.txt", 0, "northeast", 0), vec![0.7, 0.7]),
        ]);

        let results = index.rank(&[1.0, 0.0], 3);
        assert_eq!(results[0].chunk.text, "east");
        assert_eq!(results[1].chunk.text, "northeast");
        assert_eq!(results[2].chunk.text, "north");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn rank_truncates_to_k() {
        let entries = (0..10)
            .map(|i| (chunk("a.txt", i, &format!("c{}", i), i * 800), vec![1.0, i as f32]))
            .collect();
        let index = VectorIndex::from_entries(entries);
        assert_eq!(index.rank(&[1.0, 0.0], 4).len(), 4);
    }

    #[test]
    fn rank_ties_break_deterministically() {
        let index = VectorIndex::from_entries(vec![
            (chunk("b.txt", 0, "same", 0), vec![1.0, 0.0]),
            (chunk("a.txt", 1, "same", 800), vec![1.0, 0.0]),
            (chunk("a.txt", 0, "same", 0), vec![1.0, 0.0]),
        ]);
        let results = index.rank(&[1.0, 0.0], 3);
        assert_eq!(results[0].chunk.document_id, "a.txt");
        assert_eq!(results[0].chunk.offset, 0);
        assert_eq!(results[1].chunk.document_id, "a.txt");
        assert_eq!(results[1].chunk.offset, 800);
        assert_eq!(results[2].chunk.document_id, "b.txt");
    }

    #[tokio::test]
    async fn build_rejects_empty_chunk_set() {
        let config = crate::config::EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dims: 2,
            batch_size: 64,
            max_retries: 0,
            timeout_secs: 1,
            url: None,
        };
        let err = VectorIndex::build(&config, Vec::new()).await.unwrap_err();
        assert!(err.to_string().contains("empty chunk set"));
    }
}

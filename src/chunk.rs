//! Sliding-window text chunker.
//!
//! Splits document text into fixed-size [`Chunk`]s of `chunk_size`
//! characters with `chunk_overlap` characters shared between consecutive
//! chunks of the same document. The overlap keeps context continuous across
//! chunk boundaries for retrieval.
//!
//! Sizes are counted in Unicode scalar values; recorded offsets are byte
//! positions and always fall on UTF-8 boundaries. Splitting is a pure
//! function of the input text and the (size, overlap) parameters.

use crate::config::ChunkingConfig;
use crate::models::{Chunk, Document};

/// Split a whole document set. Chunk order follows document order, then
/// position within each document.
pub fn split_documents(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| split_text(&doc.id, &doc.content, config))
        .collect()
}

/// Split one document's text into overlapping windows.
///
/// Windows start at every multiple of `chunk_size - chunk_overlap` before
/// the end of the text, so a 2500-char document at 1000/200 yields four
/// chunks starting at 0, 800, 1600 and 2400. Empty or whitespace-only text
/// yields no chunks; the final window may be shorter than `chunk_size`.
pub fn split_text(document_id: &str, text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let size = config.chunk_size;
    let step = size - config.chunk_overlap;

    if text.trim().is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start_char = 0usize;

    while start_char < total_chars {
        let end_char = (start_char + size).min(total_chars);
        let start = boundaries[start_char];
        let end = boundaries[end_char];

        chunks.push(Chunk {
            document_id: document_id.to_string(),
            chunk_index: chunks.len(),
            text: text[start..end].to_string(),
            offset: start,
            length: end - start,
        });

        start_char += step;
    }

    chunks
}

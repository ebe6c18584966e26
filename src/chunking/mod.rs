
use tracing::debug;

use crate::{RagError, Result};

/// A fixed-size segment of cleaned source text, the unit of retrieval.
///
/// Ids are unique within one ingested document and never change after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
}

/// Split text into fixed-size overlapping character windows.
///
/// The window advances by `max_chars - overlap` characters, so consecutive
/// chunks share `overlap` characters of context. Counting is by `char`, never
/// by byte, so multi-byte Bangla text is split on valid boundaries.
#[inline]
pub fn chunk_by_chars(text: &str, max_chars: usize, overlap: usize) -> Result<Vec<Chunk>> {
    if max_chars == 0 {
        return Err(RagError::Config(
            "chunk size must be at least 1 character".to_string(),
        ));
    }
    if overlap >= max_chars {
        return Err(RagError::Config(format!(
            "chunk overlap ({overlap}) must be smaller than the chunk size ({max_chars})"
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let stride = max_chars - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let chunk_text: String = chars[start..end].iter().collect();
        chunks.push(Chunk {
            id: format!("chunk_{:04}", chunks.len()),
            text: chunk_text,
        });
        start += stride;
    }

    debug!(
        "Chunked {} characters into {} chunks (max {}, overlap {})",
        chars.len(),
        chunks.len(),
        max_chars,
        overlap
    );

    Ok(chunks)
}


use serde::Serialize;
use tracing::debug;

use crate::Result;
use crate::embeddings::Embedder;
use crate::vector_store::{FlatIndex, MetadataRecord, l2_normalize};

/// One scored retrieval hit with its full, untruncated chunk text.
///
/// Scores are inner-product similarities over normalized vectors, so they are
/// cosine similarities in [-1, 1].
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedContext {
    pub id: String,
    pub score: f32,
    pub text: String,
}

/// k-nearest-neighbor retrieval over a loaded index and its metadata.
///
/// Normalizing the query vector happens here, once, and nowhere else: the
/// index never normalizes, and the embedding adapter returns raw vectors.
pub struct Retriever<'a> {
    index: &'a FlatIndex,
    metadata: &'a [MetadataRecord],
}

impl<'a> Retriever<'a> {
    #[inline]
    pub fn new(index: &'a FlatIndex, metadata: &'a [MetadataRecord]) -> Self {
        Self { index, metadata }
    }

    /// Embed the query, search the index, and resolve metadata for each hit.
    ///
    /// Tolerates any `top_k >= 1`; asking for more hits than the index holds
    /// returns every indexed chunk. Embedding and index errors propagate
    /// unchanged.
    #[inline]
    pub fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<RetrievedContext>> {
        let mut query_vector = embedder.embed_query(query)?;
        l2_normalize(&mut query_vector);

        let hits = self.index.search(&query_vector, top_k)?;

        let contexts = hits
            .into_iter()
            .filter_map(|(position, score)| {
                self.metadata.get(position).map(|record| RetrievedContext {
                    id: record.chunk_id.clone(),
                    score,
                    text: record.text.clone(),
                })
            })
            .collect::<Vec<_>>();

        debug!(
            "Retrieved {} contexts for query of {} characters (top_k = {})",
            contexts.len(),
            query.chars().count(),
            top_k
        );

        Ok(contexts)
    }
}

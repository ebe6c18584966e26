// Embedding service adapters.
// The retrieval core only sees the `Embedder` trait; shape quirks of concrete
// backends are resolved inside the adapters.

pub mod hf;

pub use hf::{FeatureExtraction, HfClient};

use crate::Result;

/// An opaque vector-producing service.
///
/// Implementations must return sentence-level vectors; backends that produce
/// per-token vectors average them before returning (see
/// [`FeatureExtraction::into_sentence_vector`]). Vectors are returned raw,
/// not normalized; normalization is the retriever's responsibility.
pub trait Embedder {
    /// Embed one query string.
    fn embed_query(&self, query: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::{RagError, Result};

/// Flat inner-product similarity index over L2-normalized vectors.
///
/// Position in the index is the sole identity key; it correlates 1:1 with the
/// ordinals of the companion metadata file. The index is built once, persisted,
/// and read-only afterwards. Rebuilding means building a new index and swapping
/// the loaded artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

/// One metadata record, stored at the same ordinal position as its vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub chunk_id: String,
    pub text: String,
}

impl FlatIndex {
    /// Build an index from a batch of embedding vectors.
    ///
    /// Vectors must already be L2-normalized by the caller; no normalization
    /// happens here. All vectors must share one dimension.
    #[inline]
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Err(RagError::IndexIntegrity(
                "cannot build an index from zero vectors".to_string(),
            ));
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(RagError::IndexIntegrity(
                "cannot build an index from zero-dimensional vectors".to_string(),
            ));
        }

        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(RagError::IndexIntegrity(format!(
                    "vector at position {} has dimension {} but the index dimension is {}",
                    position,
                    vector.len(),
                    dimension
                )));
            }
        }

        debug!(
            "Built flat index with {} vectors of dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Self { dimension, vectors })
    }

    /// Number of vectors in the index.
    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension shared by all indexed vectors.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Exact k-nearest-neighbor search by inner product.
    ///
    /// Returns at most `k` `(position, similarity)` pairs sorted by descending
    /// similarity; ties break by ascending position so identical inputs always
    /// produce identical output. The query must be pre-normalized by the
    /// caller for the scores to be cosine similarities.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, dot(vector, query)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored)
    }

    /// Persist the index as a JSON artifact.
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string(self)
            .map_err(|e| RagError::IndexIntegrity(format!("failed to serialize index: {e}")))?;
        fs::write(path, payload)?;
        info!("Wrote index with {} vectors to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a previously saved index, re-validating its internal consistency.
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let payload = fs::read_to_string(path)?;
        let index: Self = serde_json::from_str(&payload).map_err(|e| {
            RagError::IndexIntegrity(format!("failed to parse index file {}: {e}", path.display()))
        })?;

        if index.vectors.is_empty() {
            return Err(RagError::IndexIntegrity(format!(
                "index file {} contains no vectors",
                path.display()
            )));
        }
        if index.vectors.iter().any(|v| v.len() != index.dimension) {
            return Err(RagError::IndexIntegrity(format!(
                "index file {} contains vectors that do not match its declared dimension {}",
                path.display(),
                index.dimension
            )));
        }

        Ok(index)
    }
}

/// Load the index and its companion metadata as a single versioned unit.
///
/// The two artifacts are only meaningful together: metadata records are
/// resolved by index position, so a length mismatch (or a missing file) is an
/// integrity error rather than an IO error.
#[inline]
pub fn load_artifacts(index_path: &Path, meta_path: &Path) -> Result<(FlatIndex, Vec<MetadataRecord>)> {
    if !index_path.exists() || !meta_path.exists() {
        return Err(RagError::IndexIntegrity(format!(
            "index ({}) and metadata ({}) must be present together; run ingest first",
            index_path.display(),
            meta_path.display()
        )));
    }

    let index = FlatIndex::load(index_path)?;
    let metadata = load_metadata(meta_path)?;

    if metadata.len() != index.len() {
        return Err(RagError::IndexIntegrity(format!(
            "metadata has {} records but the index has {} vectors",
            metadata.len(),
            index.len()
        )));
    }

    info!(
        "Loaded index ({} vectors, dimension {}) and metadata from {}",
        index.len(),
        index.dimension(),
        index_path.display()
    );

    Ok((index, metadata))
}

/// Persist metadata records positionally aligned with an index.
#[inline]
pub fn save_metadata(records: &[MetadataRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string(records)
        .map_err(|e| RagError::IndexIntegrity(format!("failed to serialize metadata: {e}")))?;
    fs::write(path, payload)?;
    Ok(())
}

fn load_metadata(path: &Path) -> Result<Vec<MetadataRecord>> {
    let payload = fs::read_to_string(path)?;
    serde_json::from_str(&payload).map_err(|e| {
        RagError::IndexIntegrity(format!(
            "failed to parse metadata file {}: {e}",
            path.display()
        ))
    })
}

/// L2-normalize a vector in place. Zero vectors are left unchanged.
#[inline]
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector
        .iter()
        .fold(0.0f32, |acc, v| v.mul_add(*v, acc))
        .sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).fold(0.0f32, |acc, (x, y)| x.mul_add(*y, acc))
}

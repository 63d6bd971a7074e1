//! In-memory vector index with atomic snapshot publication
//!
//! One [`VectorIndex`] holds the chunks and embeddings of a single
//! ingestion batch and is immutable once built; re-ingesting replaces the
//! whole index. [`IndexHandle`] publishes built indexes behind an
//! `RwLock<Option<Arc<..>>>`: a query takes its own `Arc` snapshot up
//! front, so an ingestion that swaps the active index mid-query never
//! affects readers already in flight.

use std::sync::Arc;

use anyhow::anyhow;
use askdoc_core::{AskdocError, Chunk, Result};
use tokio::sync::RwLock;

/// A retrieved chunk with its distance to the query vector
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine distance; smaller is more similar
    pub distance: f32,
}

#[derive(Debug)]
struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// Immutable nearest-neighbor index over one ingestion batch
#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<Entry>,
}

impl VectorIndex {
    /// Build an index from paired chunks and embedding vectors.
    ///
    /// Chunks keep their ingestion order; queries tie-break on it.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(AskdocError::Other(anyhow!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                if vector.len() != dimension {
                    return Err(AskdocError::Other(anyhow!(
                        "inconsistent embedding dimension: expected {dimension}, got {}",
                        vector.len()
                    )));
                }
                let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                Ok(Entry {
                    chunk,
                    vector,
                    norm,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { dimension, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Exact k-nearest-neighbor query by cosine distance.
    ///
    /// Results are ordered by ascending distance; equal distances keep the
    /// original chunk order. At most `k` results are returned.
    pub fn query(&self, vector: &[f32], k: usize) -> Vec<ScoredChunk> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }
        if vector.len() != self.dimension {
            tracing::warn!(
                expected = self.dimension,
                got = vector.len(),
                "query vector dimension mismatch"
            );
            return Vec::new();
        }

        let query_norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

        let mut scored: Vec<(f32, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (cosine_distance(vector, query_norm, entry), i))
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(distance, i)| ScoredChunk {
                chunk: self.entries[i].chunk.clone(),
                distance,
            })
            .collect()
    }
}

fn cosine_distance(query: &[f32], query_norm: f32, entry: &Entry) -> f32 {
    if query_norm == 0.0 || entry.norm == 0.0 {
        return 1.0;
    }
    let dot: f32 = query.iter().zip(&entry.vector).map(|(a, b)| a * b).sum();
    1.0 - dot / (query_norm * entry.norm)
}

// ============================================================================
// Index Handle
// ============================================================================

/// Shared handle through which built indexes are published and queried.
///
/// `publish` swaps the active snapshot in one atomic reference update;
/// `snapshot` hands out an `Arc` the caller holds for the duration of its
/// query, independent of later swaps.
pub struct IndexHandle {
    active: RwLock<Option<Arc<VectorIndex>>>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
        }
    }

    /// Replace the active index wholesale.
    pub async fn publish(&self, index: VectorIndex) {
        let chunk_count = index.len();
        *self.active.write().await = Some(Arc::new(index));
        tracing::info!(chunks = chunk_count, "published new vector index");
    }

    /// Current snapshot, or [`AskdocError::EmptyIndex`] before the first
    /// publish.
    pub async fn snapshot(&self) -> Result<Arc<VectorIndex>> {
        self.active
            .read()
            .await
            .clone()
            .ok_or(AskdocError::EmptyIndex)
    }

    /// Whether an index has been published yet
    pub async fn is_ready(&self) -> bool {
        self.active.read().await.is_some()
    }
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(i: u32, text: &str) -> Chunk {
        Chunk::new(i, text)
    }

    fn build(vectors: Vec<Vec<f32>>) -> VectorIndex {
        let chunks = (0..vectors.len())
            .map(|i| chunk(i as u32, &format!("chunk {i}")))
            .collect();
        VectorIndex::build(chunks, vectors).unwrap()
    }

    #[test]
    fn test_build_rejects_count_mismatch() {
        let result = VectorIndex::build(vec![chunk(0, "a")], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_dimension_mismatch() {
        let result = VectorIndex::build(
            vec![chunk(0, "a"), chunk(1, "b")],
            vec![vec![1.0, 0.0], vec![1.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_query_orders_by_ascending_distance() {
        let index = build(vec![
            vec![0.0, 1.0], // orthogonal to query
            vec![1.0, 0.0], // identical direction
            vec![1.0, 1.0], // 45 degrees
        ]);

        let results = index.query(&[1.0, 0.0], 3);
        let order: Vec<u32> = results.iter().map(|r| r.chunk.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!(results[0].distance <= results[1].distance);
        assert!(results[1].distance <= results[2].distance);
    }

    #[test]
    fn test_query_truncates_to_k() {
        let index = build(vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
        assert_eq!(index.query(&[1.0], 2).len(), 2);
        assert!(index.query(&[1.0], 0).is_empty());
    }

    #[test]
    fn test_equal_distances_keep_chunk_order() {
        // all entries identical: distances tie, order must be 0,1,2
        let index = build(vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]]);
        let order: Vec<u32> = index
            .query(&[0.5, 0.5], 3)
            .iter()
            .map(|r| r.chunk.index)
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_vector_is_maximally_distant() {
        let index = build(vec![vec![0.0, 0.0], vec![1.0, 0.0]]);
        let results = index.query(&[1.0, 0.0], 2);
        assert_eq!(results[0].chunk.index, 1);
        assert_eq!(results[1].distance, 1.0);
    }

    #[test]
    fn test_query_dimension_mismatch_returns_empty() {
        let index = build(vec![vec![1.0, 0.0]]);
        assert!(index.query(&[1.0, 0.0, 0.0], 1).is_empty());
    }

    #[tokio::test]
    async fn test_handle_empty_before_first_publish() {
        let handle = IndexHandle::new();
        assert!(!handle.is_ready().await);
        assert!(matches!(
            handle.snapshot().await.unwrap_err(),
            AskdocError::EmptyIndex
        ));
    }

    #[tokio::test]
    async fn test_publish_replaces_wholesale() {
        let handle = IndexHandle::new();
        handle.publish(build(vec![vec![1.0], vec![2.0]])).await;
        assert_eq!(handle.snapshot().await.unwrap().len(), 2);

        handle.publish(build(vec![vec![1.0]])).await;
        assert_eq!(handle.snapshot().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_survives_swap() {
        let handle = IndexHandle::new();
        handle.publish(build(vec![vec![1.0], vec![2.0]])).await;

        let held = handle.snapshot().await.unwrap();
        handle.publish(build(vec![vec![1.0]])).await;

        // the reader's snapshot still sees the old index
        assert_eq!(held.len(), 2);
        assert_eq!(handle.snapshot().await.unwrap().len(), 1);
    }
}

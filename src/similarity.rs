//! Exact cosine-similarity ranking over in-memory chunk candidates.
//!
//! Every query scans the full candidate set (`O(N·D)`); there is no persistent
//! index structure. That is a deliberate simplicity trade-off for small
//! corpora, kept behind [`SimilarityIndex`] so an indexed implementation could
//! replace the scan without touching the pipeline.

/// A chunk candidate loaded from the store, carrying its embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// Chunk row id in the store.
    pub chunk_id: i64,
    /// Owning document id.
    pub document_id: i64,
    /// Human-readable source label (the owning document's file name).
    pub source: String,
    /// Zero-based position of the chunk within its document.
    pub chunk_index: usize,
    /// The chunk text.
    pub text: String,
    /// The embedding vector produced at ingest time.
    pub embedding: Vec<f32>,
}

/// A ranked search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: IndexedChunk,
    pub similarity: f32,
}

/// Brute-force cosine index over a fixed candidate set.
#[derive(Debug, Default)]
pub struct SimilarityIndex {
    candidates: Vec<IndexedChunk>,
}

impl SimilarityIndex {
    /// Builds an index over the given candidates.
    ///
    /// Candidates with an empty embedding are dropped up front; the store only
    /// hands out embedded chunks, but the index enforces it regardless.
    pub fn new(candidates: Vec<IndexedChunk>) -> Self {
        let candidates = candidates
            .into_iter()
            .filter(|candidate| !candidate.embedding.is_empty())
            .collect();
        Self { candidates }
    }

    /// Number of searchable candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns `true` when there is nothing to search.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Returns the top `k` candidates by descending cosine similarity.
    ///
    /// Ties preserve original candidate order (the sort is stable). Returns
    /// fewer than `k` results when fewer candidates exist.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .candidates
            .iter()
            .map(|candidate| ScoredChunk {
                chunk: candidate.clone(),
                similarity: cosine_similarity(query, &candidate.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity between two vectors.
///
/// Defined as `0.0` when the vectors differ in dimension or either has zero
/// norm; never an error. Magnitude is ignored by construction.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            chunk_id: id,
            document_id: 1,
            source: "doc.txt".to_string(),
            chunk_index: id as usize,
            text: format!("chunk {id}"),
            embedding,
        }
    }

    #[test]
    fn cosine_of_vector_with_itself_is_one() {
        let v = vec![0.3, -1.2, 4.5, 0.01];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6, "got {sim}");
    }

    #[test]
    fn cosine_is_zero_on_dimension_mismatch() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn cosine_is_zero_for_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_ignores_magnitude() {
        let a = [1.0, 2.0, 3.0];
        let b = [10.0, 20.0, 30.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn search_returns_descending_order_capped_at_k() {
        let index = SimilarityIndex::new(vec![
            candidate(0, vec![1.0, 0.0]),
            candidate(1, vec![0.0, 1.0]),
            candidate(2, vec![0.7, 0.7]),
        ]);
        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.chunk_id, 0);
        assert_eq!(hits[1].chunk.chunk_id, 2);
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[test]
    fn search_returns_fewer_than_k_when_candidates_are_scarce() {
        let index = SimilarityIndex::new(vec![candidate(0, vec![1.0, 0.0])]);
        assert_eq!(index.search(&[1.0, 0.0], 5).len(), 1);
    }

    #[test]
    fn ties_preserve_candidate_order() {
        let index = SimilarityIndex::new(vec![
            candidate(7, vec![2.0, 0.0]),
            candidate(3, vec![5.0, 0.0]),
        ]);
        // Both candidates are colinear with the query, similarity 1.0 each.
        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].chunk.chunk_id, 7);
        assert_eq!(hits[1].chunk.chunk_id, 3);
    }

    #[test]
    fn empty_embeddings_are_never_searchable() {
        let index = SimilarityIndex::new(vec![
            candidate(0, vec![]),
            candidate(1, vec![1.0, 0.0]),
        ]);
        assert_eq!(index.len(), 1);
        let hits = index.search(&[1.0, 0.0], 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, 1);
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let index = SimilarityIndex::new(Vec::new());
        assert!(index.is_empty());
        assert!(index.search(&[1.0], 3).is_empty());
    }
}

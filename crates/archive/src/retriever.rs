//! Semantic retrieval: query embedding plus nearest-document search.

use crate::deadline::with_deadline;
use crate::embeddings::EmbeddingProvider;
use crate::store::DocumentStore;
use crate::types::{Document, ScoredDocument};
use keepsake_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Cosine similarity in [-1, 1].
///
/// Returns 0.0 when the lengths differ or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

/// Score documents against `query` and keep the best `limit`.
///
/// Sorting is stable, so equal scores keep their input order. Documents
/// without an embedding are skipped.
pub fn rank_by_similarity(query: &[f32], documents: Vec<Document>, limit: usize) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = documents
        .into_iter()
        .filter_map(|document| {
            let score = cosine_similarity(query, document.embedding.as_deref()?);
            Some(ScoredDocument { document, score })
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

/// Finds the tenant documents closest in meaning to a question.
pub struct SemanticRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn DocumentStore>,
    candidate_multiplier: usize,
    timeout: Duration,
}

impl SemanticRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn DocumentStore>,
        candidate_multiplier: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            store,
            candidate_multiplier: candidate_multiplier.max(1),
            timeout,
        }
    }

    /// Up to `limit` documents of `scope_id`, best first.
    ///
    /// Never fails: an embedding failure yields an empty list, and an
    /// unusable vector index falls back to a full scan.
    pub async fn retrieve(&self, scope_id: &str, query: &str, limit: usize) -> Vec<ScoredDocument> {
        if limit == 0 {
            return Vec::new();
        }

        let query_vector = match self.embed_query(query).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::error!("Query embedding failed, returning no documents: {}", e);
                return Vec::new();
            }
        };

        let num_candidates = limit.saturating_mul(self.candidate_multiplier);
        let results = match with_deadline(
            "vector search",
            self.timeout,
            self.store.nearest(scope_id, &query_vector, num_candidates, limit),
        )
        .await
        {
            Ok(results) => {
                tracing::info!("Vector index search returned {} documents", results.len());
                results
            }
            Err(e) => {
                tracing::warn!("Vector index unusable, falling back to full scan: {}", e);
                match self.brute_force(scope_id, &query_vector, limit).await {
                    Ok(results) => results,
                    Err(e) => {
                        tracing::error!("Embedding scan failed, returning no documents: {}", e);
                        return Vec::new();
                    }
                }
            }
        };

        let mut results: Vec<ScoredDocument> = results
            .into_iter()
            .filter(|scored| {
                let same_scope = scored.document.scope_id == scope_id;
                if !same_scope {
                    tracing::warn!(
                        document_id = %scored.document.id,
                        "Dropping document from another scope"
                    );
                }
                same_scope
            })
            .collect();
        results.truncate(limit);
        results
    }

    async fn embed_query(&self, query: &str) -> AppResult<Vec<f32>> {
        if query.trim().is_empty() {
            return Err(AppError::Embedding("Query text is empty".to_string()));
        }

        let vector = with_deadline("query embedding", self.timeout, self.embedder.embed(query)).await?;

        let expected = self.embedder.dimensions();
        if vector.len() != expected {
            return Err(AppError::Embedding(format!(
                "Query embedding has {} dimensions, expected {}",
                vector.len(),
                expected
            )));
        }
        if vector.iter().all(|&x| x == 0.0) {
            return Err(AppError::Embedding("Query embedding is all zeros".to_string()));
        }
        Ok(vector)
    }

    async fn brute_force(&self, scope_id: &str, query: &[f32], limit: usize) -> AppResult<Vec<ScoredDocument>> {
        let documents = with_deadline(
            "embedding scan",
            self.timeout,
            self.store.embedded_documents(scope_id),
        )
        .await?;

        tracing::debug!("Scoring {} embedded documents by cosine similarity", documents.len());
        Ok(rank_by_similarity(query, documents, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{doc, embedded, FakeEmbedder, FakeStore};

    #[test]
    fn test_cosine_identity_and_zero() {
        let vectors: Vec<Vec<f32>> = vec![
            vec![0.3, -1.2, 4.5, 0.0],
            vec![7.0],
            vec![-2.5; 3],
            vec![1e30, -3e29, 5e30],
            vec![1e-30, 2e-30, -7e-31, 0.0],
            vec![f32::MIN_POSITIVE, 0.0, f32::MIN_POSITIVE],
            vec![f32::MAX, f32::MAX],
            vec![1e20, 1e-20, -42.0, 0.001, 3.0],
            (0..384).map(|i| (i as f32 * 0.37).sin()).collect(),
        ];
        for v in &vectors {
            assert_eq!(cosine_similarity(v, v), 1.0, "vector {:?}", &v[..v.len().min(4)]);
        }

        let v = &vectors[0];
        assert_eq!(cosine_similarity(v, &[0.0; 4]), 0.0);
        assert_eq!(cosine_similarity(v, &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
    }

    #[test]
    fn test_rank_is_stable_and_truncated() {
        let docs = vec![
            embedded(doc("tie-1", "org_a", "A", "Note", "2020-01-01"), vec![1.0, 1.0]),
            embedded(doc("best", "org_a", "A", "Note", "2020-01-01"), vec![1.0, 0.0]),
            embedded(doc("tie-2", "org_a", "A", "Note", "2020-01-01"), vec![2.0, 2.0]),
            embedded(doc("worst", "org_a", "A", "Note", "2020-01-01"), vec![0.0, 1.0]),
            doc("plain", "org_a", "A", "Note", "2020-01-01"),
        ];

        let ranked = rank_by_similarity(&[1.0, 0.0], docs, 3);
        let ids: Vec<&str> = ranked.iter().map(|s| s.document.id.as_str()).collect();
        assert_eq!(ids, vec!["best", "tie-1", "tie-2"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    fn scored_store() -> FakeStore {
        FakeStore::with_documents(vec![
            embedded(doc("college", "org_a", "Dad", "Graduation", "2019-06-01"), vec![1.0, 0.0, 0.0]),
            embedded(doc("xmas", "org_a", "Mom", "Christmas", "2019-12-25"), vec![0.0, 1.0, 0.0]),
            embedded(doc("other", "org_b", "Dad", "Graduation", "2019-06-01"), vec![1.0, 0.0, 0.0]),
        ])
    }

    #[tokio::test]
    async fn test_falls_back_to_scan_without_index() {
        let embedder = Arc::new(FakeEmbedder::fixed(vec![0.9, 0.1, 0.0]));
        let retriever = SemanticRetriever::new(embedder, Arc::new(scored_store()), 20, Duration::from_secs(5));

        let results = retriever.retrieve("org_a", "college advice", 5).await;
        let ids: Vec<&str> = results.iter().map(|s| s.document.id.as_str()).collect();
        assert_eq!(ids, vec!["college", "xmas"]);
    }

    #[tokio::test]
    async fn test_uses_index_with_candidate_pool() {
        let store = Arc::new(scored_store().with_index());
        let embedder = Arc::new(FakeEmbedder::fixed(vec![0.9, 0.1, 0.0]));
        let retriever = SemanticRetriever::new(embedder, store.clone(), 20, Duration::from_secs(5));

        let results = retriever.retrieve("org_a", "college advice", 5).await;
        assert_eq!(results.len(), 2);
        assert_eq!(store.last_num_candidates(), Some(100));
    }

    #[tokio::test]
    async fn test_drops_foreign_scope_from_index() {
        let store = Arc::new(scored_store().with_leaky_index());
        let embedder = Arc::new(FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]));
        let retriever = SemanticRetriever::new(embedder, store, 20, Duration::from_secs(5));

        let results = retriever.retrieve("org_a", "college", 5).await;
        assert!(!results.is_empty());
        assert!(results.iter().all(|s| s.document.scope_id == "org_a"));
    }

    #[tokio::test]
    async fn test_embedding_failure_returns_empty() {
        let retriever = SemanticRetriever::new(
            Arc::new(FakeEmbedder::failing()),
            Arc::new(scored_store()),
            20,
            Duration::from_secs(5),
        );
        assert!(retriever.retrieve("org_a", "college", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_dimension_and_empty_query_return_empty() {
        let retriever = SemanticRetriever::new(
            Arc::new(FakeEmbedder::fixed(vec![1.0, 0.0]).claiming_dimensions(3)),
            Arc::new(scored_store()),
            20,
            Duration::from_secs(5),
        );
        assert!(retriever.retrieve("org_a", "college", 5).await.is_empty());
        assert!(retriever.retrieve("org_a", "   ", 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_scan_failure_returns_empty() {
        let retriever = SemanticRetriever::new(
            Arc::new(FakeEmbedder::fixed(vec![1.0, 0.0, 0.0])),
            Arc::new(FakeStore::broken()),
            20,
            Duration::from_secs(5),
        );
        assert!(retriever.retrieve("org_a", "college", 5).await.is_empty());
    }
}

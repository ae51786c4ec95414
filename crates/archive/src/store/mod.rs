//! Document store abstraction.
//!
//! The query pipeline only reads documents. A store answers three questions:
//! which tenant documents match a structured filter, which are nearest to a
//! vector (when the backend has an ANN index), and which carry embeddings at
//! all (for the brute-force fallback).

pub mod sqlite;

pub use sqlite::SqliteDocumentStore;

use crate::types::{Document, FilterSpec, ScoredDocument};
use keepsake_core::{AppError, AppResult};

/// Read-side contract of the document store.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents of `scope_id` matching every present field of `filter`,
    /// newest first, at most `limit`.
    async fn find(
        &self,
        scope_id: &str,
        filter: &FilterSpec,
        limit: usize,
    ) -> AppResult<Vec<Document>>;

    /// Approximate nearest neighbours of `query` within `scope_id`.
    ///
    /// `num_candidates` is the pool the index explores before keeping the
    /// best `limit`. Backends without a vector index keep the default, which
    /// reports `AppError::IndexUnavailable`.
    async fn nearest(
        &self,
        scope_id: &str,
        query: &[f32],
        num_candidates: usize,
        limit: usize,
    ) -> AppResult<Vec<ScoredDocument>> {
        let _ = (scope_id, query, num_candidates, limit);
        Err(AppError::IndexUnavailable(
            "store has no nearest-neighbour index".to_string(),
        ))
    }

    /// Every document of `scope_id` that carries a non-empty embedding.
    async fn embedded_documents(&self, scope_id: &str) -> AppResult<Vec<Document>>;
}

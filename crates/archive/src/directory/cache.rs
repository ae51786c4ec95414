//! Short-TTL cache over any directory.

use crate::directory::{Directory, TenantVocabulary};
use keepsake_core::AppResult;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

const MAX_TENANTS: u64 = 10_000;

/// Caches successful directory reads per scope id.
///
/// Entries expire after the TTL; failed reads are never cached, so the next
/// request retries the inner directory.
pub struct CachedDirectory {
    inner: Arc<dyn Directory>,
    members: Cache<String, Vec<String>>,
    vocabularies: Cache<String, TenantVocabulary>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn Directory>, ttl: Duration) -> Self {
        Self {
            inner,
            members: Cache::builder()
                .max_capacity(MAX_TENANTS)
                .time_to_live(ttl)
                .build(),
            vocabularies: Cache::builder()
                .max_capacity(MAX_TENANTS)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Drop every cached entry for a tenant.
    pub fn invalidate(&self, scope_id: &str) {
        self.members.invalidate(scope_id);
        self.vocabularies.invalidate(scope_id);
    }
}

#[async_trait::async_trait]
impl Directory for CachedDirectory {
    async fn member_names(&self, scope_id: &str) -> AppResult<Vec<String>> {
        if let Some(names) = self.members.get(scope_id) {
            tracing::trace!("Member names cache hit for scope {}", scope_id);
            return Ok(names);
        }

        let names = self.inner.member_names(scope_id).await?;
        self.members.insert(scope_id.to_string(), names.clone());
        Ok(names)
    }

    async fn vocabulary(&self, scope_id: &str) -> AppResult<TenantVocabulary> {
        if let Some(vocabulary) = self.vocabularies.get(scope_id) {
            tracing::trace!("Vocabulary cache hit for scope {}", scope_id);
            return Ok(vocabulary);
        }

        let vocabulary = self.inner.vocabulary(scope_id).await?;
        self.vocabularies
            .insert(scope_id.to_string(), vocabulary.clone());
        Ok(vocabulary)
    }
}

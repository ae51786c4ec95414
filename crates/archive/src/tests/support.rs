//! Hand-written fakes for the pipeline's external services.

use crate::directory::{Directory, TenantVocabulary};
use crate::embeddings::EmbeddingProvider;
use crate::retriever::rank_by_similarity;
use crate::store::DocumentStore;
use crate::types::{AssetRefs, Document, DocumentMetadata, FilterSpec, QueryRoute, ScoredDocument};
use crate::classifier::QueryClassifier;
use chrono::{NaiveDate, TimeZone, Utc};
use keepsake_core::{AppError, AppResult};
use keepsake_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Build a document dated `date` (`YYYY-MM-DD`), created at noon that day.
pub fn doc(id: &str, scope: &str, sender: &str, event: &str, date: &str) -> Document {
    let doc_date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    Document {
        id: id.to_string(),
        scope_id: scope.to_string(),
        metadata: DocumentMetadata {
            sender_name: sender.to_string(),
            event_type: event.to_string(),
            doc_date,
            recipient_name: None,
        },
        text_content: format!("{} card from {}", event, sender),
        embedding: None,
        assets: AssetRefs::default(),
        created_at: Utc
            .from_utc_datetime(&doc_date.and_hms_opt(12, 0, 0).unwrap()),
    }
}

pub fn embedded(mut document: Document, embedding: Vec<f32>) -> Document {
    document.embedding = Some(embedding);
    document
}

/// Generation service returning a canned reply.
pub struct FakeLlm {
    reply: Option<String>,
    delay: Option<Duration>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl FakeLlm {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(reply: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying(reply)
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.reply {
            Some(ref content) => Ok(LlmResponse {
                content: content.clone(),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            }),
            None => Err(AppError::Llm("service unavailable".to_string())),
        }
    }
}

/// Embedder returning the same vector for every text.
#[derive(Debug)]
pub struct FakeEmbedder {
    vector: Option<Vec<f32>>,
    dimensions: usize,
}

impl FakeEmbedder {
    pub fn fixed(vector: Vec<f32>) -> Self {
        Self {
            dimensions: vector.len(),
            vector: Some(vector),
        }
    }

    pub fn failing() -> Self {
        Self {
            vector: None,
            dimensions: 3,
        }
    }

    /// Report a dimension different from the vectors actually returned.
    pub fn claiming_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn provider_name(&self) -> &str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        match self.vector {
            Some(ref v) => Ok(texts.iter().map(|_| v.clone()).collect()),
            None => Err(AppError::Embedding("embedding service down".to_string())),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum IndexMode {
    None,
    Scoped,
    /// Ignores the scope, to exercise the retriever's guard
    Leaky,
}

/// In-memory store with an optional nearest-neighbour index.
pub struct FakeStore {
    documents: Vec<Document>,
    index: IndexMode,
    broken: bool,
    num_candidates: Mutex<Option<usize>>,
}

impl FakeStore {
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents,
            index: IndexMode::None,
            broken: false,
            num_candidates: Mutex::new(None),
        }
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::with_documents(Vec::new())
        }
    }

    pub fn with_index(mut self) -> Self {
        self.index = IndexMode::Scoped;
        self
    }

    pub fn with_leaky_index(mut self) -> Self {
        self.index = IndexMode::Leaky;
        self
    }

    pub fn last_num_candidates(&self) -> Option<usize> {
        *self.num_candidates.lock().unwrap()
    }

    fn check(&self) -> AppResult<()> {
        if self.broken {
            return Err(AppError::Store("database offline".to_string()));
        }
        Ok(())
    }

    fn scoped(&self, scope_id: &str) -> impl Iterator<Item = &Document> {
        let scope_id = scope_id.to_string();
        self.documents.iter().filter(move |d| d.scope_id == scope_id)
    }
}

#[async_trait::async_trait]
impl DocumentStore for FakeStore {
    async fn find(&self, scope_id: &str, filter: &FilterSpec, limit: usize) -> AppResult<Vec<Document>> {
        self.check()?;
        let range = filter.date_range();

        let mut matches: Vec<Document> = self
            .scoped(scope_id)
            .filter(|d| filter.sender.as_ref().map_or(true, |s| &d.metadata.sender_name == s))
            .filter(|d| filter.event_type.as_ref().map_or(true, |e| &d.metadata.event_type == e))
            .filter(|d| {
                range.map_or(true, |(start, end)| {
                    d.metadata.doc_date >= start && d.metadata.doc_date < end
                })
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn nearest(
        &self,
        scope_id: &str,
        query: &[f32],
        num_candidates: usize,
        limit: usize,
    ) -> AppResult<Vec<ScoredDocument>> {
        self.check()?;
        *self.num_candidates.lock().unwrap() = Some(num_candidates);

        let candidates: Vec<Document> = match self.index {
            IndexMode::None => {
                return Err(AppError::IndexUnavailable("no index".to_string()));
            }
            IndexMode::Scoped => self.scoped(scope_id).cloned().collect(),
            IndexMode::Leaky => self.documents.clone(),
        };
        Ok(rank_by_similarity(query, candidates, limit))
    }

    async fn embedded_documents(&self, scope_id: &str) -> AppResult<Vec<Document>> {
        self.check()?;
        Ok(self.scoped(scope_id).filter(|d| d.has_embedding()).cloned().collect())
    }
}

/// Directory backed by maps.
#[derive(Default)]
pub struct FakeDirectory {
    members: HashMap<String, Vec<String>>,
    vocabularies: HashMap<String, TenantVocabulary>,
    broken: bool,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn member(mut self, scope_id: &str, name: &str) -> Self {
        self.members
            .entry(scope_id.to_string())
            .or_default()
            .push(name.to_string());
        self
    }

    pub fn event_types(mut self, scope_id: &str, events: &[&str]) -> Self {
        self.vocabularies
            .entry(scope_id.to_string())
            .or_default()
            .event_types = events.iter().map(|e| e.to_string()).collect();
        self
    }
}

#[async_trait::async_trait]
impl Directory for FakeDirectory {
    async fn member_names(&self, scope_id: &str) -> AppResult<Vec<String>> {
        if self.broken {
            return Err(AppError::Directory("directory offline".to_string()));
        }
        Ok(self.members.get(scope_id).cloned().unwrap_or_default())
    }

    async fn vocabulary(&self, scope_id: &str) -> AppResult<TenantVocabulary> {
        if self.broken {
            return Err(AppError::Directory("directory offline".to_string()));
        }
        Ok(self.vocabularies.get(scope_id).cloned().unwrap_or_default())
    }
}

/// Classifier with a fixed answer.
pub struct FixedClassifier(pub QueryRoute);

#[async_trait::async_trait]
impl QueryClassifier for FixedClassifier {
    async fn classify(&self, _query: &str) -> QueryRoute {
        self.0
    }
}

/// Classifier that panics, to exercise the orchestrator's panic boundary.
pub struct PanickingClassifier;

#[async_trait::async_trait]
impl QueryClassifier for PanickingClassifier {
    async fn classify(&self, _query: &str) -> QueryRoute {
        panic!("classifier exploded")
    }
}

//! Query orchestration.
//!
//! [`QueryAgent`] is the single entry point: it classifies a question, runs
//! the filter or semantic path, and wraps the result in a [`QueryResponse`].
//! No error or panic escapes `process_query`.

pub mod response;
pub mod state;

pub use response::{QueryResponse, ResponseBody, GENERIC_ERROR, NO_DOCUMENTS_ANSWER};
pub use state::{RequestState, RequestTracker};

use crate::classifier::{LlmClassifier, QueryClassifier};
use crate::deadline::with_deadline;
use crate::directory::{known_senders, CachedDirectory, Directory, SqliteDirectory, TenantVocabulary};
use crate::embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
use crate::filter::MetadataFilter;
use crate::rag::AnswerSynthesizer;
use crate::retriever::SemanticRetriever;
use crate::store::{DocumentStore, SqliteDocumentStore};
use crate::types::{ChatTurn, QueryRoute};
use futures::FutureExt;
use keepsake_core::{AppConfig, AppError, AppResult, RetrievalConfig};
use keepsake_llm::LlmClient;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// External services the agent is built from.
pub struct AgentServices {
    pub llm: Arc<dyn LlmClient>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub directory: Arc<dyn Directory>,
}

/// Answers questions about one tenant's archive at a time.
pub struct QueryAgent {
    classifier: Arc<dyn QueryClassifier>,
    directory: Arc<dyn Directory>,
    filter: MetadataFilter,
    retriever: SemanticRetriever,
    synthesizer: AnswerSynthesizer,
    limit: usize,
    timeout: Duration,
}

impl QueryAgent {
    /// Build an agent whose classifier and synthesizer use `model`.
    pub fn new(services: AgentServices, model: &str, retrieval: &RetrievalConfig) -> Self {
        let timeout = retrieval.call_timeout();
        let AgentServices {
            llm,
            embedder,
            store,
            directory,
        } = services;

        Self {
            classifier: Arc::new(LlmClassifier::new(Arc::clone(&llm), model, timeout)),
            directory,
            filter: MetadataFilter::new(Arc::clone(&store), retrieval.filter_limit, timeout),
            retriever: SemanticRetriever::new(embedder, store, retrieval.candidate_multiplier, timeout),
            synthesizer: AnswerSynthesizer::new(llm, model, timeout)
                .with_sampling(retrieval.answer_max_tokens, retrieval.answer_temperature),
            limit: retrieval.limit,
            timeout,
        }
    }

    /// Replace the default LLM-backed classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn QueryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Wire the agent from configuration: the configured generation and
    /// embedding providers over the SQLite archive.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let timeout = config.retrieval.call_timeout();
        let provider_config = config.get_provider_config(&config.provider);
        let endpoint = provider_config.as_ref().and_then(|p| p.endpoint());
        let api_key = config.resolve_api_key(&config.provider);

        let llm = keepsake_llm::create_client(&config.provider, endpoint, api_key.as_deref(), timeout)
            .map_err(|e| AppError::Config(format!("Failed to create LLM client: {}", e)))?;

        let embedder = create_provider(&EmbeddingConfig::from_app_config(config)?)?;

        let db_path = config.database_path();
        let store = Arc::new(SqliteDocumentStore::open(&db_path)?);
        let sqlite_directory: Arc<dyn Directory> = Arc::new(SqliteDirectory::open(&db_path)?);

        let directory: Arc<dyn Directory> = match config.retrieval.directory_cache_ttl_secs {
            0 => sqlite_directory,
            ttl => Arc::new(CachedDirectory::new(sqlite_directory, Duration::from_secs(ttl))),
        };

        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            embedder = embedder.provider_name(),
            database = ?db_path,
            "Query agent ready"
        );

        let services = AgentServices {
            llm,
            embedder,
            store,
            directory,
        };
        Ok(Self::new(services, &config.model, &config.retrieval))
    }

    /// Answer a question for `scope_id`.
    ///
    /// `history` is accepted for conversational callers but does not affect
    /// routing or retrieval.
    pub async fn process_query(
        &self,
        scope_id: &str,
        query: &str,
        history: Option<&[ChatTurn]>,
    ) -> QueryResponse {
        if let Some(turns) = history {
            tracing::debug!(turns = turns.len(), "Received conversation history");
        }

        let mut tracker = RequestTracker::new();
        let outcome = AssertUnwindSafe(self.run(scope_id, query, &mut tracker))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(response)) => {
                tracker.advance(RequestState::Completed);
                tracing::info!(kind = response.kind(), count = response.count, "Query answered");
                response
            }
            Ok(Err(e)) => {
                tracing::error!(state = %tracker.state(), "Query failed: {}", e);
                tracker.advance(RequestState::Errored);
                QueryResponse::error()
            }
            Err(_) => {
                tracing::error!(state = %tracker.state(), "Query pipeline panicked");
                tracker.advance(RequestState::Errored);
                QueryResponse::error()
            }
        }
    }

    async fn run(&self, scope_id: &str, query: &str, tracker: &mut RequestTracker) -> AppResult<QueryResponse> {
        if scope_id.trim().is_empty() {
            return Err(AppError::Other("Missing scope id".to_string()));
        }

        let route = self.classifier.classify(query).await;
        tracker.advance(RequestState::Classified);
        tracing::info!(scope_id, route = route.as_str(), "Routing query");

        match route {
            QueryRoute::Filter => {
                tracker.advance(RequestState::Filtering);
                let (members, vocabulary) = self.directory_snapshot(scope_id).await;
                let senders = known_senders(&members, &vocabulary);

                let documents = self
                    .filter
                    .execute(scope_id, query, &senders, &vocabulary.event_types)
                    .await?;
                Ok(QueryResponse::filter(documents))
            }
            QueryRoute::Semantic => {
                tracker.advance(RequestState::Retrieving);
                let scored = self.retriever.retrieve(scope_id, query, self.limit).await;
                if scored.is_empty() {
                    return Ok(QueryResponse::no_documents());
                }

                tracker.advance(RequestState::Synthesizing);
                let documents: Vec<_> = scored.iter().map(|s| s.document.clone()).collect();
                let answer = self.synthesizer.synthesize(query, &documents).await;
                Ok(QueryResponse::semantic(answer.answer, scored, answer.citations))
            }
        }
    }

    /// Member names and vocabulary, read concurrently. A failed read
    /// degrades to an empty list.
    async fn directory_snapshot(&self, scope_id: &str) -> (Vec<String>, TenantVocabulary) {
        let (members, vocabulary) = tokio::join!(
            with_deadline("member lookup", self.timeout, self.directory.member_names(scope_id)),
            with_deadline("vocabulary lookup", self.timeout, self.directory.vocabulary(scope_id)),
        );

        let members = members.unwrap_or_else(|e| {
            tracing::warn!("Member lookup failed, matching without member names: {}", e);
            Vec::new()
        });
        let vocabulary = vocabulary.unwrap_or_else(|e| {
            tracing::warn!("Vocabulary lookup failed, matching without vocabulary: {}", e);
            TenantVocabulary::default()
        });

        (members, vocabulary)
    }
}

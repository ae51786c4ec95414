//! Question answering over a multi-tenant archive of family documents.
//!
//! A question is routed either to a metadata filter ("Christmas cards from
//! 2022") or to semantic retrieval plus grounded answer synthesis ("What did
//! Dad write about college?"). Every read is scoped to one tenant.

pub mod agent;
pub mod classifier;
pub mod db;
pub mod deadline;
pub mod directory;
pub mod embeddings;
pub mod filter;
pub mod rag;
pub mod retriever;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use agent::{AgentServices, QueryAgent, QueryResponse, RequestState, ResponseBody};
pub use classifier::{LlmClassifier, QueryClassifier};
pub use directory::{CachedDirectory, Directory, SqliteDirectory, TenantVocabulary};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use filter::{parse_filter, MetadataFilter};
pub use rag::{AnswerResult, AnswerSynthesizer, Citation};
pub use retriever::{cosine_similarity, SemanticRetriever};
pub use store::{DocumentStore, SqliteDocumentStore};
pub use types::{AssetRefs, ChatTurn, Document, DocumentMetadata, FilterSpec, QueryRoute, ScoredDocument};

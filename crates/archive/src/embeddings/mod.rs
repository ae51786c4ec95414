//! Embedding providers.
//!
//! Turns text into fixed-dimension vectors for the semantic retriever and for
//! the `import` seeding path.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

//! Response envelope returned by `process_query`.

use crate::rag::Citation;
use crate::types::{Document, ScoredDocument};
use serde::{Deserialize, Serialize};

/// The only message a caller ever sees for a failed request.
pub const GENERIC_ERROR: &str = "An error occurred while processing your query.";

/// Answer used when retrieval finds nothing.
pub const NO_DOCUMENTS_ANSWER: &str =
    "I couldn't find any relevant documents to answer your question.";

/// `{type, content, count}` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(flatten)]
    pub body: ResponseBody,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum ResponseBody {
    Filter(FilterContent),
    Semantic(SemanticContent),
    Error(ErrorContent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterContent {
    pub documents: Vec<Document>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticContent {
    pub answer: String,
    pub documents: Vec<ScoredDocument>,
    pub citations: Vec<Citation>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContent {
    pub error: String,
}

impl QueryResponse {
    pub fn filter(documents: Vec<Document>) -> Self {
        let count = documents.len();
        Self {
            body: ResponseBody::Filter(FilterContent { documents, count }),
            count,
        }
    }

    pub fn semantic(answer: String, documents: Vec<ScoredDocument>, citations: Vec<Citation>) -> Self {
        let count = documents.len();
        Self {
            body: ResponseBody::Semantic(SemanticContent {
                answer,
                documents,
                citations,
                count,
            }),
            count,
        }
    }

    /// Semantic envelope for an empty retrieval.
    pub fn no_documents() -> Self {
        Self::semantic(NO_DOCUMENTS_ANSWER.to_string(), Vec::new(), Vec::new())
    }

    pub fn error() -> Self {
        Self {
            body: ResponseBody::Error(ErrorContent {
                error: GENERIC_ERROR.to_string(),
            }),
            count: 0,
        }
    }

    /// `"filter"`, `"semantic"` or `"error"`.
    pub fn kind(&self) -> &'static str {
        match self.body {
            ResponseBody::Filter(_) => "filter",
            ResponseBody::Semantic(_) => "semantic",
            ResponseBody::Error(_) => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, ResponseBody::Error(_))
    }
}

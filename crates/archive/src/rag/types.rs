//! Answer types.

use serde::{Deserialize, Serialize};

/// A numbered reference to a supplied document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based position in the context block
    pub position: usize,
    pub document_id: String,
}

impl Citation {
    /// Render as `[i] -> id`.
    pub fn label(&self) -> String {
        format!("[{}] -> {}", self.position, self.document_id)
    }
}

/// Generated answer with its references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Model text followed by the references line
    pub answer: String,
    pub citations: Vec<Citation>,
}

impl AnswerResult {
    /// Answer with no references.
    pub fn plain(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            citations: Vec::new(),
        }
    }

    /// Append `References: [1] -> id1, ...` when there are citations.
    pub fn with_references(answer: String, citations: Vec<Citation>) -> Self {
        if citations.is_empty() {
            return Self::plain(answer);
        }

        let labels: Vec<String> = citations.iter().map(Citation::label).collect();
        Self {
            answer: format!("{}\n\nReferences: {}", answer, labels.join(", ")),
            citations,
        }
    }
}

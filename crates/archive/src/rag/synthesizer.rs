//! Grounded answer generation.
//!
//! Documents are numbered in retrieval order, rendered into one context
//! block and handed to the generation service with instructions to answer
//! only from that context. Every supplied document is then listed in the
//! references line, whatever the model text cites.

use crate::deadline::with_deadline;
use crate::rag::types::{AnswerResult, Citation};
use crate::types::Document;
use keepsake_llm::{LlmClient, LlmRequest};
use std::sync::Arc;
use std::time::Duration;

/// Returned in place of an answer when generation fails.
pub const APOLOGY_ANSWER: &str =
    "I apologize, but I encountered an error while generating an answer.";

const SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about family memories.\n\
Answer strictly from the provided document context.\n\
If the answer is not in the context, say so explicitly.\n\
Refer to the documents you used by their number, for example [Document 2].";

/// Render documents as numbered context segments separated by blank lines.
pub fn build_context(documents: &[Document]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "[Document {}] From {}, {} ({}):\n{}",
                i + 1,
                or_unknown(&doc.metadata.sender_name),
                or_unknown(&doc.metadata.event_type),
                doc.metadata.doc_date.format("%Y-%m-%d"),
                doc.text_content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "Unknown"
    } else {
        value
    }
}

/// Generates an answer from retrieved documents.
pub struct AnswerSynthesizer {
    client: Arc<dyn LlmClient>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl AnswerSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 500,
            temperature: 0.7,
            timeout,
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Answer `query` from `documents`. Never fails; generation errors and
    /// timeouts produce [`APOLOGY_ANSWER`] with no citations.
    pub async fn synthesize(&self, query: &str, documents: &[Document]) -> AnswerResult {
        let context = build_context(documents);
        let request = LlmRequest::new(
            format!("Context:\n{}\n\nQuestion: {}", context, query),
            self.model.as_str(),
        )
        .with_system(SYSTEM_PROMPT)
        .with_max_tokens(self.max_tokens)
        .with_temperature(self.temperature);

        tracing::debug!(
            documents = documents.len(),
            context_chars = context.len(),
            "Generating answer"
        );

        match with_deadline("answer generation", self.timeout, self.client.complete(&request)).await {
            Ok(response) => {
                let citations = documents
                    .iter()
                    .enumerate()
                    .map(|(i, doc)| Citation {
                        position: i + 1,
                        document_id: doc.id.clone(),
                    })
                    .collect();
                AnswerResult::with_references(response.content, citations)
            }
            Err(e) => {
                tracing::error!("Answer generation failed: {}", e);
                AnswerResult::plain(APOLOGY_ANSWER)
            }
        }
    }
}

//! Query routing: metadata lookup or semantic question.

use crate::deadline::with_deadline;
use crate::types::QueryRoute;
use keepsake_llm::{LlmClient, LlmRequest};
use std::sync::Arc;
use std::time::Duration;

const CLASSIFIER_MAX_TOKENS: u32 = 10;

const CLASSIFIER_PROMPT: &str = r#"You are a query classifier for a family memory archive.
Decide which kind of request the user query is:

1. filter: a request for specific documents by metadata (sender, occasion, date).
   Examples: "Show me birthday cards from Mom", "Find all Christmas cards", "Cards from 2023"
2. semantic: a question about what the documents say.
   Examples: "What advice did Mom give?", "What did Dad write about college?", "Tell me about graduation"

Respond with only "filter" or "semantic"."#;

/// Decides which path handles a question.
#[async_trait::async_trait]
pub trait QueryClassifier: Send + Sync {
    /// Never fails; undecidable input routes to `Semantic`.
    async fn classify(&self, query: &str) -> QueryRoute;
}

/// Classifier backed by a zero-temperature generation call.
pub struct LlmClassifier {
    client: Arc<dyn LlmClient>,
    model: String,
    timeout: Duration,
}

impl LlmClassifier {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl QueryClassifier for LlmClassifier {
    async fn classify(&self, query: &str) -> QueryRoute {
        let request = LlmRequest::new(query, self.model.as_str())
            .with_system(CLASSIFIER_PROMPT)
            .with_max_tokens(CLASSIFIER_MAX_TOKENS)
            .with_temperature(0.0);

        match with_deadline("classification", self.timeout, self.client.complete(&request)).await {
            Ok(response) => {
                let route = parse_route(&response.content);
                tracing::debug!(raw = %response.content.trim(), route = route.as_str(), "Classified query");
                route
            }
            Err(e) => {
                tracing::error!("Query classification failed, routing to semantic: {}", e);
                QueryRoute::Semantic
            }
        }
    }
}

/// Map a raw model label to a route.
///
/// Only an exact `filter` label selects the filter path; `semantic` and the
/// older `detective` label, and anything unrecognized, select semantic.
pub fn parse_route(raw: &str) -> QueryRoute {
    let label = raw
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    match label.as_str() {
        "filter" => QueryRoute::Filter,
        "semantic" | "detective" => QueryRoute::Semantic,
        other => {
            if !other.is_empty() {
                tracing::warn!("Unrecognized classifier label '{}', routing to semantic", other);
            }
            QueryRoute::Semantic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::FakeLlm;

    #[test]
    fn test_parse_route_labels() {
        assert_eq!(parse_route("filter"), QueryRoute::Filter);
        assert_eq!(parse_route("  Filter.\n"), QueryRoute::Filter);
        assert_eq!(parse_route("\"FILTER\""), QueryRoute::Filter);
        assert_eq!(parse_route("semantic"), QueryRoute::Semantic);
        assert_eq!(parse_route("detective"), QueryRoute::Semantic);
    }

    #[test]
    fn test_parse_route_defaults_to_semantic() {
        assert_eq!(parse_route(""), QueryRoute::Semantic);
        assert_eq!(parse_route("filter or semantic"), QueryRoute::Semantic);
        assert_eq!(parse_route("I think this is a filter query"), QueryRoute::Semantic);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let llm = Arc::new(FakeLlm::replying("filter"));
        let classifier = LlmClassifier::new(llm.clone(), "gpt-4o-mini", Duration::from_secs(5));

        let route = classifier.classify("Show me all Christmas cards from 2022").await;
        assert_eq!(route, QueryRoute::Filter);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, Some(10));
        assert_eq!(requests[0].temperature, Some(0.0));
        assert_eq!(requests[0].prompt, "Show me all Christmas cards from 2022");
        assert!(requests[0].system.as_deref().unwrap_or_default().contains("filter"));
    }

    #[tokio::test]
    async fn test_failure_routes_to_semantic() {
        let classifier = LlmClassifier::new(
            Arc::new(FakeLlm::failing()),
            "gpt-4o-mini",
            Duration::from_secs(5),
        );
        assert_eq!(classifier.classify("Cards from 2023").await, QueryRoute::Semantic);
    }

    #[tokio::test]
    async fn test_timeout_routes_to_semantic() {
        let classifier = LlmClassifier::new(
            Arc::new(FakeLlm::slow("filter", Duration::from_secs(5))),
            "gpt-4o-mini",
            Duration::from_millis(20),
        );
        assert_eq!(classifier.classify("Cards from 2023").await, QueryRoute::Semantic);
    }
}

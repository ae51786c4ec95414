//! End-to-end behavior of `QueryAgent::process_query` over fakes.

use crate::agent::{AgentServices, QueryAgent, ResponseBody, GENERIC_ERROR, NO_DOCUMENTS_ANSWER};
use crate::rag::APOLOGY_ANSWER;
use crate::tests::support::{
    doc, embedded, FakeDirectory, FakeEmbedder, FakeLlm, FakeStore, FixedClassifier,
    PanickingClassifier,
};
use crate::types::{ChatTurn, QueryRoute};
use keepsake_core::RetrievalConfig;
use std::sync::Arc;

fn archive() -> FakeStore {
    FakeStore::with_documents(vec![
        embedded(doc("bday-21", "org_a", "Alice", "Birthday", "2021-04-01"), vec![0.0, 1.0, 0.0]),
        embedded(doc("bday-22", "org_a", "Alice", "Birthday", "2022-04-01"), vec![0.0, 1.0, 0.0]),
        embedded(doc("xmas-22", "org_a", "Bob", "Christmas", "2022-12-25"), vec![0.0, 0.0, 1.0]),
        embedded(doc("college", "org_a", "Dad", "Graduation", "2019-06-01"), vec![1.0, 0.0, 0.0]),
        doc("no-vector", "org_a", "Dad", "Note", "2018-01-01"),
    ])
}

fn directory() -> FakeDirectory {
    FakeDirectory::new()
        .member("org_a", "Alice")
        .member("org_a", "Dad")
        .event_types("org_a", &["Birthday", "Christmas", "Graduation"])
}

fn agent(llm: FakeLlm, embedder: FakeEmbedder, store: FakeStore, directory: FakeDirectory) -> QueryAgent {
    let services = AgentServices {
        llm: Arc::new(llm),
        embedder: Arc::new(embedder),
        store: Arc::new(store),
        directory: Arc::new(directory),
    };
    QueryAgent::new(services, "test-model", &RetrievalConfig::default())
}

#[tokio::test]
async fn test_filter_route_by_event_type() {
    let agent = agent(
        FakeLlm::replying("filter"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        directory(),
    );

    let response = agent.process_query("org_a", "Show me Birthday cards", None).await;

    assert_eq!(response.kind(), "filter");
    assert_eq!(response.count, 2);
    match response.body {
        ResponseBody::Filter(content) => {
            let ids: Vec<&str> = content.documents.iter().map(|d| d.id.as_str()).collect();
            assert_eq!(ids, vec!["bday-22", "bday-21"]);
            assert_eq!(content.count, 2);
        }
        other => panic!("expected filter body, got {:?}", other),
    }
}

#[tokio::test]
async fn test_filter_route_with_year_and_event() {
    let agent = agent(
        FakeLlm::replying("filter"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        directory(),
    );

    let response = agent
        .process_query("org_a", "Show me all Christmas cards from 2022", None)
        .await;

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["type"], "filter");
    assert_eq!(value["count"], 1);
    assert_eq!(value["content"]["documents"][0]["id"], "xmas-22");
    assert!(value["content"]["documents"][0].get("embedding").is_none());
}

#[tokio::test]
async fn test_filter_route_with_member_sender() {
    let agent = agent(
        FakeLlm::replying("filter"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        directory(),
    );

    let response = agent.process_query("org_a", "Cards from Alice in 2021", None).await;
    assert_eq!(response.count, 1);
}

#[tokio::test]
async fn test_directory_failure_still_filters_by_year() {
    let agent = agent(
        FakeLlm::replying("filter"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        FakeDirectory::broken(),
    );

    let response = agent.process_query("org_a", "Cards from 2022", None).await;
    assert_eq!(response.kind(), "filter");
    assert_eq!(response.count, 2);
}

#[tokio::test]
async fn test_filter_store_failure_is_error_envelope() {
    let agent = agent(
        FakeLlm::replying("filter"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        FakeStore::broken(),
        directory(),
    );

    let response = agent.process_query("org_a", "Birthday cards", None).await;
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["type"], "error");
    assert_eq!(value["content"]["error"], GENERIC_ERROR);
    assert_eq!(value["count"], 0);
}

#[tokio::test]
async fn test_semantic_route_answers_with_references() {
    let agent = agent(
        FakeLlm::replying("semantic"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        directory(),
    );

    let response = agent
        .process_query("org_a", "What did Dad write about college?", None)
        .await;

    assert_eq!(response.kind(), "semantic");
    assert_eq!(response.count, 4);
    match response.body {
        ResponseBody::Semantic(content) => {
            assert_eq!(content.documents[0].document.id, "college");
            assert_eq!(content.documents[0].score, 1.0);
            assert_eq!(content.citations.len(), 4);
            assert!(content.answer.contains("References: [1] -> college"));
        }
        other => panic!("expected semantic body, got {:?}", other),
    }
}

#[tokio::test]
async fn test_embedding_failure_gives_empty_semantic_envelope() {
    let agent = agent(
        FakeLlm::replying("semantic"),
        FakeEmbedder::failing(),
        archive(),
        directory(),
    );

    let response = agent
        .process_query("org_a", "What did Dad write about college?", None)
        .await;

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["type"], "semantic");
    assert_eq!(value["count"], 0);
    assert_eq!(value["content"]["answer"], NO_DOCUMENTS_ANSWER);
    assert_eq!(value["content"]["documents"], serde_json::json!([]));
}

#[tokio::test]
async fn test_synthesizer_skipped_when_nothing_retrieved() {
    let llm = Arc::new(FakeLlm::replying("semantic"));
    let services = AgentServices {
        llm: llm.clone(),
        embedder: Arc::new(FakeEmbedder::fixed(vec![1.0, 0.0, 0.0])),
        store: Arc::new(FakeStore::with_documents(Vec::new())),
        directory: Arc::new(directory()),
    };
    let agent = QueryAgent::new(services, "test-model", &RetrievalConfig::default());

    let response = agent.process_query("org_a", "Anything about college?", None).await;
    assert_eq!(response.count, 0);
    // Only the classification call reached the generation service.
    assert_eq!(llm.requests().len(), 1);
}

#[tokio::test]
async fn test_generation_failure_returns_apology() {
    let agent = agent(
        FakeLlm::failing(),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        directory(),
    );

    // Classification fails too, which routes to semantic.
    let response = agent.process_query("org_a", "What did Dad say?", None).await;
    match response.body {
        ResponseBody::Semantic(content) => {
            assert_eq!(content.answer, APOLOGY_ANSWER);
            assert!(content.citations.is_empty());
            assert_eq!(content.count, 4);
        }
        other => panic!("expected semantic body, got {:?}", other),
    }
}

#[tokio::test]
async fn test_injected_classifier_overrides_llm() {
    let agent = agent(
        FakeLlm::replying("semantic"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        directory(),
    )
    .with_classifier(Arc::new(FixedClassifier(QueryRoute::Filter)));

    let response = agent.process_query("org_a", "Graduation", None).await;
    assert_eq!(response.kind(), "filter");
    assert_eq!(response.count, 1);
}

#[tokio::test]
async fn test_panic_is_contained() {
    let agent = agent(
        FakeLlm::replying("semantic"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        directory(),
    )
    .with_classifier(Arc::new(PanickingClassifier));

    let response = agent.process_query("org_a", "Anything", None).await;
    assert!(response.is_error());
}

#[tokio::test]
async fn test_blank_scope_is_rejected() {
    let agent = agent(
        FakeLlm::replying("filter"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        directory(),
    );

    let response = agent.process_query("  ", "Birthday cards", None).await;
    assert!(response.is_error());
}

#[tokio::test]
async fn test_history_does_not_change_result() {
    let agent = agent(
        FakeLlm::replying("filter"),
        FakeEmbedder::fixed(vec![1.0, 0.0, 0.0]),
        archive(),
        directory(),
    );
    let history = vec![ChatTurn {
        role: "user".to_string(),
        content: "Show me Christmas cards".to_string(),
    }];

    let with_history = agent
        .process_query("org_a", "Show me Birthday cards", Some(&history))
        .await;
    let without = agent.process_query("org_a", "Show me Birthday cards", None).await;
    assert_eq!(with_history, without);
}

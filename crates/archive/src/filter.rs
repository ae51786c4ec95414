//! Metadata filter engine.
//!
//! Parses a question into a [`FilterSpec`] using the tenant's own sender and
//! event-type vocabulary, then runs it as a scoped structured query.

use crate::deadline::with_deadline;
use crate::store::DocumentStore;
use crate::types::{Document, FilterSpec};
use keepsake_core::AppResult;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20[0-9]{2})\b").expect("year pattern is valid"));

/// Extract a [`FilterSpec`] from free text.
pub fn parse_filter(query: &str, known_senders: &[String], known_event_types: &[String]) -> FilterSpec {
    let query_lower = query.to_lowercase();

    FilterSpec {
        event_type: best_match(&query_lower, known_event_types, "event type"),
        year: extract_year(query),
        sender: best_match(&query_lower, known_senders, "sender"),
    }
}

/// First `20xx` token in the raw text.
pub fn extract_year(query: &str) -> Option<i32> {
    YEAR_PATTERN
        .captures(query)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Lowercase forms of a vocabulary entry tried against the query: as
/// written, without punctuation, and without whitespace.
fn variants(entry: &str) -> Vec<String> {
    let lower = entry.trim().to_lowercase();
    let unpunctuated: String = lower
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && *c != '\u{2019}')
        .collect();
    let unspaced: String = lower.chars().filter(|c| !c.is_whitespace()).collect();

    let mut forms = vec![lower, unpunctuated, unspaced];
    forms.retain(|f| !f.trim().is_empty());
    forms.dedup();
    forms
}

/// Vocabulary entry matched by the longest variant.
///
/// Two different entries tied for the longest match make the field
/// ambiguous, and it is left out of the filter.
fn best_match(query_lower: &str, vocabulary: &[String], field: &str) -> Option<String> {
    let mut best: Option<(usize, &str)> = None;
    let mut tied = false;

    for entry in vocabulary {
        let Some(len) = variants(entry)
            .iter()
            .filter(|form| query_lower.contains(form.as_str()))
            .map(|form| form.chars().count())
            .max()
        else {
            continue;
        };

        match best {
            Some((best_len, _)) if len < best_len => {}
            Some((best_len, best_entry)) if len == best_len => {
                if !best_entry.trim().eq_ignore_ascii_case(entry.trim()) {
                    tied = true;
                }
            }
            _ => {
                best = Some((len, entry.as_str()));
                tied = false;
            }
        }
    }

    match best {
        Some((_, entry)) if tied => {
            tracing::warn!("Ambiguous {} match (tie with '{}'), omitting field", field, entry);
            None
        }
        Some((_, entry)) => Some(entry.trim().to_string()),
        None => None,
    }
}

/// Runs parsed filters against the document store.
pub struct MetadataFilter {
    store: Arc<dyn DocumentStore>,
    limit: usize,
    timeout: Duration,
}

impl MetadataFilter {
    pub fn new(store: Arc<dyn DocumentStore>, limit: usize, timeout: Duration) -> Self {
        Self {
            store,
            limit,
            timeout,
        }
    }

    /// Documents matching the question, newest first.
    ///
    /// Store failures and timeouts are returned to the caller.
    pub async fn execute(
        &self,
        scope_id: &str,
        query: &str,
        known_senders: &[String],
        known_event_types: &[String],
    ) -> AppResult<Vec<Document>> {
        let filter = parse_filter(query, known_senders, known_event_types);
        tracing::info!(
            scope_id,
            sender = ?filter.sender,
            event_type = ?filter.event_type,
            year = ?filter.year,
            "Running metadata filter"
        );

        let documents = with_deadline(
            "document filter",
            self.timeout,
            self.store.find(scope_id, &filter, self.limit),
        )
        .await?;

        tracing::debug!("Metadata filter matched {} documents", documents.len());
        Ok(documents)
    }
}

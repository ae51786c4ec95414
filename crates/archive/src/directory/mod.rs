//! Tenant directory: members and per-tenant vocabulary.
//!
//! The filter path needs two tenant-scoped lists before it can parse a
//! question: who might have sent a document and which occasions the tenant
//! tags documents with.

pub mod cache;
pub mod sqlite;

pub use cache::CachedDirectory;
pub use sqlite::SqliteDirectory;

use keepsake_core::AppResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-tenant vocabulary from organization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantVocabulary {
    #[serde(default)]
    pub event_types: Vec<String>,
    #[serde(default)]
    pub sender_names: Vec<String>,
    #[serde(default)]
    pub recipient_names: Vec<String>,
}

/// Read-side contract of the tenant directory.
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    /// Display names (`"first last"`) of the tenant's members.
    async fn member_names(&self, scope_id: &str) -> AppResult<Vec<String>>;

    /// The tenant's vocabulary; empty when no settings exist.
    async fn vocabulary(&self, scope_id: &str) -> AppResult<TenantVocabulary>;
}

/// Join first and last name, trimmed. Returns `None` when both are blank.
pub fn display_name(first: &str, last: &str) -> Option<String> {
    let name = format!("{} {}", first.trim(), last.trim());
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Member names followed by vocabulary sender names, de-duplicated
/// case-insensitively, first occurrence kept.
pub fn known_senders(members: &[String], vocabulary: &TenantVocabulary) -> Vec<String> {
    let mut seen = HashSet::new();
    members
        .iter()
        .chain(vocabulary.sender_names.iter())
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(" Alice ", "Smith"), Some("Alice Smith".to_string()));
        assert_eq!(display_name("Dad", ""), Some("Dad".to_string()));
        assert_eq!(display_name("", "  "), None);
    }

    #[test]
    fn test_known_senders_merges_in_order() {
        let members = vec!["Alice Smith".to_string(), "Bob".to_string()];
        let vocabulary = TenantVocabulary {
            sender_names: vec!["bob".to_string(), "Grandma".to_string(), " ".to_string()],
            ..Default::default()
        };

        assert_eq!(
            known_senders(&members, &vocabulary),
            vec!["Alice Smith", "Bob", "Grandma"]
        );
    }
}

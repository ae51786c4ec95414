//! Archive type definitions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A scanned card, letter or note belonging to exactly one tenant.
///
/// Documents are written by ingestion and are read-only to the query
/// pipeline. The embedding is either absent or a full vector of the
/// embedding model's dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier
    pub id: String,

    /// Tenant (organization) that owns the document
    pub scope_id: String,

    /// Who sent it, for what occasion and when
    pub metadata: DocumentMetadata,

    /// Transcribed text of the document
    #[serde(default)]
    pub text_content: String,

    /// Embedding of `text_content`; never serialized into responses
    #[serde(skip_serializing, default)]
    pub embedding: Option<Vec<f32>>,

    /// Links to the stored original and thumbnail
    #[serde(default)]
    pub assets: AssetRefs,

    /// When the document was added to the archive
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Whether the document carries a usable embedding.
    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|v| !v.is_empty())
    }
}

/// Descriptive metadata entered at upload time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub sender_name: String,
    pub event_type: String,
    pub doc_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
}

/// References to blob-stored assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Structured filter parsed from a question.
///
/// Every field is optional; the present ones are combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub event_type: Option<String>,
    pub year: Option<i32>,
    pub sender: Option<String>,
}

impl FilterSpec {
    /// Check if no field was extracted.
    pub fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.year.is_none() && self.sender.is_none()
    }

    /// Half-open date range `[Jan 1 of year, Jan 1 of year + 1)`.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let year = self.year?;
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let end = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?;
        Some((start, end))
    }
}

/// A document paired with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    #[serde(flatten)]
    pub document: Document,

    /// Similarity in [-1, 1]
    pub score: f32,
}

/// Which path handles a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryRoute {
    /// Structured metadata lookup
    Filter,
    /// Embedding retrieval plus answer synthesis
    Semantic,
}

impl QueryRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Semantic => "semantic",
        }
    }
}

/// One prior message in a conversation. Accepted and passed through only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

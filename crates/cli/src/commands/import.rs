//! Import command handler.
//!
//! Seeds the SQLite archive for one tenant from a JSON file:
//!
//! ```json
//! {
//!   "members": [{"first_name": "Alice", "last_name": "Smith"}],
//!   "vocabulary": {"event_types": ["Birthday"], "sender_names": ["Grandma"]},
//!   "documents": [{
//!     "id": "doc-1",
//!     "metadata": {"sender_name": "Grandma", "event_type": "Birthday", "doc_date": "2022-04-01"},
//!     "text_content": "Happy birthday!"
//!   }]
//! }
//! ```

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use keepsake_archive::{
    create_provider, AssetRefs, Document, DocumentMetadata, EmbeddingConfig, EmbeddingProvider,
    SqliteDirectory, SqliteDocumentStore, TenantVocabulary,
};
use keepsake_core::config::AppConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Load documents, members and vocabulary into the archive
#[derive(Args, Debug)]
pub struct ImportCommand {
    /// JSON file to import
    pub file: PathBuf,

    /// Tenant (organization) that owns the imported data
    #[arg(short, long, env = "KEEPSAKE_SCOPE")]
    pub scope: String,
}

#[derive(Debug, Deserialize)]
struct ImportFile {
    #[serde(default)]
    members: Vec<ImportMember>,
    #[serde(default)]
    vocabulary: Option<TenantVocabulary>,
    #[serde(default)]
    documents: Vec<ImportDocument>,
}

#[derive(Debug, Deserialize)]
struct ImportMember {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct ImportDocument {
    id: String,
    metadata: DocumentMetadata,
    #[serde(default)]
    text_content: String,
    #[serde(default)]
    assets: AssetRefs,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Import summary.
#[derive(Debug, Default, PartialEq)]
struct ImportStats {
    members: usize,
    documents: usize,
    embedded: usize,
}

impl ImportCommand {
    /// Execute the import command.
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!(scope = %self.scope, file = ?self.file, "Executing import command");

        if self.scope.trim().is_empty() {
            anyhow::bail!("--scope must not be empty");
        }

        let data = read_import_file(&self.file)?;
        let db_path = config.database_path();
        let store = SqliteDocumentStore::open(&db_path)?;
        let directory = SqliteDirectory::open(&db_path)?;
        let embedder = create_provider(&EmbeddingConfig::from_app_config(config)?)?;

        let mut stats = ImportStats::default();

        if let Some(ref vocabulary) = data.vocabulary {
            directory.set_vocabulary(&self.scope, vocabulary).await?;
        }

        for member in &data.members {
            if directory
                .add_member(&self.scope, &member.first_name, &member.last_name)
                .await?
            {
                stats.members += 1;
            }
        }

        for item in data.documents {
            let embedding = if item.text_content.trim().is_empty() {
                tracing::warn!(document_id = %item.id, "Document has no text, storing without embedding");
                None
            } else {
                Some(
                    embedder
                        .embed(&item.text_content)
                        .await
                        .with_context(|| format!("Failed to embed document {}", item.id))?,
                )
            };

            if embedding.is_some() {
                stats.embedded += 1;
            }

            let document = Document {
                id: item.id,
                scope_id: self.scope.clone(),
                metadata: item.metadata,
                text_content: item.text_content,
                embedding,
                assets: item.assets,
                created_at: item.created_at.unwrap_or_else(Utc::now),
            };
            store.insert_document(&document).await?;
            stats.documents += 1;
        }

        tracing::info!(
            members = stats.members,
            documents = stats.documents,
            embedded = stats.embedded,
            "Import completed"
        );
        println!(
            "Imported {} documents ({} embedded) and {} members into scope '{}'",
            stats.documents, stats.embedded, stats.members, self.scope
        );

        Ok(())
    }
}

fn read_import_file(path: &Path) -> anyhow::Result<ImportFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file {:?}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid import file {:?}", path))
}

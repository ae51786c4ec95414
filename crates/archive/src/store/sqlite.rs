//! SQLite-backed document store.

use crate::db;
use crate::store::DocumentStore;
use crate::types::{AssetRefs, Document, DocumentMetadata, FilterSpec};
use chrono::{DateTime, NaiveDate};
use keepsake_core::{AppError, AppResult};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

const DOCUMENT_COLUMNS: &str = "id, scope_id, sender_name, event_type, doc_date, recipient_name, \
     text_content, embedding, original_url, thumbnail_url, created_at";

/// Document store over the archive's `documents` table.
///
/// SQLite has no vector index, so `nearest` keeps the trait default and the
/// retriever falls back to scanning `embedded_documents`.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Open the archive at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        Ok(Self::from_connection(db::open_archive(db_path)?))
    }

    /// Open a throwaway in-memory archive.
    pub fn in_memory() -> AppResult<Self> {
        Ok(Self::from_connection(db::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Insert or replace a document.
    ///
    /// Write path for ingestion and seeding; the query pipeline never calls it.
    pub async fn insert_document(&self, document: &Document) -> AppResult<()> {
        let document = document.clone();
        self.with_conn(move |conn| insert_row(conn, &document)).await
    }

    /// Number of documents stored for a tenant.
    pub async fn count(&self, scope_id: &str) -> AppResult<u64> {
        let scope_id = scope_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE scope_id = ?1",
                params![scope_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(|e| AppError::Store(format!("Failed to count documents: {}", e)))
        })
        .await
    }

    /// Run blocking SQLite work off the async executor.
    async fn with_conn<T, F>(&self, work: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::Store("Archive connection lock poisoned".to_string()))?;
            work(&guard)
        })
        .await
        .map_err(|e| AppError::Store(format!("Store task failed: {}", e)))?
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find(
        &self,
        scope_id: &str,
        filter: &FilterSpec,
        limit: usize,
    ) -> AppResult<Vec<Document>> {
        let (sql, values) = build_find_query(scope_id, filter, limit);

        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;

            let rows = stmt
                .query_map(params_from_iter(values.iter()), row_to_document)
                .map_err(|e| AppError::Store(format!("Failed to query documents: {}", e)))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to read document row: {}", e)))
        })
        .await
    }

    async fn embedded_documents(&self, scope_id: &str) -> AppResult<Vec<Document>> {
        let scope_id = scope_id.to_string();

        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM documents \
                 WHERE scope_id = ?1 AND embedding IS NOT NULL AND length(embedding) > 0 \
                 ORDER BY created_at DESC, id",
                DOCUMENT_COLUMNS
            );
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| AppError::Store(format!("Failed to prepare scan: {}", e)))?;

            let rows = stmt
                .query_map(params![scope_id], row_to_document)
                .map_err(|e| AppError::Store(format!("Failed to scan documents: {}", e)))?;

            let documents: Vec<Document> = rows
                .filter_map(|row| match row {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        tracing::warn!("Skipping unreadable document row: {}", e);
                        None
                    }
                })
                .filter(Document::has_embedding)
                .collect();

            tracing::debug!(
                "Scanned {} embedded documents for scope {}",
                documents.len(),
                scope_id
            );
            Ok(documents)
        })
        .await
    }
}

/// Build the scoped filter query and its positional parameters.
fn build_find_query(scope_id: &str, filter: &FilterSpec, limit: usize) -> (String, Vec<Value>) {
    let mut clauses = vec!["scope_id = ?".to_string()];
    let mut values = vec![Value::Text(scope_id.to_string())];

    if let Some(ref sender) = filter.sender {
        clauses.push("sender_name = ?".to_string());
        values.push(Value::Text(sender.clone()));
    }

    if let Some(ref event_type) = filter.event_type {
        clauses.push("event_type = ?".to_string());
        values.push(Value::Text(event_type.clone()));
    }

    if let Some((start, end)) = filter.date_range() {
        clauses.push("doc_date >= ? AND doc_date < ?".to_string());
        values.push(Value::Text(start.format("%Y-%m-%d").to_string()));
        values.push(Value::Text(end.format("%Y-%m-%d").to_string()));
    }

    values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

    let sql = format!(
        "SELECT {} FROM documents WHERE {} ORDER BY created_at DESC, id LIMIT ?",
        DOCUMENT_COLUMNS,
        clauses.join(" AND ")
    );

    (sql, values)
}

fn insert_row(conn: &Connection, document: &Document) -> AppResult<()> {
    let embedding = document
        .embedding
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(embedding_to_bytes);

    conn.execute(
        "INSERT OR REPLACE INTO documents \
         (id, scope_id, sender_name, event_type, doc_date, recipient_name, text_content, \
          embedding, original_url, thumbnail_url, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            document.id,
            document.scope_id,
            document.metadata.sender_name,
            document.metadata.event_type,
            document.metadata.doc_date.format("%Y-%m-%d").to_string(),
            document.metadata.recipient_name,
            document.text_content,
            embedding,
            document.assets.original_url,
            document.assets.thumbnail_url,
            document.created_at.timestamp_millis(),
        ],
    )
    .map_err(|e| AppError::Store(format!("Failed to insert document: {}", e)))?;

    Ok(())
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let doc_date: String = row.get(4)?;
    let doc_date = NaiveDate::parse_from_str(&doc_date, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let embedding = match row.get::<_, Option<Vec<u8>>>(7)? {
        Some(bytes) if !bytes.is_empty() => Some(
            bytes_to_embedding(&bytes)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Blob, Box::new(e)))?,
        ),
        _ => None,
    };

    let created_ms: i64 = row.get(10)?;
    let created_at = DateTime::from_timestamp_millis(created_ms).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(10, created_ms)
    })?;

    Ok(Document {
        id: row.get(0)?,
        scope_id: row.get(1)?,
        metadata: DocumentMetadata {
            sender_name: row.get(2)?,
            event_type: row.get(3)?,
            doc_date,
            recipient_name: row.get(5)?,
        },
        text_content: row.get(6)?,
        embedding,
        assets: AssetRefs {
            original_url: row.get(8)?,
            thumbnail_url: row.get(9)?,
        },
        created_at,
    })
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert stored bytes back to an embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Store(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

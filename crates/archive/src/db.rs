//! SQLite archive database: connection setup and schema.

use keepsake_core::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;

/// Open (creating if needed) the archive database at `db_path`.
pub fn open_archive(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Store(format!("Failed to create archive directory: {}", e))
            })?;
        }
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Store(format!("Failed to open archive database: {}", e)))?;

    init_schema(&conn)?;
    tracing::debug!("Opened archive database at {:?}", db_path);
    Ok(conn)
}

/// Open a private in-memory archive (tests and dry runs).
pub fn open_in_memory() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| AppError::Store(format!("Failed to open in-memory archive: {}", e)))?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            scope_id TEXT NOT NULL,
            sender_name TEXT NOT NULL,
            event_type TEXT NOT NULL,
            doc_date TEXT NOT NULL,
            recipient_name TEXT,
            text_content TEXT NOT NULL DEFAULT '',
            embedding BLOB,
            original_url TEXT,
            thumbnail_url TEXT,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_scope_created
            ON documents(scope_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS org_settings (
            scope_id TEXT PRIMARY KEY,
            event_types TEXT NOT NULL DEFAULT '[]',
            sender_names TEXT NOT NULL DEFAULT '[]',
            recipient_names TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS org_members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scope_id TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_org_members_name
            ON org_members(scope_id, first_name, last_name);
        "#,
    )
    .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

    Ok(())
}

//! SQLite-backed tenant directory.

use crate::db;
use crate::directory::{display_name, Directory, TenantVocabulary};
use keepsake_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Directory over the archive's `org_members` and `org_settings` tables.
#[derive(Clone)]
pub struct SqliteDirectory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDirectory {
    pub fn open(db_path: &Path) -> AppResult<Self> {
        Ok(Self::from_connection(db::open_archive(db_path)?))
    }

    pub fn in_memory() -> AppResult<Self> {
        Ok(Self::from_connection(db::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Replace a tenant's vocabulary.
    pub async fn set_vocabulary(&self, scope_id: &str, vocabulary: &TenantVocabulary) -> AppResult<()> {
        let scope_id = scope_id.to_string();
        let event_types = serde_json::to_string(&vocabulary.event_types)?;
        let sender_names = serde_json::to_string(&vocabulary.sender_names)?;
        let recipient_names = serde_json::to_string(&vocabulary.recipient_names)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO org_settings (scope_id, event_types, sender_names, recipient_names) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(scope_id) DO UPDATE SET \
                    event_types = excluded.event_types, \
                    sender_names = excluded.sender_names, \
                    recipient_names = excluded.recipient_names",
                params![scope_id, event_types, sender_names, recipient_names],
            )
            .map_err(|e| AppError::Directory(format!("Failed to save vocabulary: {}", e)))?;
            Ok(())
        })
        .await
    }

    /// Add a tenant member. Returns `false` when the member already exists.
    pub async fn add_member(&self, scope_id: &str, first_name: &str, last_name: &str) -> AppResult<bool> {
        let (scope_id, first, last) = (
            scope_id.to_string(),
            first_name.to_string(),
            last_name.to_string(),
        );

        self.with_conn(move |conn| {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO org_members (scope_id, first_name, last_name) \
                     VALUES (?1, ?2, ?3)",
                    params![scope_id, first, last],
                )
                .map_err(|e| AppError::Directory(format!("Failed to add member: {}", e)))?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn with_conn<T, F>(&self, work: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::Directory("Directory connection lock poisoned".to_string()))?;
            work(&guard)
        })
        .await
        .map_err(|e| AppError::Directory(format!("Directory task failed: {}", e)))?
    }
}

fn parse_list(raw: &str, column: &str) -> AppResult<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Directory(format!("Invalid {} in org settings: {}", column, e)))
}

#[async_trait::async_trait]
impl Directory for SqliteDirectory {
    async fn member_names(&self, scope_id: &str) -> AppResult<Vec<String>> {
        let scope_id = scope_id.to_string();

        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT first_name, last_name FROM org_members WHERE scope_id = ?1 ORDER BY id")
                .map_err(|e| AppError::Directory(format!("Failed to prepare member query: {}", e)))?;

            let rows = stmt
                .query_map(params![scope_id], |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    ))
                })
                .map_err(|e| AppError::Directory(format!("Failed to query members: {}", e)))?;

            let mut names = Vec::new();
            for row in rows {
                let (first, last) =
                    row.map_err(|e| AppError::Directory(format!("Failed to read member: {}", e)))?;
                names.extend(display_name(&first, &last));
            }
            Ok(names)
        })
        .await
    }

    async fn vocabulary(&self, scope_id: &str) -> AppResult<TenantVocabulary> {
        let scope_id = scope_id.to_string();

        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT event_types, sender_names, recipient_names FROM org_settings WHERE scope_id = ?1",
                    params![scope_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| AppError::Directory(format!("Failed to read org settings: {}", e)))?;

            match row {
                Some((events, senders, recipients)) => Ok(TenantVocabulary {
                    event_types: parse_list(&events, "event_types")?,
                    sender_names: parse_list(&senders, "sender_names")?,
                    recipient_names: parse_list(&recipients, "recipient_names")?,
                }),
                None => Ok(TenantVocabulary::default()),
            }
        })
        .await
    }
}

//! Narrow adapters to the client directory and the document store.

use crate::models::{ClientRecord, DocumentRecord, NewDocument};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::path::PathBuf;
use storage::models::{ClientRow, DocumentRow};

/// Read-only view of the client records.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Clients whose display name contains `needle` (case-insensitive),
    /// deleted records excluded.
    async fn search(&self, needle: &str) -> anyhow::Result<Vec<ClientRecord>>;

    async fn get(&self, id: i64) -> anyhow::Result<Option<ClientRecord>>;
}

/// Document records. Creation is not idempotent and is never retried.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(&self, doc: &NewDocument) -> anyhow::Result<i64>;

    async fn list_for_client(&self, client_id: i64) -> anyhow::Result<Vec<DocumentRecord>>;
}

pub struct SqliteClientDirectory {
    pool: SqlitePool,
}

impl SqliteClientDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn to_record(row: ClientRow) -> ClientRecord {
    ClientRecord {
        id: row.id,
        name: row.name,
        folder: row.folder.map(PathBuf::from),
        language: row.language,
    }
}

#[async_trait]
impl ClientDirectory for SqliteClientDirectory {
    async fn search(&self, needle: &str) -> anyhow::Result<Vec<ClientRecord>> {
        let rows = sqlx::query_as::<_, ClientRow>(
            "SELECT id, name, folder, language, deleted FROM clients \
             WHERE deleted = 0 AND name LIKE ?1 ORDER BY name",
        )
        .bind(format!("%{}%", needle))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_record).collect())
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<ClientRecord>> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT id, name, folder, language, deleted FROM clients \
             WHERE deleted = 0 AND id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_record))
    }
}

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create_document(&self, doc: &NewDocument) -> anyhow::Result<i64> {
        let res = sqlx::query(
            "INSERT INTO documents \
             (client_id, name, disk_name, rel_path, kind, created_by, language, note, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(doc.client_id)
        .bind(&doc.name)
        .bind(&doc.disk_name)
        .bind(&doc.rel_path)
        .bind(doc.kind.as_str())
        .bind(&doc.created_by)
        .bind(doc.language.clone())
        .bind(doc.note.clone())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    async fn list_for_client(&self, client_id: i64) -> anyhow::Result<Vec<DocumentRecord>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, client_id, name, disk_name, rel_path, kind, created_by, \
             source_template, language, note, created_at FROM documents \
             WHERE client_id = ?1 ORDER BY id",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| DocumentRecord {
                id: row.id,
                client_id: row.client_id,
                name: row.name,
                disk_name: row.disk_name,
                rel_path: row.rel_path,
                kind: row.kind,
                created_by: row.created_by,
                language: row.language,
                note: row.note,
            })
            .collect())
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the `clients` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ClientRow {
    pub id: i64,
    pub name: String,
    pub folder: Option<String>,
    pub language: Option<String>,
    pub deleted: i64,
}

/// One row of the `documents` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    pub disk_name: String,
    pub rel_path: String,
    pub kind: String,
    pub created_by: Option<String>,
    pub source_template: Option<String>,
    pub language: Option<String>,
    pub note: Option<String>,
    pub created_at: i64,
}

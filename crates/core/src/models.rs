use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A client as seen by this subsystem: read-only, owned by the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: i64,
    pub name: String,
    /// Base folder the client's documents live under. May be unset.
    pub folder: Option<PathBuf>,
    pub language: Option<String>,
}

/// Fields for a document row about to be inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub client_id: i64,
    pub name: String,
    pub disk_name: String,
    /// Path relative to the client's base folder.
    pub rel_path: String,
    pub kind: DocumentKind,
    pub created_by: String,
    pub language: Option<String>,
    pub note: Option<String>,
}

/// A committed document record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    pub disk_name: String,
    pub rel_path: String,
    pub kind: String,
    pub created_by: Option<String>,
    pub language: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Downloaded,
    Generated,
    Uploaded,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Downloaded => "downloaded",
            DocumentKind::Generated => "generated",
            DocumentKind::Uploaded => "uploaded",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Assignment sessions: candidate in, client picked, file moved, record
//! written.
//!
//! Sessions run strictly one at a time on the interactive side; candidates
//! arriving meanwhile stay queued in the watcher channel. The commit is
//! two-phase (move, then record) and never rolls the move back: a record
//! failure leaves the file at its destination and logs it as an orphan.

use crate::gateway::{ClientDirectory, DocumentStore};
use crate::models::{ClientRecord, DocumentKind, NewDocument};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Language written to records when the client has none configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Frontend hook that resolves a candidate to a client, however it likes
/// (console prompt, dialog, test script). `None` cancels the session.
#[async_trait]
pub trait ClientPicker: Send + Sync {
    async fn pick(
        &self,
        path: &Path,
        directory: &dyn ClientDirectory,
    ) -> anyhow::Result<Option<ClientRecord>>;
}

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("client '{0}' has no base folder configured")]
    NoFolder(String),
    #[error("filesystem operation failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("document record not created; file remains at {}", orphan.display())]
    Metadata {
        orphan: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("client selection failed: {0}")]
    Picker(#[source] anyhow::Error),
}

#[derive(Debug)]
pub enum SessionOutcome {
    Completed(CompletedAssignment),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CompletedAssignment {
    pub client_id: i64,
    pub client_name: String,
    pub document_id: i64,
    pub destination: PathBuf,
    pub final_name: String,
}

type CompletedHook = Box<dyn Fn(i64, i64) + Send + Sync>;

pub struct AssignmentCoordinator {
    clients: Arc<dyn ClientDirectory>,
    documents: Arc<dyn DocumentStore>,
    picker: Arc<dyn ClientPicker>,
    acting_user: String,
    on_completed: Vec<CompletedHook>,
}

impl AssignmentCoordinator {
    pub fn new(
        clients: Arc<dyn ClientDirectory>,
        documents: Arc<dyn DocumentStore>,
        picker: Arc<dyn ClientPicker>,
        acting_user: impl Into<String>,
    ) -> Self {
        Self {
            clients,
            documents,
            picker,
            acting_user: acting_user.into(),
            on_completed: Vec::new(),
        }
    }

    /// Registers a hook fired with `(client_id, document_id)` on every
    /// completed assignment.
    pub fn subscribe(&mut self, hook: impl Fn(i64, i64) + Send + Sync + 'static) {
        self.on_completed.push(Box::new(hook));
    }

    /// Runs one assignment session for a settled download.
    pub async fn handle_candidate(&self, path: &Path) -> Result<SessionOutcome, AssignError> {
        if !path.exists() {
            // Gone between emission and the session opening; nothing to do.
            warn!(path = %path.display(), "candidate disappeared before assignment");
            return Ok(SessionOutcome::Cancelled);
        }
        let client = match self.picker.pick(path, self.clients.as_ref()).await {
            Ok(Some(client)) => client,
            Ok(None) => return Ok(SessionOutcome::Cancelled),
            Err(e) => return Err(AssignError::Picker(e)),
        };
        Ok(SessionOutcome::Completed(
            self.assign_to(path, &client, None).await?,
        ))
    }

    /// Commits `source` into the client's base folder and records it.
    pub async fn assign_to(
        &self,
        source: &Path,
        client: &ClientRecord,
        note: Option<String>,
    ) -> Result<CompletedAssignment, AssignError> {
        let base = client
            .folder
            .as_deref()
            .ok_or_else(|| AssignError::NoFolder(client.name.clone()))?;
        if !base.is_dir() {
            fs::create_dir_all(base)?;
        }

        let destination = resolve_destination(base, source);
        let final_name = destination
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download")
            .to_string();

        move_file(source, &destination)?;

        let doc = NewDocument {
            client_id: client.id,
            name: final_name.clone(),
            disk_name: final_name.clone(),
            rel_path: final_name.clone(),
            kind: DocumentKind::Downloaded,
            created_by: self.acting_user.clone(),
            language: client
                .language
                .clone()
                .or_else(|| Some(DEFAULT_LANGUAGE.to_string())),
            note: note.or_else(|| {
                Some(format!(
                    "picked up from {}",
                    source.parent().unwrap_or_else(|| Path::new("")).display()
                ))
            }),
        };
        let document_id = match self.documents.create_document(&doc).await {
            Ok(id) => id,
            Err(e) => {
                // The file already left its origin; keep it where it is and
                // let an operator associate it by hand.
                error!(
                    orphaned_file = %destination.display(),
                    error = %e,
                    "record insert failed after move"
                );
                return Err(AssignError::Metadata {
                    orphan: destination,
                    source: e,
                });
            }
        };

        info!(
            client = %client.name,
            file = %final_name,
            document_id,
            "assignment completed"
        );
        for hook in &self.on_completed {
            hook(client.id, document_id);
        }

        Ok(CompletedAssignment {
            client_id: client.id,
            client_name: client.name.clone(),
            document_id,
            destination,
            final_name,
        })
    }
}

/// First free name under `base`: the original basename, else `stem_1.ext`,
/// `stem_2.ext`, ... The probe is not atomic against concurrent creators;
/// a race shows up as the subsequent move failing.
pub fn resolve_destination(base: &Path, source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    let first = base.join(name);
    if !first.exists() {
        return first;
    }
    let stem = first
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("download")
        .to_string();
    let ext = first
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();
    let mut counter = 1;
    loop {
        let candidate_name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        let candidate = base.join(candidate_name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Rename when source and destination share a volume, otherwise copy then
/// delete. On any failure the source is left usable and no half-written
/// destination survives.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => match fs::copy(from, to) {
            Ok(_) => {
                if let Err(e) = fs::remove_file(from) {
                    let _ = fs::remove_file(to);
                    return Err(e);
                }
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(to);
                Err(e)
            }
        },
    }
}

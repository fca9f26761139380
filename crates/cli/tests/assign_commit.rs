use async_trait::async_trait;
use docassign_core::coordinator::{
    AssignError, AssignmentCoordinator, ClientPicker, SessionOutcome,
};
use docassign_core::gateway::{
    ClientDirectory, DocumentStore, SqliteClientDirectory, SqliteDocumentStore,
};
use docassign_core::models::{ClientRecord, DocumentRecord, NewDocument};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory stub for sessions that never search.
struct NoDirectory;

#[async_trait]
impl ClientDirectory for NoDirectory {
    async fn search(&self, _needle: &str) -> anyhow::Result<Vec<ClientRecord>> {
        Ok(Vec::new())
    }
    async fn get(&self, _id: i64) -> anyhow::Result<Option<ClientRecord>> {
        Ok(None)
    }
}

/// Store that refuses every insert.
struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn create_document(&self, _doc: &NewDocument) -> anyhow::Result<i64> {
        anyhow::bail!("store offline")
    }
    async fn list_for_client(&self, _client_id: i64) -> anyhow::Result<Vec<DocumentRecord>> {
        anyhow::bail!("store offline")
    }
}

/// Picker that always cancels.
struct CancelPicker;

#[async_trait]
impl ClientPicker for CancelPicker {
    async fn pick(
        &self,
        _path: &Path,
        _directory: &dyn ClientDirectory,
    ) -> anyhow::Result<Option<ClientRecord>> {
        Ok(None)
    }
}

fn client(id: i64, folder: Option<PathBuf>) -> ClientRecord {
    ClientRecord {
        id,
        name: format!("Client {id}"),
        folder,
        language: None,
    }
}

fn coordinator_with(store: Arc<dyn DocumentStore>) -> AssignmentCoordinator {
    AssignmentCoordinator::new(Arc::new(NoDirectory), store, Arc::new(CancelPicker), "tester")
}

#[tokio::test]
async fn collision_lands_on_counter_suffix_and_record_matches() {
    let temp = tempfile::tempdir().unwrap();
    let downloads = temp.path().join("downloads");
    let base = temp.path().join("clients").join("c1");
    std::fs::create_dir_all(&downloads).unwrap();
    std::fs::create_dir_all(&base).unwrap();
    std::fs::write(base.join("quote.pdf"), b"already there").unwrap();
    let source = downloads.join("quote.pdf");
    std::fs::write(&source, b"new download").unwrap();

    let db_url = "sqlite://file:assign_collision?mode=memory&cache=shared";
    let pool = storage::connect(db_url).await.unwrap();
    storage::migrate(&pool).await.unwrap();
    sqlx::query("INSERT INTO clients(name, folder) VALUES ('C1', ?1)")
        .bind(base.to_string_lossy().into_owned())
        .execute(&pool)
        .await
        .unwrap();

    let clients: Arc<dyn ClientDirectory> = Arc::new(SqliteClientDirectory::new(pool.clone()));
    let picked = clients.get(1).await.unwrap().expect("seeded client");
    let coordinator = AssignmentCoordinator::new(
        clients,
        Arc::new(SqliteDocumentStore::new(pool.clone())),
        Arc::new(CancelPicker),
        "tester",
    );

    let done = coordinator.assign_to(&source, &picked, None).await.unwrap();
    assert_eq!(done.final_name, "quote_1.pdf");
    assert!(base.join("quote_1.pdf").exists());
    // The pre-existing file is untouched.
    assert_eq!(std::fs::read(base.join("quote.pdf")).unwrap(), b"already there");

    let rel: String = sqlx::query_scalar("SELECT rel_path FROM documents WHERE id = ?1")
        .bind(done.document_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rel, "quote_1.pdf");
}

#[tokio::test]
async fn metadata_failure_leaves_orphan_in_place() {
    let temp = tempfile::tempdir().unwrap();
    let downloads = temp.path().join("downloads");
    let base = temp.path().join("clients").join("c1");
    std::fs::create_dir_all(&downloads).unwrap();
    let source = downloads.join("x.pdf");
    std::fs::write(&source, b"bytes").unwrap();

    let coordinator = coordinator_with(Arc::new(FailingStore));
    let err = coordinator
        .assign_to(&source, &client(1, Some(base.clone())), None)
        .await
        .unwrap_err();

    match err {
        AssignError::Metadata { orphan, .. } => assert_eq!(orphan, base.join("x.pdf")),
        other => panic!("expected metadata failure, got {other:?}"),
    }
    // The move is not rolled back.
    assert!(!source.exists());
    assert!(base.join("x.pdf").exists());
}

#[tokio::test]
async fn client_without_folder_aborts_before_any_move() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("x.pdf");
    std::fs::write(&source, b"bytes").unwrap();

    let coordinator = coordinator_with(Arc::new(FailingStore));
    let err = coordinator
        .assign_to(&source, &client(7, None), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AssignError::NoFolder(_)));
    assert!(source.exists());
}

#[tokio::test]
async fn missing_base_folder_is_created() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("report.docx");
    std::fs::write(&source, b"bytes").unwrap();
    // Two levels deep, nothing exists yet.
    let base = temp.path().join("archive").join("c9");

    let db_url = "sqlite://file:assign_mkdir?mode=memory&cache=shared";
    let pool = storage::connect(db_url).await.unwrap();
    storage::migrate(&pool).await.unwrap();
    let coordinator = coordinator_with(Arc::new(SqliteDocumentStore::new(pool)));

    let done = coordinator
        .assign_to(&source, &client(9, Some(base.clone())), None)
        .await
        .unwrap();
    assert_eq!(done.destination, base.join("report.docx"));
    assert!(base.join("report.docx").exists());
}

#[tokio::test]
async fn cancellation_leaves_source_untouched() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("keep.pdf");
    std::fs::write(&source, b"bytes").unwrap();

    let coordinator = coordinator_with(Arc::new(FailingStore));
    let outcome = coordinator.handle_candidate(&source).await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Cancelled));
    assert!(source.exists());
}

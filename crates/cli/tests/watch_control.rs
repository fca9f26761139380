use docassign_core::config::{
    AppConfig, ClassifierConfig, DatabaseConfig, OracleConfig, WatchConfig,
};
use docassign_core::watcher::{DownloadWatcher, WatchError, WatchEvent, CANDIDATE_QUEUE_DEPTH};
use std::path::Path;
use std::time::Duration;

fn test_config(downloads: &Path) -> AppConfig {
    AppConfig {
        database: DatabaseConfig {
            path: ":memory:".into(),
        },
        watch: WatchConfig {
            directory: downloads.to_string_lossy().into_owned(),
            stop_join_ms: 3000,
            dedup_window_ms: 5000,
        },
        classifier: ClassifierConfig::default(),
        oracle: OracleConfig {
            initial_wait_ms: 40,
            recheck_wait_ms: 40,
            ..OracleConfig::default()
        },
    }
}

#[tokio::test]
async fn start_rejects_missing_directory() {
    let temp = tempfile::tempdir().unwrap();
    let gone = temp.path().join("not-there");
    let cfg = test_config(&gone);
    let (tx, _rx) = tokio::sync::mpsc::channel(CANDIDATE_QUEUE_DEPTH);
    let mut watcher = DownloadWatcher::new(&cfg);
    let err = watcher.start(&gone, tx).unwrap_err();
    assert!(matches!(err, WatchError::InvalidTarget(_)));
    assert!(!watcher.is_running());
}

#[tokio::test]
async fn start_rejects_plain_file_target() {
    let temp = tempfile::tempdir().unwrap();
    let file = temp.path().join("file.txt");
    std::fs::write(&file, b"x").unwrap();
    let cfg = test_config(&file);
    let (tx, _rx) = tokio::sync::mpsc::channel(CANDIDATE_QUEUE_DEPTH);
    let mut watcher = DownloadWatcher::new(&cfg);
    assert!(matches!(
        watcher.start(&file, tx),
        Err(WatchError::InvalidTarget(_))
    ));
}

#[tokio::test]
async fn second_start_is_a_no_op() {
    let temp = tempfile::tempdir().unwrap();
    let cfg = test_config(temp.path());
    let (tx, _rx) = tokio::sync::mpsc::channel(CANDIDATE_QUEUE_DEPTH);
    let (tx2, _rx2) = tokio::sync::mpsc::channel(CANDIDATE_QUEUE_DEPTH);
    let mut watcher = DownloadWatcher::new(&cfg);
    watcher.start(temp.path(), tx).unwrap();
    watcher.start(temp.path(), tx2).unwrap();
    assert!(watcher.is_running());
    watcher.stop();
    assert!(!watcher.is_running());
}

#[tokio::test]
async fn scratch_files_never_surface_and_stop_silences_the_channel() {
    let temp = tempfile::tempdir().unwrap();
    let downloads = temp.path().join("downloads");
    std::fs::create_dir_all(&downloads).unwrap();
    let cfg = test_config(&downloads);
    let (tx, mut rx) = tokio::sync::mpsc::channel(CANDIDATE_QUEUE_DEPTH);
    let mut watcher = DownloadWatcher::new(&cfg);
    watcher.start(&downloads, tx).unwrap();

    std::fs::write(downloads.join("report.pdf.part"), b"partial").unwrap();
    std::fs::write(downloads.join(".DS_Store"), b"junk").unwrap();
    std::fs::write(downloads.join("~$budget.xlsx"), b"office scratch").unwrap();

    // Long enough for the probe window; nothing should come through.
    let quiet = tokio::time::timeout(Duration::from_millis(800), rx.recv()).await;
    assert!(quiet.is_err(), "scratch artifacts surfaced: {quiet:?}");

    std::fs::write(downloads.join("report.pdf"), b"real content").unwrap();
    let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("candidate within timeout")
        .expect("channel open");
    assert_eq!(
        event,
        WatchEvent::Candidate(downloads.join("report.pdf"))
    );

    watcher.stop();
    // The worker is gone, so the sender side is gone too.
    let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("recv should resolve after stop");
    assert_eq!(closed, None);
}

#[tokio::test]
async fn stop_without_start_is_safe() {
    let temp = tempfile::tempdir().unwrap();
    let cfg = test_config(temp.path());
    let mut watcher = DownloadWatcher::new(&cfg);
    watcher.stop();
    watcher.stop();
    assert!(!watcher.is_running());
}

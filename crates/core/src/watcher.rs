//! Download-directory watcher.
//!
//! Owns the OS event source on a dedicated worker thread. Raw events are
//! classified and probed for stability in arrival order; surviving paths are
//! offered to the interactive side over a bounded channel. The worker never
//! blocks on interactive work.

use crate::classifier::{self, Verdict};
use crate::config::{AppConfig, ClassifierConfig};
use crate::oracle::{Stability, StabilityOracle};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, warn};

/// Capacity of the candidate queue between watcher and interactive side.
pub const CANDIDATE_QUEUE_DEPTH: usize = 64;

/// What the watcher sends to the interactive side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// An absolute path that passed the classifier and settled.
    Candidate(PathBuf),
    /// The OS event source failed; the watcher has shut itself down.
    Crashed(String),
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("watch target does not exist or is not a directory: {0}")]
    InvalidTarget(PathBuf),
    #[error("event source setup failed: {0}")]
    Init(#[from] notify::Error),
    #[error("worker thread could not be spawned: {0}")]
    Spawn(#[from] std::io::Error),
}

pub struct DownloadWatcher {
    classifier: ClassifierConfig,
    oracle: StabilityOracle,
    dedup_window: Duration,
    stop_join: Duration,
    running: Option<WorkerHandle>,
}

struct WorkerHandle {
    stop: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl DownloadWatcher {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            classifier: cfg.classifier.clone(),
            oracle: StabilityOracle::new(cfg.oracle.clone()),
            dedup_window: Duration::from_millis(cfg.watch.dedup_window_ms),
            stop_join: Duration::from_millis(cfg.watch.stop_join_ms),
            running: None,
        }
    }

    /// Begins observing `directory` (non-recursive) and emitting onto `tx`.
    ///
    /// A second call while already running is a no-op. The event source is
    /// created here and torn down by the worker; nothing survives a
    /// start/stop cycle.
    pub fn start(&mut self, directory: &Path, tx: Sender<WatchEvent>) -> Result<(), WatchError> {
        if let Some(worker) = &self.running {
            if !worker.handle.is_finished() {
                warn!(dir = %directory.display(), "watcher already running; start ignored");
                return Ok(());
            }
            // The previous worker ended on its own (event source failure).
            let _ = self.running.take().map(|w| w.handle.join());
        }
        if !directory.is_dir() {
            return Err(WatchError::InvalidTarget(directory.to_path_buf()));
        }

        let (raw_tx, raw_rx) = std::sync::mpsc::channel();
        // TODO: expose the poll fallback interval; 2 s under-samples slow
        // network mounts.
        let mut source: RecommendedWatcher = Watcher::new(
            raw_tx,
            notify::Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        source.watch(directory, RecursiveMode::NonRecursive)?;

        let stop = Arc::new(AtomicBool::new(false));
        let worker = WorkerLoop {
            _source: source,
            raw_rx,
            tx,
            stop: stop.clone(),
            classifier: self.classifier.clone(),
            oracle: self.oracle.clone(),
            dedup_window: self.dedup_window,
            recent: HashMap::new(),
        };
        let handle = thread::Builder::new()
            .name("download-watcher".into())
            .spawn(move || worker.run())?;
        self.running = Some(WorkerHandle { stop, handle });
        Ok(())
    }

    /// Requests shutdown and waits for the worker, bounded by the configured
    /// join budget. Safe to call when not running. After return no further
    /// events are emitted.
    pub fn stop(&mut self) {
        let Some(worker) = self.running.take() else {
            return;
        };
        worker.stop.store(true, Ordering::Relaxed);
        let deadline = Instant::now() + self.stop_join;
        while !worker.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(25));
        }
        if worker.handle.is_finished() {
            let _ = worker.handle.join();
        } else {
            // Mid-probe; the stop flag gates its sends, so let it wind down
            // on its own.
            warn!("watcher worker still settling after join budget; detached");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|w| !w.handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for DownloadWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WorkerLoop {
    _source: RecommendedWatcher,
    raw_rx: std::sync::mpsc::Receiver<notify::Result<Event>>,
    tx: Sender<WatchEvent>,
    stop: Arc<AtomicBool>,
    classifier: ClassifierConfig,
    oracle: StabilityOracle,
    dedup_window: Duration,
    recent: HashMap<PathBuf, Instant>,
}

impl WorkerLoop {
    fn run(mut self) {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            match self.raw_rx.recv_timeout(Duration::from_millis(250)) {
                Ok(Ok(event)) => self.handle_raw(event),
                Ok(Err(e)) => {
                    error!(error = %e, "event source failed");
                    self.send(WatchEvent::Crashed(e.to_string()));
                    break;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    error!("event source channel closed unexpectedly");
                    self.send(WatchEvent::Crashed("event source disconnected".into()));
                    break;
                }
            }
        }
    }

    fn handle_raw(&mut self, event: Event) {
        // Modifications are observed too: a path first seen mid-write gets
        // another look when the writer finishes.
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        for path in event.paths {
            if self.stop.load(Ordering::Relaxed) {
                return;
            }
            self.consider(path);
        }
    }

    fn consider(&mut self, path: PathBuf) {
        if path.is_dir() {
            return;
        }
        match classifier::classify(&path, &self.classifier) {
            Verdict::Accept => {}
            verdict => {
                debug!(path = %path.display(), ?verdict, "classifier rejected");
                return;
            }
        }
        if self.recently_emitted(&path) {
            debug!(path = %path.display(), "repeat event inside dedup window");
            return;
        }
        match self.oracle.probe(&path) {
            Stability::Stable => {
                self.recent.insert(path.clone(), Instant::now());
                if !self.stop.load(Ordering::Relaxed) {
                    self.send(WatchEvent::Candidate(path));
                }
            }
            verdict => debug!(path = %path.display(), ?verdict, "not emitted"),
        }
    }

    fn recently_emitted(&mut self, path: &Path) -> bool {
        let now = Instant::now();
        self.recent
            .retain(|_, emitted| now.duration_since(*emitted) < self.dedup_window);
        self.recent.contains_key(path)
    }

    fn send(&self, event: WatchEvent) {
        // try_send keeps the worker from ever blocking on interactive work;
        // a dropped candidate comes back on the path's next event.
        if let Err(e) = self.tx.try_send(event) {
            warn!(error = %e, "candidate queue full or closed; event dropped");
        }
    }
}

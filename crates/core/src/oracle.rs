//! Settle detection for freshly downloaded files.
//!
//! Two size samples across a short window are enough for browsers that
//! pre-allocate and finalize via rename; anything still being written shows
//! up as a size change and gets revisited on its next filesystem event.

use crate::config::OracleConfig;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Stable,
    /// A writer is still active; a fresh event will arrive when it finishes.
    Unstable,
    Vanished,
    /// Zero bytes with an extension that has no legitimate empty form.
    EmptyRejected,
}

/// Blocking probe, run on the watcher's worker thread. Total wait is bounded
/// by `initial_wait_ms * 2 + recheck_wait_ms`.
#[derive(Debug, Clone)]
pub struct StabilityOracle {
    cfg: OracleConfig,
}

impl StabilityOracle {
    pub fn new(cfg: OracleConfig) -> Self {
        Self { cfg }
    }

    pub fn probe(&self, path: &Path) -> Stability {
        let initial = Duration::from_millis(self.cfg.initial_wait_ms);
        let recheck = Duration::from_millis(self.cfg.recheck_wait_ms);

        thread::sleep(initial);
        let mut first = match file_size(path) {
            Some(s) => s,
            None => return Stability::Vanished,
        };

        if first == 0 {
            // Give slow writers one more settle window before giving up.
            thread::sleep(initial);
            first = match file_size(path) {
                Some(s) => s,
                None => return Stability::Vanished,
            };
            if first == 0 && !self.empty_allowed(path) {
                debug!(path = %path.display(), "zero-byte file rejected");
                return Stability::EmptyRejected;
            }
        }

        thread::sleep(recheck);
        let second = match file_size(path) {
            Some(s) => s,
            None => return Stability::Vanished,
        };

        if second != first {
            debug!(
                path = %path.display(),
                first, second, "size changed across sample window"
            );
            return Stability::Unstable;
        }
        if second == 0 && !self.empty_allowed(path) {
            return Stability::EmptyRejected;
        }
        Stability::Stable
    }

    fn empty_allowed(&self, path: &Path) -> bool {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => format!(".{}", e.to_lowercase()),
            None => return false,
        };
        self.cfg
            .zero_byte_whitelist
            .iter()
            .any(|w| w.to_lowercase() == ext)
    }
}

/// Any read failure counts as gone; the probe must never hang or error out.
fn file_size(path: &Path) -> Option<u64> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}

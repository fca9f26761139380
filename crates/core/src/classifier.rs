//! Name-based filtering of scratch artifacts. Pure; never touches the disk.

use crate::config::ClassifierConfig;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// In-progress browser download or editor scratch file.
    RejectTemporary,
    /// Dotfile.
    RejectHidden,
}

/// Classifies a path by its basename. Rules run in order, first match wins:
/// configured suffixes (compared case-insensitively), then configured
/// prefixes, where the bare-dot prefix marks hidden rather than temporary.
pub fn classify(path: &Path, rules: &ClassifierConfig) -> Verdict {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        // Non-UTF8 or trailing `..`; nothing a browser produces.
        None => return Verdict::RejectTemporary,
    };
    let lower = name.to_lowercase();

    for suffix in &rules.temporary_suffixes {
        if lower.ends_with(&suffix.to_lowercase()) {
            return Verdict::RejectTemporary;
        }
    }

    for prefix in &rules.temporary_prefixes {
        if name.starts_with(prefix.as_str()) {
            if prefix == "." {
                return Verdict::RejectHidden;
            }
            return Verdict::RejectTemporary;
        }
    }

    Verdict::Accept
}

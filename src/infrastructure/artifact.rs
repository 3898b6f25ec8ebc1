//! Build artifact lookup

use std::path::{Path, PathBuf};

/// Finds the most recently modified file matching `pattern` under `root`.
///
/// Returns `None` when the pattern is invalid or nothing matches. Artifacts
/// are produced by external tools; this lookup only reports them.
#[must_use]
pub fn find_latest_artifact(root: &Path, pattern: &str) -> Option<PathBuf> {
    let normalized = pattern.replace('\\', "/");
    let full = root.join(normalized);

    let entries = match glob::glob(&full.to_string_lossy()) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Invalid artifact pattern");
            return None;
        }
    };

    entries
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .max_by_key(|path| path.metadata().and_then(|m| m.modified()).ok())
}

//! Scoped working directories
//!
//! Build steps that must run inside a subdirectory acquire a child
//! [`WorkingContext`] and pass it to the executor. The process-wide current
//! directory is never changed, so the parent context is intact on every exit
//! path of the step, including failures.

use crate::pipeline::PipelineError;
use std::path::{Path, PathBuf};

/// A directory commands run in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingContext {
    dir: PathBuf,
}

impl WorkingContext {
    /// Creates a context rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory of this context
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Resolves a path relative to this context
    #[must_use]
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.join(relative)
    }

    /// Acquires a child context for an existing subdirectory
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingPath`] if the subdirectory does not exist.
    pub fn enter(&self, subdir: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let dir = self.join(subdir);
        if !dir.is_dir() {
            return Err(PipelineError::MissingPath {
                what: "Directory".to_string(),
                path: dir,
            });
        }
        Ok(Self { dir })
    }

    /// Checks that a file exists relative to this context
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingPath`] naming `what` if the file is absent.
    pub fn require_file(&self, relative: impl AsRef<Path>, what: &str) -> Result<PathBuf, PipelineError> {
        let path = self.join(relative);
        if !path.is_file() {
            return Err(PipelineError::MissingPath {
                what: what.to_string(),
                path,
            });
        }
        Ok(path)
    }
}

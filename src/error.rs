//! Error types
//!
//! [`SetupError`] aborts a run before any link is touched.
//! [`ReconcileError`] is confined to a single file and never stops the run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("source-root is not a directory: {}", .0.display())]
    SourceRootNotDirectory(PathBuf),
    #[error("failed to list source-root {}: {source}", .path.display())]
    ListSourceRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("requested directories cannot be processed ({} rejected)", .0.len())]
    InvalidDirectories(Vec<DirectoryProblem>),
}

/// Why an explicitly requested top-level directory was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryProblem {
    #[error("missing directory: {}", .0.display())]
    Missing(PathBuf),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("directory excluded by rules: {}", .0.display())]
    Excluded(PathBuf),
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("target parent exists and is not a directory: {}", .0.display())]
    BadParent(PathBuf),
    #[error("target has no parent directory: {}", .0.display())]
    NoParent(PathBuf),
    #[error("cannot determine absolute path of {}: {source}", .path.display())]
    Absolute {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove existing entry: {source}")]
    Remove {
        #[source]
        source: io::Error,
    },
    #[error("cannot express {} relative to {}", .source_path.display(), .base.display())]
    RelativeLink { source_path: PathBuf, base: PathBuf },
    #[error("failed to create symlink: {source}")]
    Link {
        #[source]
        source: io::Error,
    },
}

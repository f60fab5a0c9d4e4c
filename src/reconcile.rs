//! Per-file link reconciliation
//!
//! Decides what has to happen so that a target path is a symlink to its
//! source file, and does it unless running dry.

use std::path::{Path, PathBuf};

use crate::error::ReconcileError;
use crate::fs::{EntryKind, Filesystem};
use crate::paths::{absolutize, lexical_normalize};

/// Options for reconciling a single link
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkOptions {
    /// Replace existing files and symlinks (never directories)
    pub force: bool,
    /// Decide without changing anything
    pub dry_run: bool,
}

/// Why an existing target was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// Something that resolves to a directory sits at the target
    Directory,
    /// A file or foreign symlink sits at the target and `force` is off
    Exists,
}

/// Result of reconciling one candidate file
#[derive(Debug)]
pub enum LinkOutcome {
    Created,
    Updated,
    AlreadyCorrect,
    ConflictSkipped(Conflict),
    Error(ReconcileError),
}

pub struct Reconciler<'a, F: Filesystem> {
    fs: &'a F,
    options: LinkOptions,
}

impl<'a, F: Filesystem> Reconciler<'a, F> {
    pub fn new(fs: &'a F, options: LinkOptions) -> Self {
        Self { fs, options }
    }

    /// Bring `target` in line with `source`. Failures are folded into
    /// [`LinkOutcome::Error`].
    pub fn reconcile(&self, source: &Path, target: &Path) -> LinkOutcome {
        match self.try_reconcile(source, target) {
            Ok(outcome) => outcome,
            Err(e) => LinkOutcome::Error(e),
        }
    }

    fn try_reconcile(&self, source: &Path, target: &Path) -> Result<LinkOutcome, ReconcileError> {
        let desired = absolutize(source).map_err(|e| ReconcileError::Absolute {
            path: source.to_path_buf(),
            source: e,
        })?;
        let target = absolutize(target).map_err(|e| ReconcileError::Absolute {
            path: target.to_path_buf(),
            source: e,
        })?;
        let parent = target
            .parent()
            .ok_or_else(|| ReconcileError::NoParent(target.clone()))?;

        self.ensure_parent_dir(parent)?;

        if self.points_to(&target, &desired) {
            tracing::debug!(target = %target.display(), "link already correct");
            return Ok(LinkOutcome::AlreadyCorrect);
        }

        if self.fs.entry_kind(&target).is_none() {
            if !self.options.dry_run {
                self.link(&desired, &target, parent)?;
            }
            return Ok(LinkOutcome::Created);
        }

        if self.fs.is_dir(&target) {
            return Ok(LinkOutcome::ConflictSkipped(Conflict::Directory));
        }
        if !self.options.force {
            return Ok(LinkOutcome::ConflictSkipped(Conflict::Exists));
        }

        if !self.options.dry_run {
            self.fs
                .remove_file(&target)
                .map_err(|source| ReconcileError::Remove { source })?;
            self.link(&desired, &target, parent)?;
        }
        Ok(LinkOutcome::Updated)
    }

    /// Make sure `parent` is (or will be) a directory.
    ///
    /// The nearest ancestor that is present must resolve to a directory, in
    /// dry runs as well, so both modes reach the same decision.
    fn ensure_parent_dir(&self, parent: &Path) -> Result<(), ReconcileError> {
        let present = parent
            .ancestors()
            .find(|ancestor| self.fs.entry_kind(ancestor).is_some());

        match present {
            Some(ancestor) if !self.fs.is_dir(ancestor) => {
                return Err(ReconcileError::BadParent(ancestor.to_path_buf()));
            }
            Some(ancestor) if ancestor == parent => return Ok(()),
            _ => {}
        }

        if self.options.dry_run {
            tracing::debug!(dir = %parent.display(), "would create directory");
            return Ok(());
        }

        self.fs
            .create_dir_all(parent)
            .map_err(|source| ReconcileError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })
    }

    /// Whether `target` is a symlink resolving lexically to `desired`.
    fn points_to(&self, target: &Path, desired: &Path) -> bool {
        if self.fs.entry_kind(target) != Some(EntryKind::Symlink) {
            return false;
        }
        let Ok(link) = self.fs.read_link(target) else {
            return false;
        };
        let base = target.parent().unwrap_or(target);
        lexical_normalize(&base.join(link)) == desired
    }

    fn link(&self, desired: &Path, target: &Path, parent: &Path) -> Result<(), ReconcileError> {
        let relative = relative_link(desired, parent)?;
        self.fs
            .symlink_file(&relative, target)
            .map_err(|source| ReconcileError::Link { source })
    }
}

/// Link text that reaches `source` from inside `base`.
pub fn relative_link(source: &Path, base: &Path) -> Result<PathBuf, ReconcileError> {
    pathdiff::diff_paths(source, base).ok_or_else(|| ReconcileError::RelativeLink {
        source_path: source.to_path_buf(),
        base: base.to_path_buf(),
    })
}

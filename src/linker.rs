//! Mirror driver
//!
//! Validates the requested project directories, walks each one and
//! reconciles every candidate file against the target tree.

use colored::Colorize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{DirectoryProblem, SetupError};
use crate::exclude::ExcludeSet;
use crate::fs::{Filesystem, RealFs};
use crate::paths::RelativePath;
use crate::reconcile::{Conflict, LinkOptions, LinkOutcome, Reconciler};
use crate::walker::{self, ProjectDir};

/// Options for a mirror run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Absolute directory whose top-level directories are mirrored
    pub source_root: PathBuf,
    /// Absolute directory receiving the links
    pub target_root: PathBuf,
    /// Only process these top-level directories (empty = all)
    pub only_dirs: Vec<String>,
    /// Also process top-level directories starting with '.'
    pub include_dot_dirs: bool,
    /// Replace existing files and symlinks at target paths
    pub force: bool,
    /// Show what would be done without making changes
    pub dry_run: bool,
    /// Show detailed output
    pub verbose: bool,
}

/// Counters for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub created: usize,
    pub updated: usize,
    pub already_ok: usize,
    pub skipped_excluded: usize,
    pub conflicts: usize,
    pub errors: usize,
}

impl Stats {
    /// Count one reconciliation outcome.
    pub fn record(&mut self, outcome: &LinkOutcome) {
        match outcome {
            LinkOutcome::Created => self.created += 1,
            LinkOutcome::Updated => self.updated += 1,
            LinkOutcome::AlreadyCorrect => self.already_ok += 1,
            LinkOutcome::ConflictSkipped(_) => self.conflicts += 1,
            LinkOutcome::Error(_) => self.errors += 1,
        }
    }

    /// 2 if anything failed, 1 if something was skipped, else 0.
    pub fn exit_code(&self) -> u8 {
        if self.errors > 0 {
            2
        } else if self.conflicts > 0 {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={} updated={} ok={} excluded={} conflicts={} errors={}",
            self.created,
            self.updated,
            self.already_ok,
            self.skipped_excluded,
            self.conflicts,
            self.errors
        )
    }
}

/// Mirrors project directories into the target root
pub struct Linker<F: Filesystem = RealFs> {
    options: SyncOptions,
    excludes: ExcludeSet,
    fs: F,
}

impl Linker<RealFs> {
    pub fn new(options: SyncOptions, excludes: ExcludeSet) -> Self {
        Self::with_filesystem(options, excludes, RealFs)
    }
}

impl<F: Filesystem> Linker<F> {
    /// Use `fs` for target-side queries and mutations. The source tree is
    /// always walked on disk.
    pub fn with_filesystem(options: SyncOptions, excludes: ExcludeSet, fs: F) -> Self {
        Self {
            options,
            excludes,
            fs,
        }
    }

    /// Top-level directories to process.
    ///
    /// Explicitly named directories must exist, be directories, and not be
    /// excluded; every rejected name is reported at once.
    pub fn project_dirs(&self) -> Result<Vec<ProjectDir>, SetupError> {
        let source_root = &self.options.source_root;
        if !source_root.is_dir() {
            return Err(SetupError::SourceRootNotDirectory(source_root.clone()));
        }

        if self.options.only_dirs.is_empty() {
            return walker::discover_project_dirs(
                source_root,
                self.options.include_dot_dirs,
                &self.excludes,
            )
            .map_err(|source| SetupError::ListSourceRoot {
                path: source_root.clone(),
                source,
            });
        }

        let dirs = walker::named_project_dirs(source_root, &self.options.only_dirs);
        let problems: Vec<DirectoryProblem> =
            dirs.iter().filter_map(|dir| self.check_named(dir)).collect();

        if problems.is_empty() {
            Ok(dirs)
        } else {
            Err(SetupError::InvalidDirectories(problems))
        }
    }

    fn check_named(&self, dir: &ProjectDir) -> Option<DirectoryProblem> {
        if !dir.path.exists() {
            return Some(DirectoryProblem::Missing(dir.path.clone()));
        }
        if !dir.path.is_dir() {
            return Some(DirectoryProblem::NotADirectory(dir.path.clone()));
        }
        let hidden = dir.is_dot_dir() && !self.options.include_dot_dirs;
        if hidden || self.excludes.is_excluded(&RelativePath::parse(&dir.name)) {
            return Some(DirectoryProblem::Excluded(dir.path.clone()));
        }
        None
    }

    /// Perform the mirror run
    pub fn sync(&self) -> Result<Stats, SetupError> {
        let projects = self.project_dirs()?;
        let reconciler = Reconciler::new(
            &self.fs,
            LinkOptions {
                force: self.options.force,
                dry_run: self.options.dry_run,
            },
        );

        tracing::info!(
            source_root = %self.options.source_root.display(),
            target_root = %self.options.target_root.display(),
            projects = projects.len(),
            dry_run = self.options.dry_run,
            "starting mirror run"
        );

        let mut stats = Stats::default();
        for project in &projects {
            if self.options.verbose {
                println!("{} {}", "➤".cyan(), project.name.bold());
            }

            let project_target = self.options.target_root.join(&project.name);
            let mut walk = walker::walk_project(project, &self.excludes);
            for item in walk.by_ref() {
                let candidate = match item {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        eprintln!("{}  {}", "ERROR".red(), e);
                        stats.errors += 1;
                        continue;
                    }
                };
                let target = project_target.join(&candidate.relative_path);
                let outcome = reconciler.reconcile(&candidate.source, &target);
                self.report(&candidate.source, &target, &outcome);
                stats.record(&outcome);
            }

            stats.skipped_excluded += walk.excluded();
        }

        Ok(stats)
    }

    fn report(&self, source: &Path, target: &Path, outcome: &LinkOutcome) {
        let dry_run = self.options.dry_run;
        match outcome {
            LinkOutcome::Created if dry_run => {
                println!("{} {} -> {}", "CREATE".green(), target.display(), source.display());
            }
            LinkOutcome::Updated if dry_run => {
                println!("{} {} -> {}", "UPDATE".yellow(), target.display(), source.display());
            }
            LinkOutcome::Created | LinkOutcome::Updated => {
                if self.options.verbose {
                    println!("{}   {} -> {}", "LINK".green(), target.display(), source.display());
                }
            }
            LinkOutcome::AlreadyCorrect => {
                if self.options.verbose {
                    println!("{}     {}", "OK".dimmed(), target.display());
                }
            }
            LinkOutcome::ConflictSkipped(Conflict::Directory) => {
                eprintln!("{}   {} (exists as directory)", "SKIP".yellow(), target.display());
            }
            LinkOutcome::ConflictSkipped(Conflict::Exists) => {
                eprintln!(
                    "{}   {} (exists; use --force to replace)",
                    "SKIP".yellow(),
                    target.display()
                );
            }
            LinkOutcome::Error(e) => {
                eprintln!("{}  {}: {}", "ERROR".red(), target.display(), e);
            }
        }
    }
}

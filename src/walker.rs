//! Source tree traversal
//!
//! Selects the top-level project directories and walks each one, pruning
//! excluded directories before descending into them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::exclude::ExcludeSet;
use crate::paths::RelativePath;

/// A directory directly under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDir {
    pub name: String,
    pub path: PathBuf,
}

impl ProjectDir {
    pub fn new(source_root: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: source_root.join(name),
        }
    }

    pub fn is_dot_dir(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// A file to be linked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute path of the source file
    pub source: PathBuf,
    /// Native path relative to the project directory, byte for byte
    pub relative_path: PathBuf,
    /// Forward-slash form of `relative_path`, for exclusion matching
    pub relative: RelativePath,
}

/// Every immediate subdirectory of `source_root` that is not a dot directory
/// (unless `include_dot_dirs`) and not excluded, sorted by name.
///
/// Symlinks to directories count as directories here.
pub fn discover_project_dirs(
    source_root: &Path,
    include_dot_dirs: bool,
    excludes: &ExcludeSet,
) -> io::Result<Vec<ProjectDir>> {
    let mut dirs = Vec::new();

    for entry in fs::read_dir(source_root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let project = ProjectDir::new(source_root, &name);

        if !include_dot_dirs && project.is_dot_dir() {
            tracing::debug!(dir = %name, "skipping dot directory");
            continue;
        }
        if excludes.is_excluded(&RelativePath::parse(&name)) {
            tracing::debug!(dir = %name, "skipping excluded directory");
            continue;
        }
        dirs.push(project);
    }

    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(dirs)
}

/// Explicitly named project directories, in the order given. Existence and
/// exclusion are checked by the caller.
pub fn named_project_dirs(source_root: &Path, names: &[String]) -> Vec<ProjectDir> {
    names
        .iter()
        .map(|name| ProjectDir::new(source_root, name))
        .collect()
}

/// Walk `project`, yielding candidate files and the entries that could not
/// be read.
pub fn walk_project<'a>(project: &ProjectDir, excludes: &'a ExcludeSet) -> ProjectWalk<'a> {
    let entries = WalkDir::new(&project.path)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    ProjectWalk {
        root: project.path.clone(),
        entries,
        excludes,
        excluded: 0,
    }
}

/// Iterator over the candidate files of one project directory.
///
/// Excluded directories are skipped as a whole and counted once each;
/// excluded files are counted individually.
pub struct ProjectWalk<'a> {
    root: PathBuf,
    entries: walkdir::IntoIter,
    excludes: &'a ExcludeSet,
    excluded: usize,
}

impl ProjectWalk<'_> {
    /// Directories pruned plus files skipped so far.
    pub fn excluded(&self) -> usize {
        self.excluded
    }
}

impl Iterator for ProjectWalk<'_> {
    type Item = Result<Candidate, walkdir::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read directory entry");
                    return Some(Err(e));
                }
            };

            let Ok(relative_path) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative_path = relative_path.to_path_buf();
            let relative = RelativePath::from_path(&relative_path);
            let file_type = entry.file_type();

            // Symlinks to directories are reported as directories but never entered.
            let is_dir = file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir());
            if is_dir {
                if self.excludes.is_excluded(&relative) {
                    tracing::debug!(path = %relative, "pruning excluded directory");
                    self.excluded += 1;
                    if file_type.is_dir() {
                        self.entries.skip_current_dir();
                    }
                }
                continue;
            }

            if self.excludes.is_excluded(&relative) {
                tracing::debug!(path = %relative, "skipping excluded file");
                self.excluded += 1;
                continue;
            }

            if file_type.is_file() || file_type.is_symlink() {
                return Some(Ok(Candidate {
                    source: entry.into_path(),
                    relative_path,
                    relative,
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    fn relatives(walk: ProjectWalk<'_>) -> Vec<String> {
        walk.map(|c| c.unwrap().relative.to_string()).collect()
    }

    #[test]
    fn test_discover_sorted_without_dot_or_excluded() {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["zeta", "alpha", ".hidden", "node_modules", "mid"] {
            fs::create_dir(temp_dir.path().join(dir)).unwrap();
        }
        fs::write(temp_dir.path().join("README.md"), "x").unwrap();

        let dirs = discover_project_dirs(temp_dir.path(), false, &ExcludeSet::default()).unwrap();
        let names: Vec<_> = dirs.iter().map(|d| d.name.as_str()).collect();

        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_discover_includes_dot_dirs_on_request() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join(".config")).unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let dirs = discover_project_dirs(temp_dir.path(), true, &ExcludeSet::default()).unwrap();
        let names: Vec<_> = dirs.iter().map(|d| d.name.as_str()).collect();

        // .git stays excluded by the built-in patterns
        assert_eq!(names, vec![".config"]);
    }

    #[test]
    fn test_named_dirs_keep_order() {
        let root = Path::new("/root");
        let names = vec!["b".to_string(), "a".to_string()];

        let dirs = named_project_dirs(root, &names);

        assert_eq!(dirs[0].path, PathBuf::from("/root/b"));
        assert_eq!(dirs[1].name, "a");
    }

    #[test]
    fn test_walk_yields_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "proj/a.txt");
        touch(temp_dir.path(), "proj/sub/b.txt");
        touch(temp_dir.path(), "proj/sub/deeper/c.txt");

        let project = ProjectDir::new(temp_dir.path(), "proj");
        let excludes = ExcludeSet::default();
        let files = relatives(walk_project(&project, &excludes));

        assert_eq!(files, vec!["a.txt", "sub/b.txt", "sub/deeper/c.txt"]);
    }

    #[test]
    fn test_walk_prunes_excluded_directories() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "proj/a.txt");
        touch(temp_dir.path(), "proj/.git/config");
        touch(temp_dir.path(), "proj/.git/objects/x");
        touch(temp_dir.path(), "proj/web/node_modules/pkg/index.js");

        let project = ProjectDir::new(temp_dir.path(), "proj");
        let excludes = ExcludeSet::default();
        let mut walk = walk_project(&project, &excludes);
        let files: Vec<_> = walk
            .by_ref()
            .map(|c| c.unwrap().relative.to_string())
            .collect();

        assert_eq!(files, vec!["a.txt"]);
        // One per pruned directory, nothing counted from inside them
        assert_eq!(walk.excluded(), 2);
    }

    #[test]
    fn test_walk_prunes_by_full_path_pattern() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "proj/gen/tmp/keep.txt");
        touch(temp_dir.path(), "proj/gen/out.txt");
        touch(temp_dir.path(), "proj/other/gen/tmp/x.txt");

        let project = ProjectDir::new(temp_dir.path(), "proj");
        let excludes = ExcludeSet::new(["gen/tmp"]);
        let mut walk = walk_project(&project, &excludes);
        let files: Vec<_> = walk
            .by_ref()
            .map(|c| c.unwrap().relative.to_string())
            .collect();

        assert_eq!(files, vec!["gen/out.txt", "other/gen/tmp/x.txt"]);
        assert_eq!(walk.excluded(), 1);
    }

    #[test]
    fn test_walk_counts_excluded_files() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "proj/keep.rs");
        touch(temp_dir.path(), "proj/debug.log");
        touch(temp_dir.path(), "proj/.DS_Store");

        let project = ProjectDir::new(temp_dir.path(), "proj");
        let excludes = ExcludeSet::new(["*.log"]);
        let mut walk = walk_project(&project, &excludes);
        let files: Vec<_> = walk
            .by_ref()
            .map(|c| c.unwrap().relative.to_string())
            .collect();

        assert_eq!(files, vec!["keep.rs"]);
        assert_eq!(walk.excluded(), 2);
    }

    #[test]
    #[cfg(unix)]
    fn test_walk_does_not_follow_directory_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "outside/secret.txt");
        touch(temp_dir.path(), "proj/a.txt");
        std::os::unix::fs::symlink(
            temp_dir.path().join("outside"),
            temp_dir.path().join("proj/linked"),
        )
        .unwrap();
        std::os::unix::fs::symlink("a.txt", temp_dir.path().join("proj/alias.txt")).unwrap();
        std::os::unix::fs::symlink("missing", temp_dir.path().join("proj/dangling")).unwrap();

        let project = ProjectDir::new(temp_dir.path(), "proj");
        let excludes = ExcludeSet::default();
        let files = relatives(walk_project(&project, &excludes));

        assert_eq!(files, vec!["a.txt", "alias.txt", "dangling"]);
    }

    #[test]
    #[cfg(unix)]
    fn test_symlinked_top_level_dir_is_a_project() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src");
        touch(temp_dir.path(), "real/notes.md");
        touch(&source, "plain/a.txt");
        std::os::unix::fs::symlink("../real", source.join("alias")).unwrap();

        let excludes = ExcludeSet::default();
        let dirs = discover_project_dirs(&source, false, &excludes).unwrap();
        let names: Vec<_> = dirs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alias", "plain"]);

        let walk = walk_project(&dirs[0], &excludes);
        let candidates: Vec<_> = walk.map(|c| c.unwrap()).collect();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, source.join("alias/notes.md"));
        assert_eq!(candidates[0].relative.as_str(), "notes.md");
    }

    #[test]
    #[cfg(unix)]
    fn test_walk_keeps_non_utf8_names_exact() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("proj/sub");
        fs::create_dir_all(&dir).unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.txt");
        fs::write(dir.join(name), "x").unwrap();

        let project = ProjectDir::new(temp_dir.path(), "proj");
        let excludes = ExcludeSet::default();
        let candidates: Vec<_> = walk_project(&project, &excludes)
            .map(|c| c.unwrap())
            .collect();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].relative_path, Path::new("sub").join(name));
    }

    #[test]
    #[cfg(unix)]
    fn test_walk_yields_unreadable_directories_as_errors() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "proj/a.txt");
        touch(temp_dir.path(), "proj/locked/b.txt");
        let locked = temp_dir.path().join("proj/locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Privileged users read through the mode bits.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let project = ProjectDir::new(temp_dir.path(), "proj");
        let excludes = ExcludeSet::default();
        let items: Vec<_> = walk_project(&project, &excludes).collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let errors: Vec<_> = items.iter().filter_map(|i| i.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), Some(locked.as_path()));
        assert_eq!(items.iter().filter(|i| i.is_ok()).count(), 1);
    }
}

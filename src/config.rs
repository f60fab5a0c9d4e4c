//! Configuration for linkmirror
//!
//! An optional `linkmirror.toml` at the source root supplies defaults that
//! command-line flags override. Exclusion patterns from the file are added
//! after the built-ins and before patterns given on the command line.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths::expand_tilde;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "linkmirror.toml";

/// Name of the default target directory under the user's home
pub const DEFAULT_TARGET_DIR: &str = "potato";

/// Name of the directory the tool is usually kept in within a project
pub const TOOL_DIR_NAME: &str = "scripts";

/// Contents of `linkmirror.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Target root; relative paths are resolved against the config file's directory
    #[serde(default)]
    pub target_root: Option<PathBuf>,

    /// Also process top-level directories starting with '.'
    #[serde(default)]
    pub include_dot_dirs: bool,

    /// Extra exclusion patterns
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Some(target) = config.target_root.take() {
            let target = expand_tilde(&target);
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.target_root = Some(base.join(target));
        }

        Ok(config)
    }

    /// Load `linkmirror.toml` from `source_root` if there is one.
    pub fn load_from_root(source_root: &Path) -> Result<Option<Self>> {
        let path = source_root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Nearest directory at or above `start_dir` containing `linkmirror.toml`.
    pub fn find_project_root(start_dir: &Path) -> Option<PathBuf> {
        start_dir
            .ancestors()
            .find(|dir| dir.join(CONFIG_FILE_NAME).is_file())
            .map(Path::to_path_buf)
    }
}

/// Source root used when none is given: the nearest directory holding a
/// config file, else the parent of `cwd` when run from the tool directory,
/// else `cwd`.
pub fn default_source_root(cwd: &Path) -> PathBuf {
    if let Some(root) = Config::find_project_root(cwd) {
        return root;
    }
    match cwd.parent() {
        Some(parent) if cwd.file_name().is_some_and(|n| n == TOOL_DIR_NAME) => {
            parent.to_path_buf()
        }
        _ => cwd.to_path_buf(),
    }
}

/// `~/potato`, if the home directory is known.
pub fn default_target_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_TARGET_DIR))
}

//! linkmirror - mirror a project tree with symbolic links
//!
//! Every file below the selected top-level directories of a source root gets
//! a relative symlink at the same path below a target root. Excluded paths are
//! skipped, existing entries are only replaced on request, and directories
//! are never replaced.

pub mod config;
pub mod error;
pub mod exclude;
pub mod fs;
pub mod linker;
pub mod paths;
pub mod reconcile;
pub mod walker;

pub use config::Config;
pub use error::{DirectoryProblem, ReconcileError, SetupError};
pub use exclude::{DEFAULT_EXCLUDES, ExcludeSet, is_excluded};
pub use linker::{Linker, Stats, SyncOptions};
pub use reconcile::{Conflict, LinkOptions, LinkOutcome, Reconciler};

//! linkmirror CLI
//!
//! Command-line interface for mirroring a project tree with symbolic links.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use is_terminal::IsTerminal;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use linkmirror::{
    Config, ExcludeSet, Linker, SetupError, SyncOptions,
    config::{default_source_root, default_target_root},
    paths::resolve_root,
};

/// Exit code for configuration errors and per-file failures
const EXIT_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "linkmirror")]
#[command(
    author,
    version,
    about = "Symlink files from each top-level directory under <source-root> to the same relative location under <target-root>"
)]
struct Cli {
    /// Top-level directories under the source root to process (default: all)
    dirs: Vec<String>,

    /// Source root (default: nearest directory with linkmirror.toml, else the current directory)
    #[arg(long, env = "LINKMIRROR_SOURCE_ROOT")]
    source_root: Option<PathBuf>,

    /// Target root (default: ~/potato)
    #[arg(long, env = "LINKMIRROR_TARGET_ROOT")]
    target_root: Option<PathBuf>,

    /// Path to configuration file (default: <source-root>/linkmirror.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print what would change, but don't create or modify symlinks
    #[arg(long)]
    dry_run: bool,

    /// Replace existing files and symlinks at the target path (never deletes directories)
    #[arg(long)]
    force: bool,

    /// Also process top-level directories whose name starts with '.'
    #[arg(long)]
    include_dot_dirs: bool,

    /// Exclude pattern (repeatable). With a '/', matches the whole relative
    /// path; otherwise matches any path component.
    #[arg(long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Show detailed output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if !std::io::stdout().is_terminal() || !std::io::stderr().is_terminal() {
        colored::control::set_override(false);
    }
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "ERROR:".red(), e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<u8> {
    let cwd = env::current_dir().context("Failed to determine current directory")?;

    let source_root = cli
        .source_root
        .unwrap_or_else(|| default_source_root(&cwd));
    let source_root = resolve_root(&source_root)
        .with_context(|| format!("Failed to resolve source-root: {}", source_root.display()))?;

    let config = match cli.config {
        Some(path) => Config::load(&path)?,
        None => Config::load_from_root(&source_root)?.unwrap_or_default(),
    };

    let target_root = match cli.target_root.or(config.target_root) {
        Some(path) => path,
        None => default_target_root()
            .context("Cannot determine home directory; pass --target-root")?,
    };
    let target_root = resolve_root(&target_root)
        .with_context(|| format!("Failed to resolve target-root: {}", target_root.display()))?;

    let excludes = ExcludeSet::new(config.exclude.iter().chain(cli.exclude.iter()));

    if cli.verbose {
        println!("Source root: {}", source_root.display().to_string().dimmed());
        println!("Target root: {}", target_root.display().to_string().dimmed());
    }

    let options = SyncOptions {
        source_root,
        target_root,
        only_dirs: cli.dirs,
        include_dot_dirs: cli.include_dot_dirs || config.include_dot_dirs,
        force: cli.force,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };

    let linker = Linker::new(options, excludes);
    let stats = match linker.sync() {
        Ok(stats) => stats,
        Err(SetupError::InvalidDirectories(problems)) => {
            for problem in problems {
                eprintln!("{} {}", "ERROR:".red(), problem);
            }
            return Ok(EXIT_FAILURE);
        }
        Err(e) => {
            eprintln!("{} {}", "ERROR:".red(), e);
            return Ok(EXIT_FAILURE);
        }
    };

    println!("{} {}", "Done:".bold(), stats);

    Ok(stats.exit_code())
}

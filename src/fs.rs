//! File system access used by the reconciler.
//!
//! [`Filesystem`] is the narrow set of queries and mutations needed to keep a
//! link in place. [`RealFs`] forwards to `std::fs`; [`MemoryFs`] keeps an
//! in-memory tree so reconciliation can be tested without touching disk.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::paths::lexical_normalize;

/// Kind of an entry, without following a final symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

pub trait Filesystem {
    /// Kind of the entry at `path` itself, `None` if nothing is there.
    fn entry_kind(&self, path: &Path) -> Option<EntryKind>;

    /// Whether `path` resolves to anything, following symlinks.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` resolves to a directory, following symlinks.
    fn is_dir(&self, path: &Path) -> bool;

    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a file or symlink. Never removes directories.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create a symlink at `link` whose content is `original`.
    fn symlink_file(&self, original: &Path, link: &Path) -> io::Result<()>;
}

/// The process's real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl Filesystem for RealFs {
    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        let file_type = fs::symlink_metadata(path).ok()?.file_type();
        Some(if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn symlink_file(&self, original: &Path, link: &Path) -> io::Result<()> {
        make_symlink(original, link)
    }
}

#[cfg(unix)]
fn make_symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn make_symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

const MAX_SYMLINK_HOPS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    File,
    Dir,
    Symlink(PathBuf),
}

/// In-memory tree of absolute paths.
///
/// Only the final path component is resolved through symlinks; intermediate
/// components are looked up by name. Every mutation made through the
/// [`Filesystem`] trait is counted in [`MemoryFs::writes`].
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
    writes: Cell<usize>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a regular file, creating missing parents.
    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.seed(path.as_ref(), Node::File);
    }

    /// Seed a directory, creating missing parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.seed(path.as_ref(), Node::Dir);
    }

    /// Seed a symlink at `link` pointing to `target`, creating missing parents.
    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        self.seed(link.as_ref(), Node::Symlink(target.as_ref().to_path_buf()));
    }

    /// Number of mutations performed through the [`Filesystem`] trait.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    fn seed(&self, path: &Path, node: Node) {
        let path = lexical_normalize(path);
        let mut nodes = self.nodes.borrow_mut();
        for ancestor in path.ancestors().skip(1) {
            if ancestor.parent().is_some() {
                nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
            }
        }
        nodes.insert(path, node);
    }

    fn lookup(&self, path: &Path) -> Option<Node> {
        if path.parent().is_none() {
            return Some(Node::Dir);
        }
        self.nodes.borrow().get(path).cloned()
    }

    fn resolve(&self, path: &Path) -> Option<Node> {
        let mut current = lexical_normalize(path);
        for _ in 0..MAX_SYMLINK_HOPS {
            match self.lookup(&current)? {
                Node::Symlink(target) => {
                    let base = current.parent().map(Path::to_path_buf).unwrap_or_default();
                    current = lexical_normalize(&base.join(target));
                }
                node => return Some(node),
            }
        }
        None
    }

    fn record_write(&self) {
        self.writes.set(self.writes.get() + 1);
    }
}

impl Filesystem for MemoryFs {
    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        self.lookup(&lexical_normalize(path)).map(|node| match node {
            Node::File => EntryKind::File,
            Node::Dir => EntryKind::Dir,
            Node::Symlink(_) => EntryKind::Symlink,
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.resolve(path) == Some(Node::Dir)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match self.lookup(&lexical_normalize(path)) {
            Some(Node::Symlink(target)) => Ok(target),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {}", path.display()),
            )),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = lexical_normalize(path);
        let mut ancestors: Vec<&Path> = path.ancestors().collect();
        ancestors.reverse();

        for dir in ancestors {
            if dir.parent().is_none() {
                continue;
            }
            match self.entry_kind(dir) {
                None => {
                    self.nodes.borrow_mut().insert(dir.to_path_buf(), Node::Dir);
                    self.record_write();
                }
                Some(_) if self.is_dir(dir) => {}
                Some(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("not a directory: {}", dir.display()),
                    ));
                }
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path = lexical_normalize(path);
        match self.entry_kind(&path) {
            Some(EntryKind::File | EntryKind::Symlink) => {
                self.nodes.borrow_mut().remove(&path);
                self.record_write();
                Ok(())
            }
            Some(EntryKind::Dir) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }

    fn symlink_file(&self, original: &Path, link: &Path) -> io::Result<()> {
        let link = lexical_normalize(link);
        let parent_is_dir = link.parent().is_some_and(|parent| self.is_dir(parent));
        if !parent_is_dir {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        if self.entry_kind(&link).is_some() {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        self.nodes
            .borrow_mut()
            .insert(link, Node::Symlink(original.to_path_buf()));
        self.record_write();
        Ok(())
    }
}

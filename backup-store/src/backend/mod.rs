//! Storage backend abstraction.
//!
//! The minimal file interface the manifest and content stores consume. The
//! engine's only concurrency primitive is the backend's create-only write:
//! exactly one writer may create a given path, all others observe failure.
//! The guarantee must hold across independent processes and nodes sharing
//! the same backing store; it is never replaced with an in-process lock.

pub mod local;

pub use local::LocalBackend;

use std::io;
use std::path::{Path, PathBuf};

pub trait StorageBackend: Send + Sync {
    /// Create a directory and all missing parents.
    fn create_directories(&self, path: &Path) -> io::Result<()>;

    /// Write `bytes` to a new file. Fails with [`io::ErrorKind::AlreadyExists`]
    /// when the path already holds content.
    fn write_create_only(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Write `bytes`, replacing any existing file.
    fn write_overwrite(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Read the full contents of a file, or `None` if it does not exist.
    fn read_all(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    fn exists(&self, path: &Path) -> bool;

    /// Remove a single file or an empty directory.
    fn delete(&self, path: &Path) -> io::Result<()>;

    /// Every path under `path`, directories included, `path` itself first.
    /// Empty if the root does not exist.
    fn list_recursive(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Copy one file. With `overwrite` false the copy is create-only and
    /// fails with [`io::ErrorKind::AlreadyExists`] if the destination exists.
    fn copy(&self, source: &Path, dest: &Path, overwrite: bool) -> io::Result<()>;
}

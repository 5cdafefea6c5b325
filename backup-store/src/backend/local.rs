//! Local filesystem backend.

use super::StorageBackend;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Storage backend over a local (or mounted network) filesystem.
///
/// Create-only writes use `create_new` open semantics (`O_CREAT | O_EXCL`),
/// which the filesystem guarantees to be atomic: at most one of any number
/// of concurrent writers can create a given path.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl StorageBackend for LocalBackend {
    fn create_directories(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn write_create_only(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(bytes)
    }

    fn write_overwrite(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::write(path, bytes)
    }

    fn read_all(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        if path.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn list_recursive(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(path) {
            let entry = entry.map_err(io::Error::from)?;
            paths.push(entry.path().to_path_buf());
        }
        Ok(paths)
    }

    fn copy(&self, source: &Path, dest: &Path, overwrite: bool) -> io::Result<()> {
        if overwrite {
            fs::copy(source, dest).map(|_| ())
        } else {
            let mut src = fs::File::open(source)?;
            let mut dst = OpenOptions::new().write(true).create_new(true).open(dest)?;
            io::copy(&mut src, &mut dst).map(|_| ())
        }
    }
}

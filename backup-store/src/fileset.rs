//! Logical and materialized file sets.
//!
//! A `FileSet` describes *what* files belong to a restore target and is
//! serialized inside the manifest. A `NamedFileSet` is the materialized
//! mapping of logical name to a concrete location once saved or restored;
//! each instance is exclusively owned by the operation that produced it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A single logical file belonging to a file set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedFile {
    pub name: String,
}

impl NamedFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The logical description of a file set: which file names belong to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    pub files: Vec<NamedFile>,
}

impl FileSet {
    pub fn new(files: Vec<NamedFile>) -> Self {
        Self { files }
    }

    /// Derive the logical description from a materialized set.
    pub fn of(named: &NamedFileSet) -> Self {
        Self {
            files: named.iter().map(|(name, _)| NamedFile::new(name)).collect(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }
}

/// Mapping of logical file name to the concrete path it was saved from or
/// restored to. File names are unique within the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedFileSet {
    files: BTreeMap<String, PathBuf>,
}

impl NamedFileSet {
    pub fn new(files: BTreeMap<String, PathBuf>) -> Self {
        Self { files }
    }

    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.files.insert(name.into(), path.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.files.iter().map(|(n, p)| (n.as_str(), p.as_path()))
    }

    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.files.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(String, PathBuf)> for NamedFileSet {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

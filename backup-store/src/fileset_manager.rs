//! Content persistence for the named file sets of a backup attempt.
//!
//! Files land under
//! `{base}/contents/{partitionId}/{checkpointId}/{nodeId}/{fileSetName}/{fileName}`.
//! The content store only moves bytes; a backup attempt's true status is
//! determined solely by its manifest.

use crate::backend::StorageBackend;
use crate::error::{BackupStoreError, Result};
use crate::fileset::{FileSet, NamedFileSet};
use crate::identifier::BackupIdentifier;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const CONTENTS_DIR: &str = "contents";

pub struct FileSetManager {
    backend: Arc<dyn StorageBackend>,
    base_path: PathBuf,
}

impl FileSetManager {
    pub fn new(backend: Arc<dyn StorageBackend>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            base_path: base_path.into(),
        }
    }

    /// Persist every file of `file_set` with create-only semantics.
    ///
    /// Either every file is newly written or the call fails after writing a
    /// strict subset. No rollback is performed; callers must treat a partial
    /// write as failure and recover via [`delete`](Self::delete) plus retry.
    /// A file that already landed is reported as
    /// [`BackupStoreError::AlreadyExists`], distinct from backend outages.
    pub fn save(
        &self,
        id: &BackupIdentifier,
        file_set_name: &str,
        file_set: &NamedFileSet,
    ) -> Result<()> {
        let set_path = self.file_set_path(id, file_set_name);
        self.backend.create_directories(&set_path)?;

        for (file_name, source) in file_set.iter() {
            let target = set_path.join(file_name);
            self.backend.copy(source, &target, false).map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    BackupStoreError::AlreadyExists(format!(
                        "file '{file_name}' of file set '{file_set_name}' for backup {id} \
                         already exists"
                    ))
                } else {
                    BackupStoreError::Storage(e)
                }
            })?;
            debug!(
                "Saved {} to {} (backup {})",
                source.display(),
                target.display(),
                id
            );
        }
        Ok(())
    }

    /// Remove every file and directory under the file set's path, deepest
    /// path first. Deleting a file set that was never saved is a no-op.
    pub fn delete(&self, id: &BackupIdentifier, file_set_name: &str) -> Result<()> {
        let set_path = self.file_set_path(id, file_set_name);
        if !self.backend.exists(&set_path) {
            return Ok(());
        }

        let mut paths = self.backend.list_recursive(&set_path)?;
        // Children sort after their parent, so reverse order removes them first
        paths.sort_by(|a, b| b.cmp(a));
        for path in &paths {
            self.backend.delete(path)?;
        }
        Ok(())
    }

    /// Copy every logical file described by `file_set` from the backup
    /// location into `target_folder`, replacing pre-existing files, and
    /// return the realized mapping. Re-runnable.
    pub fn restore(
        &self,
        id: &BackupIdentifier,
        file_set_name: &str,
        file_set: &FileSet,
        target_folder: &Path,
    ) -> Result<NamedFileSet> {
        let set_path = self.file_set_path(id, file_set_name);

        let mut restored = NamedFileSet::default();
        for file_name in file_set.names() {
            let source = set_path.join(file_name);
            let target = target_folder.join(file_name);
            self.backend.copy(&source, &target, true)?;
            restored.insert(file_name, target);
        }
        Ok(restored)
    }

    fn file_set_path(&self, id: &BackupIdentifier, file_set_name: &str) -> PathBuf {
        self.base_path
            .join(CONTENTS_DIR)
            .join(id.partition_id.to_string())
            .join(id.checkpoint_id.to_string())
            .join(id.node_id.to_string())
            .join(file_set_name)
    }
}

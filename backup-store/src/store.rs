//! Whole-backup operations composing manifest and content persistence.
//!
//! The two stores own disjoint subtrees (`manifests/` and `contents/`)
//! under one shared base location; this facade sequences them so the
//! manifest always reflects what actually happened to the content.

use crate::backend::{LocalBackend, StorageBackend};
use crate::backup::Backup;
use crate::error::{BackupStoreError, Result};
use crate::fileset::NamedFileSet;
use crate::fileset_manager::FileSetManager;
use crate::identifier::{BackupIdentifier, BackupIdentifierWildcard};
use crate::manifest::{CompletedManifest, InProgressManifest, Manifest, StatusCode};
use crate::manifest_manager::ManifestManager;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct BackupStore {
    manifests: ManifestManager,
    contents: FileSetManager,
}

impl BackupStore {
    /// Open a store over the local filesystem at `base_path`.
    pub fn open(base_path: impl Into<PathBuf>) -> Self {
        Self::with_backend(Arc::new(LocalBackend::new()), base_path)
    }

    pub fn with_backend(backend: Arc<dyn StorageBackend>, base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            manifests: ManifestManager::new(Arc::clone(&backend), base_path.clone()),
            contents: FileSetManager::new(backend, base_path),
        }
    }

    /// Persist a backup attempt: record it as in-progress, save every named
    /// file set, then mark completion.
    ///
    /// Once the initial manifest has landed, any later failure marks the
    /// attempt FAILED (best effort) before propagating, so reconciliation
    /// or a retry can observe it and reclaim partial content via
    /// [`delete`](Self::delete). This facade never resumes a partial save.
    pub fn save(&self, backup: &Backup) -> Result<CompletedManifest> {
        let in_progress = self.manifests.create_initial_manifest(backup)?;

        match self.persist_contents(backup, in_progress) {
            Ok(completed) => {
                info!("Saved backup {}", backup.id);
                Ok(completed)
            }
            Err(e) => {
                if let Err(mark_err) = self.manifests.mark_as_failed(&backup.id, &e.to_string()) {
                    warn!("Failed to mark backup {} as failed: {}", backup.id, mark_err);
                }
                Err(e)
            }
        }
    }

    fn persist_contents(
        &self,
        backup: &Backup,
        in_progress: InProgressManifest,
    ) -> Result<CompletedManifest> {
        for (name, file_set) in &backup.file_sets {
            self.contents.save(&backup.id, name, file_set)?;
        }
        self.manifests.complete_manifest(in_progress)
    }

    /// Restore every file set of a COMPLETED backup into `target_folder`
    /// and return the realized mapping per file set name.
    pub fn restore(
        &self,
        id: &BackupIdentifier,
        target_folder: &Path,
    ) -> Result<BTreeMap<String, NamedFileSet>> {
        let manifest = self.manifests.get_manifest(id)?.ok_or_else(|| {
            BackupStoreError::UnexpectedManifestState(format!(
                "manifest for backup {id} does not exist"
            ))
        })?;

        let completed = match manifest {
            Manifest::Completed(manifest) => manifest,
            other => {
                return Err(BackupStoreError::UnexpectedManifestState(format!(
                    "cannot restore backup {id} with status {}",
                    other.status_code()
                )))
            }
        };

        let mut restored = BTreeMap::new();
        for (name, file_set) in &completed.file_sets {
            let named = self.contents.restore(id, name, file_set, target_folder)?;
            restored.insert(name.clone(), named);
        }
        info!("Restored backup {} to {}", id, target_folder.display());
        Ok(restored)
    }

    /// Delete a backup's content and manifest. Absent is a no-op; an
    /// in-progress attempt is refused.
    ///
    /// Content is reclaimed first and the manifest removed last, so a crash
    /// mid-delete leaves a record a re-run can still resolve.
    pub fn delete(&self, id: &BackupIdentifier) -> Result<()> {
        let Some(manifest) = self.manifests.get_manifest(id)? else {
            return Ok(());
        };
        if manifest.status_code() == StatusCode::InProgress {
            return Err(BackupStoreError::UnexpectedManifestState(format!(
                "cannot delete backup {id} while saving is in progress"
            )));
        }

        for name in manifest.file_sets().keys() {
            self.contents.delete(id, name)?;
        }
        self.manifests.delete_manifest(id)?;
        info!("Deleted backup {}", id);
        Ok(())
    }

    /// Mark an attempt as failed, e.g. from a reconciliation pass over
    /// stale in-progress manifests.
    pub fn mark_failed(&self, id: &BackupIdentifier, reason: &str) -> Result<()> {
        self.manifests.mark_as_failed(id, reason)
    }

    /// The manifest for `id`, or `None` if no attempt was recorded.
    pub fn status(&self, id: &BackupIdentifier) -> Result<Option<Manifest>> {
        self.manifests.get_manifest(id)
    }

    /// All manifests matching `wildcard`. Results may be incomplete on
    /// storage errors; see [`ManifestManager::list_manifests`].
    pub fn list(&self, wildcard: &BackupIdentifierWildcard) -> Vec<Manifest> {
        self.manifests.list_manifests(wildcard)
    }

    pub fn manifests(&self) -> &ManifestManager {
        &self.manifests
    }
}

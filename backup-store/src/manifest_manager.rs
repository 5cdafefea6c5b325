//! Lifecycle persistence for backup manifests.
//!
//! The record at
//! `{base}/manifests/{partitionId}/{checkpointId}/{nodeId}/manifest.json`
//! is the only source of truth for a backup attempt's status. Mutual
//! exclusion between concurrent attempts for the same identifier comes
//! entirely from the backend's create-only write: exactly one
//! `create_initial_manifest` per identifier can succeed.

use crate::backend::StorageBackend;
use crate::backup::Backup;
use crate::error::{BackupStoreError, Result};
use crate::identifier::{BackupIdentifier, BackupIdentifierWildcard};
use crate::manifest::{CompletedManifest, InProgressManifest, Manifest, StatusCode};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

const MANIFESTS_DIR: &str = "manifests";
const MANIFEST_FILE_NAME: &str = "manifest.json";

pub struct ManifestManager {
    backend: Arc<dyn StorageBackend>,
    base_path: PathBuf,
    list_errors: AtomicU64,
}

impl ManifestManager {
    pub fn new(backend: Arc<dyn StorageBackend>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            base_path: base_path.into(),
            list_errors: AtomicU64::new(0),
        }
    }

    /// Record a new backup attempt as IN_PROGRESS.
    ///
    /// The write is create-only: when two attempts race on the same
    /// identifier, exactly one wins and the other observes
    /// [`BackupStoreError::AlreadyExists`].
    pub fn create_initial_manifest(&self, backup: &Backup) -> Result<InProgressManifest> {
        let manifest = Manifest::create_in_progress(backup);
        let path = self.manifest_path(&backup.id);
        if let Some(parent) = path.parent() {
            self.backend.create_directories(parent)?;
        }

        let serialized = serde_json::to_vec(&Manifest::InProgress(manifest.clone()))?;
        self.backend
            .write_create_only(&path, &serialized)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    BackupStoreError::AlreadyExists(format!(
                        "manifest for backup {} already exists",
                        backup.id
                    ))
                } else {
                    BackupStoreError::Storage(e)
                }
            })?;
        Ok(manifest)
    }

    /// Transition an attempt from IN_PROGRESS to COMPLETED.
    ///
    /// The persisted manifest is re-read first; a missing record or any
    /// status other than IN_PROGRESS means a concurrent failure, a
    /// duplicate completion, or corruption, and fails loudly instead of
    /// silently overwriting.
    pub fn complete_manifest(&self, in_progress: InProgressManifest) -> Result<CompletedManifest> {
        let id = in_progress.id;
        match self.get_manifest(&id)? {
            None => {
                return Err(BackupStoreError::UnexpectedManifestState(format!(
                    "manifest for backup {id} does not exist"
                )))
            }
            Some(current) if current.status_code() != StatusCode::InProgress => {
                return Err(BackupStoreError::UnexpectedManifestState(format!(
                    "expected manifest for backup {id} to be in progress but was {}",
                    current.status_code()
                )))
            }
            Some(_) => {}
        }

        let completed = in_progress.complete();
        let serialized = serde_json::to_vec(&Manifest::Completed(completed.clone()))?;
        self.backend
            .write_overwrite(&self.manifest_path(&id), &serialized)?;
        Ok(completed)
    }

    /// Mark an attempt as FAILED, recording `reason`.
    ///
    /// An absent manifest is synthesized as FAILED, covering attempts that
    /// crashed before their initial manifest landed. An already-FAILED
    /// record is left untouched, so the first recorded reason survives.
    pub fn mark_as_failed(&self, id: &BackupIdentifier, reason: &str) -> Result<()> {
        let updated = match self.get_manifest(id)? {
            None => Some(Manifest::Failed(Manifest::create_failed(*id, reason))),
            Some(Manifest::Failed(_)) => None,
            Some(Manifest::Completed(manifest)) => Some(Manifest::Failed(manifest.fail(reason))),
            Some(Manifest::InProgress(manifest)) => Some(Manifest::Failed(manifest.fail(reason))),
        };

        if let Some(manifest) = updated {
            let path = self.manifest_path(id);
            if let Some(parent) = path.parent() {
                self.backend.create_directories(parent)?;
            }
            let serialized = serde_json::to_vec(&manifest)?;
            self.backend.write_overwrite(&path, &serialized)?;
        }
        Ok(())
    }

    /// Remove the manifest of a COMPLETED or FAILED attempt. Absent is a
    /// no-op; IN_PROGRESS is refused so an active backup cannot be erased
    /// out from under itself.
    pub fn delete_manifest(&self, id: &BackupIdentifier) -> Result<()> {
        match self.get_manifest(id)? {
            None => Ok(()),
            Some(manifest) if manifest.status_code() == StatusCode::InProgress => {
                Err(BackupStoreError::UnexpectedManifestState(format!(
                    "cannot delete backup {id} while saving is in progress"
                )))
            }
            Some(_) => {
                self.backend.delete(&self.manifest_path(id))?;
                Ok(())
            }
        }
    }

    /// Read the manifest for `id`, or `None` if no attempt was recorded.
    pub fn get_manifest(&self, id: &BackupIdentifier) -> Result<Option<Manifest>> {
        self.read_manifest(&self.manifest_path(id))
    }

    /// All manifests whose identifier matches `wildcard`.
    ///
    /// Listing favors availability over strict error surfacing: an entirely
    /// absent manifests root is an empty result, and any other storage
    /// error during the walk degrades to an empty result instead of
    /// propagating. Unreadable individual manifests are skipped. Every
    /// swallowed error is logged and counted on
    /// [`list_error_count`](Self::list_error_count), and results may be
    /// incomplete when that counter moves.
    pub fn list_manifests(&self, wildcard: &BackupIdentifierWildcard) -> Vec<Manifest> {
        let root = self.base_path.join(MANIFESTS_DIR);
        let paths = match self.backend.list_recursive(&root) {
            Ok(paths) => paths,
            Err(e) => {
                self.list_errors.fetch_add(1, Ordering::Relaxed);
                error!("Failed to walk manifests under {}: {}", root.display(), e);
                return Vec::new();
            }
        };

        let mut manifests = Vec::new();
        for path in paths {
            let Some(id) = parse_manifest_path(&root, &path) else {
                continue;
            };
            if !wildcard.matches(&id) {
                continue;
            }
            match self.read_manifest(&path) {
                Ok(Some(manifest)) => manifests.push(manifest),
                // Deleted between walk and read
                Ok(None) => {}
                Err(e) => {
                    self.list_errors.fetch_add(1, Ordering::Relaxed);
                    error!("Failed to read manifest at {}: {}", path.display(), e);
                }
            }
        }
        manifests
    }

    /// Number of storage errors swallowed by `list_manifests` so far.
    pub fn list_error_count(&self) -> u64 {
        self.list_errors.load(Ordering::Relaxed)
    }

    fn read_manifest(&self, path: &Path) -> Result<Option<Manifest>> {
        match self.backend.read_all(path)? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    fn manifest_path(&self, id: &BackupIdentifier) -> PathBuf {
        self.base_path
            .join(MANIFESTS_DIR)
            .join(id.partition_id.to_string())
            .join(id.checkpoint_id.to_string())
            .join(id.node_id.to_string())
            .join(MANIFEST_FILE_NAME)
    }
}

/// Recover the identifier encoded in a manifest path. Anything that does
/// not look like `{partition}/{checkpoint}/{node}/manifest.json` relative
/// to the manifests root matches nothing.
fn parse_manifest_path(root: &Path, path: &Path) -> Option<BackupIdentifier> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<&str> = relative
        .iter()
        .map(|s| s.to_str())
        .collect::<Option<Vec<_>>>()?;

    match segments.as_slice() {
        [partition, checkpoint, node, file] if *file == MANIFEST_FILE_NAME => {
            Some(BackupIdentifier::new(
                partition.parse().ok()?,
                checkpoint.parse().ok()?,
                node.parse().ok()?,
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::backup::BackupDescriptor;
    use crate::fileset::NamedFileSet;
    use std::fs;
    use tempfile::TempDir;

    fn manager(base: &Path) -> ManifestManager {
        ManifestManager::new(Arc::new(LocalBackend::new()), base)
    }

    fn backup(partition_id: u32, checkpoint_id: u64, node_id: u32) -> Backup {
        let mut segments = NamedFileSet::default();
        segments.insert("00.log", "/data/raft/00.log");
        Backup::new(
            BackupIdentifier::new(partition_id, checkpoint_id, node_id),
            BackupDescriptor {
                checkpoint_position: 100,
                num_partitions: 3,
                version: "1.0.0".to_string(),
                snapshot_id: None,
            },
        )
        .with_file_set("segments", segments)
    }

    #[test]
    fn test_create_initial_manifest_succeeds_exactly_once() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        let backup = backup(1, 10, 0);

        manager.create_initial_manifest(&backup).unwrap();

        let err = manager.create_initial_manifest(&backup).unwrap_err();
        assert!(matches!(err, BackupStoreError::AlreadyExists(_)));

        // The persisted record is still the first attempt's
        let manifest = manager.get_manifest(&backup.id).unwrap().unwrap();
        assert_eq!(manifest.status_code(), StatusCode::InProgress);
        Ok(())
    }

    #[test]
    fn test_manifest_lands_at_exact_path() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());

        manager.create_initial_manifest(&backup(1, 10, 0)).unwrap();

        assert!(temp_dir.path().join("manifests/1/10/0/manifest.json").is_file());
        Ok(())
    }

    #[test]
    fn test_complete_manifest() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        let backup = backup(1, 10, 0);

        let in_progress = manager.create_initial_manifest(&backup).unwrap();
        manager.complete_manifest(in_progress).unwrap();

        let manifest = manager.get_manifest(&backup.id).unwrap().unwrap();
        assert_eq!(manifest.status_code(), StatusCode::Completed);
        Ok(())
    }

    #[test]
    fn test_complete_fails_when_manifest_absent() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        let in_progress = Manifest::create_in_progress(&backup(1, 10, 0));

        let err = manager.complete_manifest(in_progress).unwrap_err();
        assert!(matches!(err, BackupStoreError::UnexpectedManifestState(_)));
        Ok(())
    }

    #[test]
    fn test_complete_fails_when_not_in_progress() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        let backup = backup(1, 10, 0);

        let in_progress = manager.create_initial_manifest(&backup).unwrap();
        manager.mark_as_failed(&backup.id, "reconciled as stale").unwrap();

        // Detects the concurrent failure instead of silently overwriting it
        let err = manager.complete_manifest(in_progress).unwrap_err();
        assert!(matches!(err, BackupStoreError::UnexpectedManifestState(_)));

        let manifest = manager.get_manifest(&backup.id).unwrap().unwrap();
        assert_eq!(manifest.status_code(), StatusCode::Failed);
        Ok(())
    }

    #[test]
    fn test_mark_as_failed_keeps_first_reason() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        let backup = backup(1, 10, 0);

        manager.create_initial_manifest(&backup).unwrap();
        manager.mark_as_failed(&backup.id, "first reason").unwrap();
        manager.mark_as_failed(&backup.id, "second reason").unwrap();

        let manifest = manager.get_manifest(&backup.id).unwrap().unwrap();
        assert_eq!(manifest.status_code(), StatusCode::Failed);
        assert_eq!(manifest.failure_reason(), Some("first reason"));
        Ok(())
    }

    #[test]
    fn test_mark_as_failed_synthesizes_absent_manifest() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        let id = BackupIdentifier::new(1, 10, 0);

        manager.mark_as_failed(&id, "crashed before manifest landed").unwrap();

        let manifest = manager.get_manifest(&id).unwrap().unwrap();
        assert_eq!(manifest.status_code(), StatusCode::Failed);
        assert_eq!(
            manifest.failure_reason(),
            Some("crashed before manifest landed")
        );
        Ok(())
    }

    #[test]
    fn test_completed_backup_can_be_marked_failed() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        let backup = backup(1, 10, 0);

        let in_progress = manager.create_initial_manifest(&backup).unwrap();
        manager.complete_manifest(in_progress).unwrap();
        manager.mark_as_failed(&backup.id, "validation found corruption").unwrap();

        let manifest = manager.get_manifest(&backup.id).unwrap().unwrap();
        assert_eq!(manifest.status_code(), StatusCode::Failed);
        assert_eq!(manifest.failure_reason(), Some("validation found corruption"));
        Ok(())
    }

    #[test]
    fn test_delete_guard() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        let backup = backup(1, 10, 0);

        // Absent: no-op
        manager.delete_manifest(&backup.id).unwrap();

        // In progress: refused
        let in_progress = manager.create_initial_manifest(&backup).unwrap();
        let err = manager.delete_manifest(&backup.id).unwrap_err();
        assert!(matches!(err, BackupStoreError::UnexpectedManifestState(_)));

        // Completed: removed
        manager.complete_manifest(in_progress).unwrap();
        manager.delete_manifest(&backup.id).unwrap();
        assert!(manager.get_manifest(&backup.id).unwrap().is_none());
        Ok(())
    }

    #[test]
    fn test_get_manifest_absent_is_none() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        assert!(manager
            .get_manifest(&BackupIdentifier::new(9, 9, 9))
            .unwrap()
            .is_none());
        Ok(())
    }

    #[test]
    fn test_wildcard_listing() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());

        for (p, c, n) in [(1, 10, 0), (1, 11, 0), (2, 10, 0)] {
            manager.create_initial_manifest(&backup(p, c, n)).unwrap();
        }

        let partition_one = manager.list_manifests(&BackupIdentifierWildcard::for_partition(1));
        assert_eq!(partition_one.len(), 2);
        assert!(partition_one.iter().all(|m| m.id().partition_id == 1));

        let all = manager.list_manifests(&BackupIdentifierWildcard::any());
        assert_eq!(all.len(), 3);

        let none = manager.list_manifests(&BackupIdentifierWildcard::for_partition(3));
        assert!(none.is_empty());
        Ok(())
    }

    #[test]
    fn test_listing_absent_root_is_empty() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());

        let all = manager.list_manifests(&BackupIdentifierWildcard::any());
        assert!(all.is_empty());
        assert_eq!(manager.list_error_count(), 0);
        Ok(())
    }

    #[test]
    fn test_listing_skips_foreign_paths() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        manager.create_initial_manifest(&backup(1, 10, 0)).unwrap();

        // Unparseable segments match nothing, without failing the listing
        let stray = temp_dir.path().join("manifests/not-a-number/10/0");
        fs::create_dir_all(&stray)?;
        fs::write(stray.join("manifest.json"), b"{}")?;
        fs::write(temp_dir.path().join("manifests/README"), b"ignore me")?;

        let all = manager.list_manifests(&BackupIdentifierWildcard::any());
        assert_eq!(all.len(), 1);
        Ok(())
    }

    #[test]
    fn test_listing_skips_unreadable_manifest_and_counts_it() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let manager = manager(temp_dir.path());
        manager.create_initial_manifest(&backup(1, 10, 0)).unwrap();

        // A corrupt record alongside a good one
        let corrupt = temp_dir.path().join("manifests/2/10/0");
        fs::create_dir_all(&corrupt)?;
        fs::write(corrupt.join("manifest.json"), b"not json")?;

        let all = manager.list_manifests(&BackupIdentifierWildcard::any());
        assert_eq!(all.len(), 1);
        assert_eq!(manager.list_error_count(), 1);
        Ok(())
    }

    #[test]
    fn test_listing_degrades_to_empty_on_walk_failure() {
        struct FailingBackend;

        impl StorageBackend for FailingBackend {
            fn create_directories(&self, _: &Path) -> io::Result<()> {
                Ok(())
            }
            fn write_create_only(&self, _: &Path, _: &[u8]) -> io::Result<()> {
                Ok(())
            }
            fn write_overwrite(&self, _: &Path, _: &[u8]) -> io::Result<()> {
                Ok(())
            }
            fn read_all(&self, _: &Path) -> io::Result<Option<Vec<u8>>> {
                Ok(None)
            }
            fn exists(&self, _: &Path) -> bool {
                true
            }
            fn delete(&self, _: &Path) -> io::Result<()> {
                Ok(())
            }
            fn list_recursive(&self, _: &Path) -> io::Result<Vec<PathBuf>> {
                Err(io::Error::new(io::ErrorKind::Other, "backend outage"))
            }
            fn copy(&self, _: &Path, _: &Path, _: bool) -> io::Result<()> {
                Ok(())
            }
        }

        let manager = ManifestManager::new(Arc::new(FailingBackend), "/backups");
        let all = manager.list_manifests(&BackupIdentifierWildcard::any());
        assert!(all.is_empty());
        assert_eq!(manager.list_error_count(), 1);
    }
}

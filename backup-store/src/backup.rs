//! Backup descriptor types handed to the store by the caller.

use crate::fileset::NamedFileSet;
use crate::identifier::BackupIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptive metadata about a backup attempt. Opaque to the lifecycle
/// state machine; recorded in the manifest for consumers of the backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDescriptor {
    /// Position in the partition's log covered by this backup.
    pub checkpoint_position: u64,

    /// Number of partitions in the cluster when the backup was taken.
    pub num_partitions: u32,

    /// Version of the engine that produced the backup.
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

/// One backup attempt: its identity, descriptive metadata, and the named
/// file sets to persist.
#[derive(Debug, Clone)]
pub struct Backup {
    pub id: BackupIdentifier,
    pub descriptor: BackupDescriptor,
    pub file_sets: BTreeMap<String, NamedFileSet>,
}

impl Backup {
    pub fn new(id: BackupIdentifier, descriptor: BackupDescriptor) -> Self {
        Self {
            id,
            descriptor,
            file_sets: BTreeMap::new(),
        }
    }

    pub fn with_file_set(mut self, name: impl Into<String>, file_set: NamedFileSet) -> Self {
        self.file_sets.insert(name.into(), file_set);
        self
    }
}

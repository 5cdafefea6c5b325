//! Manifest lifecycle types.
//!
//! The manifest is the durable lifecycle record of one backup attempt and
//! the only source of truth for its status. The three states form a closed
//! tagged union; transitions consume the old variant and return the new
//! one, so an illegal transition does not typecheck.

use crate::backup::{Backup, BackupDescriptor};
use crate::fileset::FileSet;
use crate::identifier::BackupIdentifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle states of a backup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::InProgress => "IN_PROGRESS",
            StatusCode::Completed => "COMPLETED",
            StatusCode::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Persisted lifecycle record of one backup attempt.
///
/// Serialized with the status as a textual `statusCode` tag and the
/// variant's fields inlined, so consumers can read the status without
/// knowing the full schema. Unknown extra fields are tolerated on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "statusCode")]
pub enum Manifest {
    #[serde(rename = "IN_PROGRESS")]
    InProgress(InProgressManifest),
    #[serde(rename = "COMPLETED")]
    Completed(CompletedManifest),
    #[serde(rename = "FAILED")]
    Failed(FailedManifest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InProgressManifest {
    pub id: BackupIdentifier,
    pub descriptor: BackupDescriptor,
    #[serde(default)]
    pub file_sets: BTreeMap<String, FileSet>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedManifest {
    pub id: BackupIdentifier,
    pub descriptor: BackupDescriptor,
    #[serde(default)]
    pub file_sets: BTreeMap<String, FileSet>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedManifest {
    pub id: BackupIdentifier,

    /// Absent when the record was synthesized for an attempt whose initial
    /// manifest never landed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<BackupDescriptor>,

    #[serde(default)]
    pub file_sets: BTreeMap<String, FileSet>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Manifest {
    /// Build the initial IN_PROGRESS record for a backup attempt.
    pub fn create_in_progress(backup: &Backup) -> InProgressManifest {
        let now = Utc::now();
        InProgressManifest {
            id: backup.id,
            descriptor: backup.descriptor.clone(),
            file_sets: backup
                .file_sets
                .iter()
                .map(|(name, set)| (name.clone(), FileSet::of(set)))
                .collect(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Synthesize a FAILED record for an attempt with no persisted manifest,
    /// e.g. one that crashed before its initial manifest landed.
    pub fn create_failed(id: BackupIdentifier, failure_reason: impl Into<String>) -> FailedManifest {
        let now = Utc::now();
        FailedManifest {
            id,
            descriptor: None,
            file_sets: BTreeMap::new(),
            created_at: now,
            modified_at: now,
            failure_reason: Some(failure_reason.into()),
        }
    }

    pub fn id(&self) -> &BackupIdentifier {
        match self {
            Manifest::InProgress(m) => &m.id,
            Manifest::Completed(m) => &m.id,
            Manifest::Failed(m) => &m.id,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Manifest::InProgress(_) => StatusCode::InProgress,
            Manifest::Completed(_) => StatusCode::Completed,
            Manifest::Failed(_) => StatusCode::Failed,
        }
    }

    pub fn file_sets(&self) -> &BTreeMap<String, FileSet> {
        match self {
            Manifest::InProgress(m) => &m.file_sets,
            Manifest::Completed(m) => &m.file_sets,
            Manifest::Failed(m) => &m.file_sets,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Manifest::InProgress(m) => m.created_at,
            Manifest::Completed(m) => m.created_at,
            Manifest::Failed(m) => m.created_at,
        }
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        match self {
            Manifest::InProgress(m) => m.modified_at,
            Manifest::Completed(m) => m.modified_at,
            Manifest::Failed(m) => m.modified_at,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Manifest::Failed(m) => m.failure_reason.as_deref(),
            _ => None,
        }
    }
}

impl InProgressManifest {
    pub fn complete(self) -> CompletedManifest {
        CompletedManifest {
            id: self.id,
            descriptor: self.descriptor,
            file_sets: self.file_sets,
            created_at: self.created_at,
            modified_at: Utc::now(),
        }
    }

    pub fn fail(self, failure_reason: impl Into<String>) -> FailedManifest {
        FailedManifest {
            id: self.id,
            descriptor: Some(self.descriptor),
            file_sets: self.file_sets,
            created_at: self.created_at,
            modified_at: Utc::now(),
            failure_reason: Some(failure_reason.into()),
        }
    }
}

impl CompletedManifest {
    /// A completed backup may later be found corrupt, e.g. by post-hoc
    /// validation, and marked failed.
    pub fn fail(self, failure_reason: impl Into<String>) -> FailedManifest {
        FailedManifest {
            id: self.id,
            descriptor: Some(self.descriptor),
            file_sets: self.file_sets,
            created_at: self.created_at,
            modified_at: Utc::now(),
            failure_reason: Some(failure_reason.into()),
        }
    }
}

//! Backup addressing.
//!
//! A backup attempt is uniquely named by the (partition, checkpoint, node)
//! triple; every storage path is derived from it. The wildcard form is a
//! read-side pattern used only for listing, never for writes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniquely identifies one backup attempt. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupIdentifier {
    pub partition_id: u32,

    /// Monotonically increasing per partition; marks the log position the
    /// backup was taken at.
    pub checkpoint_id: u64,

    pub node_id: u32,
}

impl BackupIdentifier {
    pub fn new(partition_id: u32, checkpoint_id: u64, node_id: u32) -> Self {
        Self {
            partition_id,
            checkpoint_id,
            node_id,
        }
    }
}

impl fmt::Display for BackupIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.partition_id, self.checkpoint_id, self.node_id
        )
    }
}

/// A partially-specified [`BackupIdentifier`]: an unset field matches every
/// legal value of that component, including zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupIdentifierWildcard {
    pub partition_id: Option<u32>,
    pub checkpoint_id: Option<u64>,
    pub node_id: Option<u32>,
}

impl BackupIdentifierWildcard {
    /// Matches every backup attempt.
    pub fn any() -> Self {
        Self::default()
    }

    /// Matches every attempt of one partition.
    pub fn for_partition(partition_id: u32) -> Self {
        Self {
            partition_id: Some(partition_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, id: &BackupIdentifier) -> bool {
        self.partition_id.map_or(true, |p| p == id.partition_id)
            && self.checkpoint_id.map_or(true, |c| c == id.checkpoint_id)
            && self.node_id.map_or(true, |n| n == id.node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_wildcard_matches_everything() {
        let wildcard = BackupIdentifierWildcard::any();
        assert!(wildcard.matches(&BackupIdentifier::new(1, 10, 0)));
        assert!(wildcard.matches(&BackupIdentifier::new(0, 0, 0)));
        assert!(wildcard.matches(&BackupIdentifier::new(u32::MAX, u64::MAX, u32::MAX)));
    }

    #[test]
    fn test_partial_wildcard() {
        let wildcard = BackupIdentifierWildcard::for_partition(1);
        assert!(wildcard.matches(&BackupIdentifier::new(1, 10, 0)));
        assert!(wildcard.matches(&BackupIdentifier::new(1, 11, 3)));
        assert!(!wildcard.matches(&BackupIdentifier::new(2, 10, 0)));
    }

    #[test]
    fn test_fully_specified_wildcard_matches_one_id() {
        let wildcard = BackupIdentifierWildcard {
            partition_id: Some(1),
            checkpoint_id: Some(10),
            node_id: Some(0),
        };
        assert!(wildcard.matches(&BackupIdentifier::new(1, 10, 0)));
        assert!(!wildcard.matches(&BackupIdentifier::new(1, 10, 1)));
        assert!(!wildcard.matches(&BackupIdentifier::new(1, 11, 0)));
    }

    #[test]
    fn test_wildcard_matches_zero_components() {
        let wildcard = BackupIdentifierWildcard {
            node_id: Some(0),
            ..BackupIdentifierWildcard::any()
        };
        assert!(wildcard.matches(&BackupIdentifier::new(7, 42, 0)));
        assert!(!wildcard.matches(&BackupIdentifier::new(7, 42, 1)));
    }

    #[test]
    fn test_identifier_serialization() {
        let id = BackupIdentifier::new(1, 10, 0);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"{"partitionId":1,"checkpointId":10,"nodeId":0}"#);
    }
}

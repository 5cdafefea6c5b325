//! Partition Backup Store
//!
//! Persists point-in-time backups of a partition's on-disk state to a
//! shared base location, addressed by (partition, checkpoint, node). A
//! manifest records the lifecycle of each attempt; the raw file content
//! lives under a sibling subtree. Concurrency safety across processes and
//! nodes comes entirely from create-only writes on the backing store.

pub mod backend;
pub mod backup;
pub mod error;
pub mod fileset;
pub mod fileset_manager;
pub mod identifier;
pub mod manifest;
pub mod manifest_manager;
pub mod store;

// Re-export commonly used types
pub use backup::{Backup, BackupDescriptor};
pub use error::{BackupStoreError, Result};
pub use fileset::{FileSet, NamedFile, NamedFileSet};
pub use identifier::{BackupIdentifier, BackupIdentifierWildcard};
pub use manifest::{Manifest, StatusCode};
pub use store::BackupStore;

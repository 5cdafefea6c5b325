//! backup-ctl - Operator tool for partition backups.
//!
//! Inspects, repairs, and restores the backups held in a backup store base
//! directory: list and show manifests, mark stale attempts as failed,
//! delete reclaimed backups, and save or restore file sets by hand.

mod config;
mod logger;

use anyhow::{bail, Context, Result};
use backup_store::{
    Backup, BackupDescriptor, BackupIdentifier, BackupIdentifierWildcard, BackupStore,
    NamedFileSet,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base directory of the backup store (overrides config)
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct IdArgs {
    /// Partition the backup belongs to
    #[arg(short, long)]
    partition: u32,

    /// Checkpoint the backup was taken at
    #[arg(short = 'k', long)]
    checkpoint: u64,

    /// Node the backup was taken on
    #[arg(short, long)]
    node: u32,
}

impl IdArgs {
    fn id(&self) -> BackupIdentifier {
        BackupIdentifier::new(self.partition, self.checkpoint, self.node)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the files of a directory as a new backup
    Save {
        #[command(flatten)]
        id: IdArgs,

        /// Directory whose files become the file set
        source: PathBuf,

        /// Name of the file set to save the files under
        #[arg(long, default_value = "snapshot")]
        file_set: String,

        /// Log position the backup corresponds to
        #[arg(long, default_value_t = 0)]
        checkpoint_position: u64,
    },

    /// Restore a completed backup into a directory
    Restore {
        #[command(flatten)]
        id: IdArgs,

        /// Directory to restore into (created if missing)
        target: PathBuf,
    },

    /// List manifests, optionally narrowed by partition/checkpoint/node
    List {
        #[arg(short, long)]
        partition: Option<u32>,

        #[arg(short = 'k', long)]
        checkpoint: Option<u64>,

        #[arg(short, long)]
        node: Option<u32>,
    },

    /// Show the manifest of one backup
    Status {
        #[command(flatten)]
        id: IdArgs,
    },

    /// Delete a backup's content and manifest
    Delete {
        #[command(flatten)]
        id: IdArgs,
    },

    /// Mark a backup as failed
    MarkFailed {
        #[command(flatten)]
        id: IdArgs,

        /// Reason recorded in the manifest
        #[arg(long)]
        reason: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => config::Config::default(),
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    logger::init(log_level)?;

    let base_dir = args.base_dir.unwrap_or(config.store.base_dir);
    tracing::debug!("Using backup store at {}", base_dir.display());
    let store = BackupStore::open(&base_dir);

    match args.command {
        Command::Save {
            id,
            source,
            file_set,
            checkpoint_position,
        } => {
            let files = collect_files(&source)?;
            if files.is_empty() {
                bail!("No files found in {}", source.display());
            }

            let descriptor = BackupDescriptor {
                checkpoint_position,
                num_partitions: 0,
                version: env!("CARGO_PKG_VERSION").to_string(),
                snapshot_id: None,
            };
            let backup = Backup::new(id.id(), descriptor).with_file_set(&file_set, files);
            let completed = store.save(&backup)?;

            println!(
                "Saved backup {} ({} files in file set '{}')",
                completed.id,
                completed.file_sets[&file_set].files.len(),
                file_set
            );
        }

        Command::Restore { id, target } => {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            let restored = store.restore(&id.id(), &target)?;

            for (name, file_set) in &restored {
                for (file_name, path) in file_set.iter() {
                    println!("{name}/{file_name} -> {}", path.display());
                }
            }
        }

        Command::List {
            partition,
            checkpoint,
            node,
        } => {
            let wildcard = BackupIdentifierWildcard {
                partition_id: partition,
                checkpoint_id: checkpoint,
                node_id: node,
            };
            let manifests = store.list(&wildcard);
            println!("{}", serde_json::to_string_pretty(&manifests)?);

            let errors = store.manifests().list_error_count();
            if errors > 0 {
                tracing::warn!("{errors} storage errors during listing; results may be incomplete");
            }
        }

        Command::Status { id } => match store.status(&id.id())? {
            Some(manifest) => println!("{}", serde_json::to_string_pretty(&manifest)?),
            None => bail!("No manifest for backup {}", id.id()),
        },

        Command::Delete { id } => {
            store.delete(&id.id())?;
            println!("Deleted backup {}", id.id());
        }

        Command::MarkFailed { id, reason } => {
            store.mark_failed(&id.id(), &reason)?;
            println!("Marked backup {} as failed", id.id());
        }
    }

    Ok(())
}

/// Collect the regular files directly inside `source` as a named file set.
fn collect_files(source: &Path) -> Result<NamedFileSet> {
    let mut files = NamedFileSet::default();
    let entries = std::fs::read_dir(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;

    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.insert(entry.file_name().to_string_lossy().into_owned(), entry.path());
        }
    }
    Ok(files)
}

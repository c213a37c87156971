//! Backup CLI commands
//!
//! Implements CLI commands for backup management, export and import.

use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::backup::BackupManager;
use crate::config::Settings;
use crate::display::backup::format_size;
use crate::display::format_backup_table;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::Storage;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create,

    /// List all available backups
    List,

    /// Show information about a specific backup
    Info {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Delete a backup
    Delete {
        /// Backup filename
        backup: String,
    },

    /// Export a signed copy of the ledger
    Export {
        /// File or directory to write to
        destination: Option<PathBuf>,
    },

    /// Replace the ledger with an exported file
    Import {
        /// Backup file to import
        file: Option<PathBuf>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Where a backup argument points
enum BackupLocation {
    /// A file inside the backup directory
    Stored(String),
    /// Any other file
    External(PathBuf),
}

impl BackupLocation {
    fn path(&self, manager: &BackupManager) -> LedgerResult<PathBuf> {
        match self {
            BackupLocation::Stored(name) => manager.backup_path(name),
            BackupLocation::External(path) => Ok(path.clone()),
        }
    }
}

/// Handle a backup command
pub fn handle_backup_command(
    storage: &Storage,
    settings: &Settings,
    cmd: BackupCommands,
) -> LedgerResult<()> {
    let manager = BackupManager::new(storage, &settings.backup);

    match cmd {
        BackupCommands::Create => {
            println!("Creating backup...");
            let backup_path = manager.create_backup()?;
            println!("Backup created: {}", file_label(&backup_path));
            println!("Location: {}", backup_path.display());
        }

        BackupCommands::List => {
            let backups = manager.list_backup_info()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: financetracker backup create");
                return Ok(());
            }

            println!("{}", format_backup_table(&backups));
            println!();
            println!(
                "Total: {} of {} backup(s)",
                backups.len(),
                manager.max_backups()
            );
        }

        BackupCommands::Info { backup } => {
            let backup_path = resolve_backup(&manager, &backup)?.path(&manager)?;
            let validation = manager.validate_backup(&backup_path)?;
            let metadata = std::fs::metadata(&backup_path)
                .map_err(|e| LedgerError::Io(format!("Failed to read backup: {}", e)))?;

            println!("Backup Details");
            println!("==============");
            println!("File: {}", backup_path.display());
            println!("Size: {}", format_size(metadata.len()));
            println!("Exported: {}", validation.exported_at);
            println!("Format version: {}", validation.version);
            println!("Signature: valid");
            println!();
            println!("Contents:");
            println!("  Transactions:  {}", validation.transactions);
            println!("  Categories:    {}", validation.categories);
            println!("  Subscriptions: {}", validation.subscriptions);
        }

        BackupCommands::Restore { backup, force } => {
            let location = resolve_backup(&manager, &backup)?;
            let backup_path = location.path(&manager)?;
            let validation = manager.validate_backup(&backup_path)?;

            println!("Backup Information");
            println!("==================");
            println!("File: {}", backup_path.display());
            println!("Exported: {}", validation.exported_at);
            println!(
                "Contains: {} transactions, {} categories, {} subscriptions",
                validation.transactions, validation.categories, validation.subscriptions
            );
            println!();

            if !force {
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  financetracker backup restore {} --force", backup);
                return Ok(());
            }

            let result = match location {
                BackupLocation::Stored(name) => manager.restore_backup(&name)?,
                BackupLocation::External(path) => manager.import_data(Some(&path))?,
            };

            println!("Restore complete!");
            println!("{}", result.summary());
            if let Some(safety) = &result.safety_backup {
                println!("Previous data saved to: {}", file_label(safety));
            }
        }

        BackupCommands::Delete { backup } => {
            let deleted = manager.delete_backup(&backup)?;
            println!("Deleted backup: {}", deleted.filename);
        }

        BackupCommands::Export { destination } => {
            let target = manager.export_data(destination.as_deref())?;
            println!("Exported ledger to: {}", target.display());
        }

        BackupCommands::Import { file, force } => {
            if let (Some(path), false) = (&file, force) {
                let validation = manager.validate_backup(path)?;
                println!("File: {}", path.display());
                println!("Exported: {}", validation.exported_at);
                println!(
                    "Contains: {} transactions, {} categories, {} subscriptions",
                    validation.transactions, validation.categories, validation.subscriptions
                );
                println!();
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag.");
                return Ok(());
            }

            let result = manager.import_data(file.as_deref())?;
            println!("Import complete!");
            println!("{}", result.summary());
            if let Some(safety) = &result.safety_backup {
                println!("Previous data saved to: {}", file_label(safety));
            }
        }
    }

    Ok(())
}

/// Resolve 'latest', a stored backup name, or a path
fn resolve_backup(manager: &BackupManager, backup: &str) -> LedgerResult<BackupLocation> {
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .list_backups()?
            .into_iter()
            .next()
            .map(BackupLocation::Stored)
            .ok_or_else(|| LedgerError::backup_not_found("latest"));
    }

    if manager.backup_path(backup).is_ok() {
        return Ok(BackupLocation::Stored(backup.to_string()));
    }

    let with_ext = format!("{}.json", backup);
    if manager.backup_path(&with_ext).is_ok() {
        return Ok(BackupLocation::Stored(with_ext));
    }

    let path = PathBuf::from(backup);
    if path.is_file() {
        return Ok(BackupLocation::External(path));
    }

    Err(LedgerError::backup_not_found(backup))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

//! Backup manager for FinanceTracker
//!
//! Keeps signed snapshots in the backup directory. Automatic backups are
//! capped: once `max_backups` files are present a new one is refused until
//! the user deletes one. The safety backup taken before an import is exempt
//! from the cap.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::audit::EntityType;
use crate::config::settings::BackupSettings;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{write_bytes_atomic, Storage};

use super::restore::{RestoreManager, RestoreResult, ValidationResult};
use super::signature::sign_document;
use super::snapshot::SnapshotBuilder;

const BACKUP_PREFIX: &str = "backup-";
const EXPORT_PREFIX: &str = "financetracker-backup-";

/// Metadata about a backup file
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub filename: String,
    pub path: PathBuf,
    /// Parsed from the filename; `None` for names in neither known format
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
}

/// Creates, lists, restores and deletes backups
pub struct BackupManager<'a> {
    storage: &'a Storage,
    backup_dir: PathBuf,
    max_backups: usize,
}

impl<'a> BackupManager<'a> {
    pub fn new(storage: &'a Storage, settings: &BackupSettings) -> Self {
        Self {
            backup_dir: storage.paths().backup_dir(),
            storage,
            max_backups: settings.max_backups,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Write a signed snapshot of the ledger as a new backup
    ///
    /// Refused with `BackupLimit` once the directory already holds
    /// `max_backups` files.
    pub fn create_backup(&self) -> LedgerResult<PathBuf> {
        if self.list_backups()?.len() >= self.max_backups {
            return Err(LedgerError::BackupLimit {
                limit: self.max_backups,
            });
        }
        self.write_backup()
    }

    /// Write a backup without looking at the cap
    fn write_backup(&self) -> LedgerResult<PathBuf> {
        let mut stamp = Utc::now();
        let path = loop {
            let candidate = self.backup_dir.join(backup_file_name(stamp));
            if !candidate.exists() {
                break candidate;
            }
            stamp += Duration::milliseconds(1);
        };

        let document = sign_document(&SnapshotBuilder::new(self.storage).build_at(stamp)?)?;
        write_document(&path, &document)?;

        info!(path = %path.display(), "backup created");
        Ok(path)
    }

    /// Backup filenames, newest first
    pub fn list_backups(&self) -> LedgerResult<Vec<String>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.backup_dir)
            .map_err(|e| LedgerError::Io(format!("Failed to read backup directory: {}", e)))?
        {
            let entry = entry
                .map_err(|e| LedgerError::Io(format!("Failed to read directory entry: {}", e)))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Backups with their parsed dates and sizes, newest first
    pub fn list_backup_info(&self) -> LedgerResult<Vec<BackupInfo>> {
        self.list_backups()?
            .into_iter()
            .map(|name| self.info(&name))
            .collect()
    }

    fn info(&self, name: &str) -> LedgerResult<BackupInfo> {
        let path = self.backup_path(name)?;
        let metadata = fs::metadata(&path)
            .map_err(|e| LedgerError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

        Ok(BackupInfo {
            filename: name.to_string(),
            created_at: parse_backup_date(name),
            size_bytes: metadata.len(),
            path,
        })
    }

    /// Path of an existing backup in the backup directory
    pub fn backup_path(&self, name: &str) -> LedgerResult<PathBuf> {
        check_name(name)?;
        let path = self.backup_dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(LedgerError::backup_not_found(name))
        }
    }

    /// Replace the ledger with the contents of a stored backup
    pub fn restore_backup(&self, name: &str) -> LedgerResult<RestoreResult> {
        let path = self.backup_path(name)?;
        RestoreManager::new(self.storage).restore_from_file(&path)
    }

    /// Parse and verify a backup file without restoring it
    pub fn validate_backup(&self, path: &Path) -> LedgerResult<ValidationResult> {
        RestoreManager::new(self.storage).validate_file(path)
    }

    pub fn delete_backup(&self, name: &str) -> LedgerResult<BackupInfo> {
        let info = self.info(name)?;

        fs::remove_file(&info.path)
            .map_err(|e| LedgerError::Io(format!("Failed to delete backup: {}", e)))?;

        self.storage.log_delete(
            EntityType::Backup,
            info.filename.clone(),
            Some(info.filename.clone()),
            &info,
        )?;

        info!(backup = %info.filename, "backup deleted");
        Ok(info)
    }

    /// Export a signed snapshot to `destination`
    ///
    /// The export is always written to the backup directory first, as
    /// `financetracker-backup-YYYY-MM-DD.json`. With no destination the
    /// call ends in `Cancelled` after that internal write. A destination
    /// that is a directory receives the file under the same name.
    pub fn export_data(&self, destination: Option<&Path>) -> LedgerResult<PathBuf> {
        let now = Utc::now();
        let name = export_file_name(now.date_naive());
        let document = sign_document(&SnapshotBuilder::new(self.storage).build_at(now)?)?;

        let internal = self.backup_dir.join(&name);
        write_document(&internal, &document)?;

        let Some(destination) = destination else {
            return Err(LedgerError::Cancelled(format!(
                "no export destination chosen, copy kept at {}",
                internal.display()
            )));
        };

        let target = if destination.is_dir() {
            destination.join(&name)
        } else {
            destination.to_path_buf()
        };
        write_document(&target, &document)?;

        info!(path = %target.display(), "ledger exported");
        Ok(target)
    }

    /// Replace the ledger with the contents of an external backup file
    ///
    /// The file is fully validated and verified before anything happens;
    /// then a safety backup of the current ledger is written (regardless of
    /// the cap) and the ledger is replaced.
    pub fn import_data(&self, source: Option<&Path>) -> LedgerResult<RestoreResult> {
        let Some(source) = source else {
            return Err(LedgerError::Cancelled("no backup file chosen".into()));
        };

        let restore = RestoreManager::new(self.storage);
        let document = restore.read_document(source)?;
        let payload = restore.validate(&document)?;
        let exported_at = payload.exported_at.clone();
        let contents = payload.into_contents()?;

        let safety = self.write_backup()?;
        let label = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source.display().to_string());

        let mut result = restore.restore_contents(contents, exported_at, &label)?;
        result.safety_backup = Some(safety);
        Ok(result)
    }
}

fn write_document(path: &Path, document: &Value) -> LedgerResult<()> {
    let bytes = serde_json::to_vec_pretty(document)?;
    write_bytes_atomic(path, &bytes)
}

fn check_name(name: &str) -> LedgerResult<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(LedgerError::Validation(format!(
            "'{}' is not a backup file name",
            name
        )));
    }
    Ok(())
}

/// `backup-YYYY-MM-DDTHH-mm-ss-SSSZ.json`
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("{}{}.json", BACKUP_PREFIX, at.format("%Y-%m-%dT%H-%M-%S-%3fZ"))
}

/// `financetracker-backup-YYYY-MM-DD.json`
pub fn export_file_name(day: NaiveDate) -> String {
    format!("{}{}.json", EXPORT_PREFIX, day.format("%Y-%m-%d"))
}

/// Date encoded in a backup or export filename
///
/// Exports carry only a day and are read as midnight UTC.
pub fn parse_backup_date(filename: &str) -> Option<DateTime<Utc>> {
    if let Some(day) = filename
        .strip_prefix(EXPORT_PREFIX)
        .and_then(|rest| rest.strip_suffix(".json"))
    {
        return parse_day(day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
    }

    let stamp = filename
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix("Z.json")?;

    // YYYY-MM-DDTHH-mm-ss-SSS
    if stamp.len() != 23 || !stamp.is_ascii() || stamp.as_bytes()[10] != b'T' {
        return None;
    }
    let date = parse_day(&stamp[0..10])?;
    let time = &stamp[11..];
    if [2, 5, 8].iter().any(|&i| time.as_bytes()[i] != b'-') {
        return None;
    }

    let hour = number(&time[0..2])?;
    let minute = number(&time[3..5])?;
    let second = number(&time[6..8])?;
    let millis = number(&time[9..12])?;

    date.and_hms_milli_opt(hour, minute, second, millis)
        .map(|dt| dt.and_utc())
}

/// Strict `YYYY-MM-DD`
fn parse_day(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 || !s.is_ascii() || s.as_bytes()[4] != b'-' || s.as_bytes()[7] != b'-' {
        return None;
    }
    NaiveDate::from_ymd_opt(number(&s[0..4])? as i32, number(&s[5..7])?, number(&s[8..10])?)
}

fn number(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

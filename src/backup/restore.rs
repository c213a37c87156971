//! Backup restoration for FinanceTracker
//!
//! A backup is checked in full before anything is touched: JSON syntax,
//! format version, presence of every field, signature, then typed decoding
//! and row validation. Only a backup that passes all of them replaces the
//! ledger, through `Storage::replace_all`.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::audit::AuditEntry;
use crate::error::{BackupValidationError, LedgerError, LedgerResult};
use crate::storage::{LedgerContents, Storage};

use super::signature::{verify_document, SIGNATURE_KEY};
use super::snapshot::{SnapshotPayload, SNAPSHOT_VERSION};

const DOCUMENT_FIELDS: &[&str] = &[
    "exportedAt",
    "transactions",
    "categories",
    "subscriptions",
    SIGNATURE_KEY,
];

const TRANSACTION_FIELDS: &[&str] = &[
    "amount",
    "title",
    "description",
    "category",
    "date",
    "type",
    "isRecurring",
    "installments",
    "recurringFrequency",
    "recurringEndDate",
    "subscriptionId",
];

const CATEGORY_FIELDS: &[&str] = &["name", "icon", "type"];

const SUBSCRIPTION_FIELDS: &[&str] = &[
    "name",
    "amount",
    "category",
    "nextPayment",
    "frequency",
    "status",
];

/// Validates backups and restores the ledger from them
pub struct RestoreManager<'a> {
    storage: &'a Storage,
}

impl<'a> RestoreManager<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Read and parse a backup file without interpreting it
    pub fn read_document(&self, path: &Path) -> LedgerResult<Value> {
        if !path.exists() {
            return Err(LedgerError::backup_not_found(path.display().to_string()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| LedgerError::Io(format!("Failed to read backup file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| BackupValidationError::Malformed(e.to_string()).into())
    }

    /// Run every check on a parsed backup and decode it
    pub fn validate(&self, document: &Value) -> LedgerResult<SnapshotPayload> {
        let object = document.as_object().ok_or_else(|| {
            BackupValidationError::Malformed("expected a JSON object at the top level".into())
        })?;

        check_version(object)?;
        check_fields(object)?;
        verify_document(document)?;

        serde_json::from_value(document.clone())
            .map_err(|e| BackupValidationError::Malformed(e.to_string()).into())
    }

    /// Validate a backup file without restoring it
    pub fn validate_file(&self, path: &Path) -> LedgerResult<ValidationResult> {
        let document = self.read_document(path)?;
        let payload = self.validate(&document)?;

        Ok(ValidationResult {
            version: payload.version,
            exported_at: payload.exported_at,
            transactions: payload.transactions.len(),
            categories: payload.categories.len(),
            subscriptions: payload.subscriptions.len(),
        })
    }

    /// Validate and restore a backup file
    pub fn restore_from_file(&self, path: &Path) -> LedgerResult<RestoreResult> {
        let document = self.read_document(path)?;
        let payload = self.validate(&document)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.restore_payload(payload, &source)
    }

    /// Replace the ledger with an already validated payload
    pub fn restore_payload(
        &self,
        payload: SnapshotPayload,
        source: &str,
    ) -> LedgerResult<RestoreResult> {
        let exported_at = payload.exported_at.clone();
        let contents = payload.into_contents()?;
        self.restore_contents(contents, exported_at, source)
    }

    /// Replace the ledger with rows already decoded from a snapshot
    pub fn restore_contents(
        &self,
        contents: LedgerContents,
        exported_at: String,
        source: &str,
    ) -> LedgerResult<RestoreResult> {
        let result = RestoreResult {
            source: source.to_string(),
            exported_at,
            transactions: contents.transactions.len(),
            categories: contents.categories.len(),
            subscriptions: contents.subscriptions.len(),
            safety_backup: None,
        };

        self.storage.replace_all(contents)?;
        self.storage
            .audit()
            .log(&AuditEntry::restore(source, result.summary()))?;

        info!(
            source,
            transactions = result.transactions,
            categories = result.categories,
            subscriptions = result.subscriptions,
            "ledger restored"
        );

        Ok(result)
    }
}

fn check_version(object: &Map<String, Value>) -> LedgerResult<()> {
    match object.get("version") {
        None => Err(LedgerError::missing_field("backup", "version")),
        Some(v) if v.as_u64() == Some(SNAPSHOT_VERSION) => Ok(()),
        Some(v) => Err(BackupValidationError::UnsupportedVersion(v.to_string()).into()),
    }
}

fn check_fields(object: &Map<String, Value>) -> LedgerResult<()> {
    require_keys(object, "backup", DOCUMENT_FIELDS)?;
    check_table(object, "transactions", TRANSACTION_FIELDS)?;
    check_table(object, "categories", CATEGORY_FIELDS)?;
    check_table(object, "subscriptions", SUBSCRIPTION_FIELDS)
}

fn check_table(object: &Map<String, Value>, table: &str, fields: &[&str]) -> LedgerResult<()> {
    let rows = object[table].as_array().ok_or_else(|| {
        BackupValidationError::Malformed(format!("`{table}` must be an array"))
    })?;

    for (i, row) in rows.iter().enumerate() {
        let context = format!("{table}[{i}]");
        let record = row.as_object().ok_or_else(|| {
            BackupValidationError::Malformed(format!("{context} must be an object"))
        })?;
        require_keys(record, &context, fields)?;
    }
    Ok(())
}

fn require_keys(object: &Map<String, Value>, context: &str, fields: &[&str]) -> LedgerResult<()> {
    match fields.iter().find(|f| !object.contains_key(**f)) {
        Some(field) => Err(LedgerError::missing_field(context, *field)),
        None => Ok(()),
    }
}

/// Result of a restore operation
#[derive(Debug, Clone)]
pub struct RestoreResult {
    /// File name or path the ledger was restored from
    pub source: String,
    pub exported_at: String,
    pub transactions: usize,
    pub categories: usize,
    pub subscriptions: usize,
    /// Backup of the previous state taken before an import
    pub safety_backup: Option<std::path::PathBuf>,
}

impl RestoreResult {
    pub fn summary(&self) -> String {
        format!(
            "Restored {} transactions, {} categories, {} subscriptions (exported {})",
            self.transactions, self.categories, self.subscriptions, self.exported_at
        )
    }
}

/// What a valid backup contains
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub version: u64,
    pub exported_at: String,
    pub transactions: usize,
    pub categories: usize,
    pub subscriptions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::signature::sign_document;
    use crate::backup::snapshot::SnapshotBuilder;
    use crate::config::LedgerPaths;
    use crate::models::{Category, Frequency, Money, Subscription, Transaction, TransactionType};
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn populate(storage: &Storage) {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let template = Transaction::new(
            "Rent",
            Money::from_cents(80000),
            TransactionType::Expense,
            "Home",
            date,
        )
        .with_recurrence(Frequency::Monthly, None, None);
        let child = template.spawn_instance(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        storage
            .replace_all(LedgerContents {
                categories: vec![Category::new("Home", TransactionType::Expense, "Home")],
                transactions: vec![template, child],
                subscriptions: vec![Subscription::new(
                    "Netflix",
                    Money::from_cents(1299),
                    "Home",
                    date,
                    Frequency::Monthly,
                )],
            })
            .unwrap();
    }

    fn signed_document(storage: &Storage) -> Value {
        let payload = SnapshotBuilder::new(storage).build().unwrap();
        sign_document(&payload).unwrap()
    }

    fn write(dir: &TempDir, name: &str, document: &Value) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_restore_round_trip_keeps_links() {
        let (temp_dir, storage) = create_test_storage();
        populate(&storage);
        let path = write(&temp_dir, "snap.json", &signed_document(&storage));

        storage.clear_all().unwrap();
        let result = RestoreManager::new(&storage).restore_from_file(&path).unwrap();

        assert_eq!(result.transactions, 2);
        assert_eq!(result.categories, 1);
        assert_eq!(result.subscriptions, 1);

        let templates = storage.transactions.get_templates().unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(storage.transactions.count_children(templates[0].id).unwrap(), 1);

        let audit = storage.audit().read_all().unwrap();
        assert_eq!(audit.last().unwrap().entity_id, "snap.json");
    }

    #[test]
    fn test_corrupted_amount_fails_integrity_and_keeps_store() {
        let (temp_dir, storage) = create_test_storage();
        populate(&storage);
        let before = storage.transactions.count().unwrap();

        let mut document = signed_document(&storage);
        document["transactions"][0]["amount"] = Value::from(80001);
        let path = write(&temp_dir, "tampered.json", &document);

        let err = RestoreManager::new(&storage)
            .restore_from_file(&path)
            .unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(storage.transactions.count().unwrap(), before);
        assert_eq!(storage.categories.count().unwrap(), 1);
    }

    #[test]
    fn test_missing_and_unsupported_version_are_distinct() {
        let (_temp_dir, storage) = create_test_storage();
        let manager = RestoreManager::new(&storage);

        let mut missing = signed_document(&storage);
        missing.as_object_mut().unwrap().remove("version");
        assert!(matches!(
            manager.validate(&missing).unwrap_err(),
            LedgerError::Backup(BackupValidationError::MissingField { .. })
        ));

        let mut future = signed_document(&storage);
        future["version"] = Value::from(2);
        assert!(matches!(
            manager.validate(&future).unwrap_err(),
            LedgerError::Backup(BackupValidationError::UnsupportedVersion(v)) if v == "2"
        ));
    }

    #[test]
    fn test_missing_record_field_names_context() {
        let (_temp_dir, storage) = create_test_storage();
        populate(&storage);

        let mut document = signed_document(&storage);
        document["transactions"][1]
            .as_object_mut()
            .unwrap()
            .remove("title");

        let err = RestoreManager::new(&storage).validate(&document).unwrap_err();
        match err {
            LedgerError::Backup(BackupValidationError::MissingField { context, field }) => {
                assert_eq!(context, "transactions[1]");
                assert_eq!(field, "title");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_signature_is_missing_field() {
        let (_temp_dir, storage) = create_test_storage();
        let mut document = signed_document(&storage);
        document.as_object_mut().unwrap().remove(SIGNATURE_KEY);

        let err = RestoreManager::new(&storage).validate(&document).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_color_is_accepted() {
        let (_temp_dir, storage) = create_test_storage();
        populate(&storage);

        let mut document = signed_document(&storage);
        document["subscriptions"][0]
            .as_object_mut()
            .unwrap()
            .remove("color");
        let document = sign_document(&{
            let mut unsigned = document.clone();
            unsigned.as_object_mut().unwrap().remove(SIGNATURE_KEY);
            unsigned
        })
        .unwrap();

        let payload = RestoreManager::new(&storage).validate(&document).unwrap();
        assert!(payload.subscriptions[0].color.is_none());
    }

    #[test]
    fn test_not_json_is_malformed() {
        let (temp_dir, storage) = create_test_storage();
        let path = temp_dir.path().join("garbage.json");
        fs::write(&path, "{ not json").unwrap();

        let err = RestoreManager::new(&storage)
            .validate_file(&path)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Backup(BackupValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_validate_file_counts() {
        let (temp_dir, storage) = create_test_storage();
        populate(&storage);
        let path = write(&temp_dir, "snap.json", &signed_document(&storage));

        let result = RestoreManager::new(&storage).validate_file(&path).unwrap();
        assert_eq!(result.version, 1);
        assert_eq!(result.transactions, 2);
        assert_eq!(result.subscriptions, 1);
    }
}

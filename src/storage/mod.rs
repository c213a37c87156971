//! Storage layer for FinanceTracker
//!
//! JSON file storage with atomic writes. `Storage` is created once at
//! process start and passed by reference to every service; there is no
//! global handle.

pub mod categories;
pub mod file_io;
pub mod init;
pub mod subscriptions;
pub mod transactions;

pub use categories::CategoryRepository;
pub use file_io::{read_json, write_bytes_atomic, write_json_atomic};
pub use init::initialize_storage;
pub use subscriptions::SubscriptionRepository;
pub use transactions::TransactionRepository;

use serde::Serialize;
use tracing::{debug, error};

use crate::audit::{AuditEntry, AuditLogger, EntityType};
use crate::config::LedgerPaths;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, Subscription, Transaction};

pub(crate) fn poisoned<E: std::fmt::Display>(e: E) -> LedgerError {
    LedgerError::Storage(format!("Failed to acquire lock: {}", e))
}

/// Full contents of the ledger, used to swap everything at once
#[derive(Debug, Clone, Default)]
pub struct LedgerContents {
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
    pub subscriptions: Vec<Subscription>,
}

impl LedgerContents {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.transactions.is_empty() && self.subscriptions.is_empty()
    }
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: LedgerPaths,
    pub transactions: TransactionRepository,
    pub categories: CategoryRepository,
    pub subscriptions: SubscriptionRepository,
    audit: AuditLogger,
}

impl Storage {
    /// Create a new Storage instance
    pub fn new(paths: LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;

        Ok(Self {
            transactions: TransactionRepository::new(paths.transactions_file()),
            categories: CategoryRepository::new(paths.categories_file()),
            subscriptions: SubscriptionRepository::new(paths.subscriptions_file()),
            audit: AuditLogger::new(paths.audit_log()),
            paths,
        })
    }

    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Load all data from disk
    pub fn load_all(&self) -> LedgerResult<()> {
        self.categories.load()?;
        self.transactions.load()?;
        self.subscriptions.load()?;
        debug!(
            transactions = self.transactions.count()?,
            categories = self.categories.count()?,
            subscriptions = self.subscriptions.count()?,
            "ledger loaded"
        );
        Ok(())
    }

    /// Save all data to disk
    pub fn save_all(&self) -> LedgerResult<()> {
        self.categories.save()?;
        self.transactions.save()?;
        self.subscriptions.save()?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.paths.is_initialized()
    }

    /// Read every table in one go
    pub fn contents(&self) -> LedgerResult<LedgerContents> {
        Ok(LedgerContents {
            categories: self.categories.get_all()?,
            transactions: self.transactions.get_all()?,
            subscriptions: self.subscriptions.get_all()?,
        })
    }

    /// Replace the whole ledger with `next`
    ///
    /// Files are written first, in the order categories, transactions,
    /// subscriptions, each with an atomic rename. If a later write fails the
    /// files already written are put back to their previous contents and the
    /// in-memory state is not touched. Only after all three files are on
    /// disk are the in-memory tables swapped, one table lock at a time.
    /// No table is ever empty mid-swap, but a concurrent reader holding the
    /// same `Storage` could see new categories next to old transactions; the
    /// CLI runs single-threaded, so there is no such reader.
    pub fn replace_all(&self, next: LedgerContents) -> LedgerResult<()> {
        let previous = self.contents()?;

        self.categories.persist(&next.categories)?;

        if let Err(e) = self.transactions.persist(&next.transactions) {
            self.rollback(&previous, 1);
            return Err(e);
        }

        if let Err(e) = self.subscriptions.persist(&next.subscriptions) {
            self.rollback(&previous, 2);
            return Err(e);
        }

        self.categories.replace(next.categories)?;
        self.transactions.replace(next.transactions)?;
        self.subscriptions.replace(next.subscriptions)?;
        Ok(())
    }

    /// Rewrite the first `written` tables with their previous contents
    fn rollback(&self, previous: &LedgerContents, written: usize) {
        let mut results = vec![self.categories.persist(&previous.categories)];
        if written > 1 {
            results.push(self.transactions.persist(&previous.transactions));
        }
        for result in results {
            if let Err(e) = result {
                error!("failed to roll back ledger files: {e}");
            }
        }
    }

    /// Empty every table
    pub fn clear_all(&self) -> LedgerResult<()> {
        self.replace_all(LedgerContents::default())
    }

    /// Record a create in the audit log
    pub fn log_create<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> LedgerResult<()> {
        self.audit
            .log(&AuditEntry::create(entity_type, entity_id, entity_name, entity))
    }

    /// Record an update in the audit log
    pub fn log_update<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
        diff_summary: Option<String>,
    ) -> LedgerResult<()> {
        self.audit.log(&AuditEntry::update(
            entity_type,
            entity_id,
            entity_name,
            before,
            after,
            diff_summary,
        ))
    }

    /// Record a delete in the audit log
    pub fn log_delete<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> LedgerResult<()> {
        self.audit
            .log(&AuditEntry::delete(entity_type, entity_id, entity_name, entity))
    }
}

//! Transaction repository for JSON storage
//!
//! Rows live in an id-keyed map. Two secondary indexes answer the engine's
//! questions without a full scan: template id -> generated children and
//! subscription id -> booked payments.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::NaiveDate;

use crate::error::LedgerError;
use crate::models::{Money, SubscriptionId, Transaction, TransactionId, TransactionType};

use super::file_io::{read_json, write_json_atomic};
use super::poisoned;

/// On-disk layout of transactions.json
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TransactionData {
    transactions: Vec<Transaction>,
}

#[derive(Default)]
struct Indexes {
    by_parent: HashMap<TransactionId, Vec<TransactionId>>,
    by_subscription: HashMap<SubscriptionId, Vec<TransactionId>>,
}

impl Indexes {
    fn add(&mut self, txn: &Transaction) {
        if let Some(parent) = txn.parent_id {
            self.by_parent.entry(parent).or_default().push(txn.id);
        }
        if let Some(sub) = txn.subscription_id {
            self.by_subscription.entry(sub).or_default().push(txn.id);
        }
    }

    fn remove(&mut self, txn: &Transaction) {
        if let Some(ids) = txn.parent_id.and_then(|p| self.by_parent.get_mut(&p)) {
            ids.retain(|&id| id != txn.id);
        }
        if let Some(ids) = txn
            .subscription_id
            .and_then(|s| self.by_subscription.get_mut(&s))
        {
            ids.retain(|&id| id != txn.id);
        }
    }

    fn build<'a>(rows: impl Iterator<Item = &'a Transaction>) -> Self {
        let mut indexes = Self::default();
        for txn in rows {
            indexes.add(txn);
        }
        indexes
    }
}

/// Newest first; ties broken by creation time so listings are stable
fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then(b.created_at.cmp(&a.created_at))
            .then(a.id.cmp(&b.id))
    });
}

/// Repository for transaction persistence with indexing
pub struct TransactionRepository {
    path: PathBuf,
    data: RwLock<HashMap<TransactionId, Transaction>>,
    indexes: RwLock<Indexes>,
}

impl TransactionRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            indexes: RwLock::new(Indexes::default()),
        }
    }

    /// Load transactions from disk and build indexes
    pub fn load(&self) -> Result<(), LedgerError> {
        let file_data: TransactionData = read_json(&self.path)?;
        self.replace(file_data.transactions)
    }

    /// Save transactions to disk
    pub fn save(&self) -> Result<(), LedgerError> {
        let transactions = self.get_all()?;
        self.persist(&transactions)
    }

    /// Write `transactions` to disk without touching the in-memory state
    pub(crate) fn persist(&self, transactions: &[Transaction]) -> Result<(), LedgerError> {
        let mut sorted = transactions.to_vec();
        sort_newest_first(&mut sorted);
        write_json_atomic(&self.path, &TransactionData { transactions: sorted })
    }

    /// Swap the in-memory contents for `transactions`
    pub(crate) fn replace(&self, transactions: Vec<Transaction>) -> Result<(), LedgerError> {
        let indexes = Indexes::build(transactions.iter());
        let map: HashMap<_, _> = transactions.into_iter().map(|t| (t.id, t)).collect();

        let mut data = self.data.write().map_err(poisoned)?;
        let mut current = self.indexes.write().map_err(poisoned)?;
        *data = map;
        *current = indexes;
        Ok(())
    }

    pub fn get(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.get(&id).cloned())
    }

    /// Get all transactions, newest first
    pub fn get_all(&self) -> Result<Vec<Transaction>, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        let mut transactions: Vec<_> = data.values().cloned().collect();
        sort_newest_first(&mut transactions);
        Ok(transactions)
    }

    /// Get transactions of one type, newest first
    pub fn get_by_type(&self, kind: TransactionType) -> Result<Vec<Transaction>, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        let mut transactions: Vec<_> = data
            .values()
            .filter(|t| t.transaction_type == kind)
            .cloned()
            .collect();
        sort_newest_first(&mut transactions);
        Ok(transactions)
    }

    /// Get transactions dated within `start..=end`
    pub fn get_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        let mut transactions: Vec<_> = data
            .values()
            .filter(|t| t.date >= start && t.date <= end)
            .cloned()
            .collect();
        sort_newest_first(&mut transactions);
        Ok(transactions)
    }

    /// Recurring templates, oldest first
    pub fn get_templates(&self) -> Result<Vec<Transaction>, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        let mut templates: Vec<_> = data.values().filter(|t| t.is_template()).cloned().collect();
        templates.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(templates)
    }

    /// Instances generated from `parent`, oldest first
    pub fn children_of(&self, parent: TransactionId) -> Result<Vec<Transaction>, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        let indexes = self.indexes.read().map_err(poisoned)?;

        let mut children: Vec<_> = indexes
            .by_parent
            .get(&parent)
            .map(|ids| ids.iter().filter_map(|id| data.get(id).cloned()).collect())
            .unwrap_or_default();
        children.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(children)
    }

    pub fn count_children(&self, parent: TransactionId) -> Result<usize, LedgerError> {
        let indexes = self.indexes.read().map_err(poisoned)?;
        Ok(indexes.by_parent.get(&parent).map_or(0, |ids| ids.len()))
    }

    /// Whether `parent` already has an instance dated `date`
    pub fn has_child_on(&self, parent: TransactionId, date: NaiveDate) -> Result<bool, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        let indexes = self.indexes.read().map_err(poisoned)?;

        Ok(indexes.by_parent.get(&parent).is_some_and(|ids| {
            ids.iter()
                .filter_map(|id| data.get(id))
                .any(|t| t.date == date)
        }))
    }

    /// Payments booked for a subscription, oldest first
    pub fn get_by_subscription(
        &self,
        subscription: SubscriptionId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        let indexes = self.indexes.read().map_err(poisoned)?;

        let mut rows: Vec<_> = indexes
            .by_subscription
            .get(&subscription)
            .map(|ids| ids.iter().filter_map(|id| data.get(id).cloned()).collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(rows)
    }

    /// Whether any row has exactly this title, amount and date
    pub fn exists_matching(
        &self,
        title: &str,
        amount: Money,
        date: NaiveDate,
    ) -> Result<bool, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data
            .values()
            .any(|t| t.date == date && t.amount == amount && t.title == title))
    }

    /// Number of rows referencing the category name for the given type,
    /// ignoring case and surrounding whitespace
    pub fn count_by_category(
        &self,
        name: &str,
        kind: TransactionType,
    ) -> Result<usize, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data
            .values()
            .filter(|t| {
                t.transaction_type == kind && t.category.trim().eq_ignore_ascii_case(name.trim())
            })
            .count())
    }

    /// Insert or update a transaction
    pub fn upsert(&self, txn: Transaction) -> Result<(), LedgerError> {
        let mut data = self.data.write().map_err(poisoned)?;
        let mut indexes = self.indexes.write().map_err(poisoned)?;

        if let Some(old) = data.get(&txn.id) {
            indexes.remove(old);
        }
        indexes.add(&txn);
        data.insert(txn.id, txn);
        Ok(())
    }

    /// Delete a transaction, returning it if it existed
    pub fn delete(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError> {
        let mut data = self.data.write().map_err(poisoned)?;
        let mut indexes = self.indexes.write().map_err(poisoned)?;

        let removed = data.remove(&id);
        if let Some(txn) = &removed {
            indexes.remove(txn);
            indexes.by_parent.remove(&txn.id);
        }
        Ok(removed)
    }

    pub fn count(&self) -> Result<usize, LedgerError> {
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, TransactionRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = TransactionRepository::new(temp_dir.path().join("transactions.json"));
        (temp_dir, repo)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn expense(title: &str, cents: i64, on: NaiveDate) -> Transaction {
        Transaction::new(title, Money::from_cents(cents), TransactionType::Expense, "Other", on)
    }

    #[test]
    fn test_empty_load() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_children_index() {
        let (_temp_dir, repo) = create_test_repo();
        let template = expense("Gym", 3000, date(2025, 1, 5))
            .with_recurrence(Frequency::Monthly, None, None);
        let feb = template.spawn_instance(date(2025, 2, 5));
        let mar = template.spawn_instance(date(2025, 3, 5));

        repo.upsert(template.clone()).unwrap();
        repo.upsert(mar.clone()).unwrap();
        repo.upsert(feb.clone()).unwrap();

        assert_eq!(repo.count_children(template.id).unwrap(), 2);
        let children = repo.children_of(template.id).unwrap();
        assert_eq!(children[0].id, feb.id);
        assert!(repo.has_child_on(template.id, date(2025, 3, 5)).unwrap());
        assert!(!repo.has_child_on(template.id, date(2025, 4, 5)).unwrap());

        repo.delete(feb.id).unwrap();
        assert_eq!(repo.count_children(template.id).unwrap(), 1);
        assert_eq!(repo.get_templates().unwrap().len(), 1);
    }

    #[test]
    fn test_save_and_reload_rebuilds_indexes() {
        let (temp_dir, repo) = create_test_repo();
        let template = expense("Rent", 80000, date(2025, 1, 1))
            .with_recurrence(Frequency::Monthly, None, None);
        let child = template.spawn_instance(date(2025, 2, 1));
        repo.upsert(template.clone()).unwrap();
        repo.upsert(child).unwrap();
        repo.save().unwrap();

        let reloaded = TransactionRepository::new(temp_dir.path().join("transactions.json"));
        reloaded.load().unwrap();
        assert_eq!(reloaded.count().unwrap(), 2);
        assert_eq!(reloaded.count_children(template.id).unwrap(), 1);
    }

    #[test]
    fn test_exists_matching() {
        let (_temp_dir, repo) = create_test_repo();
        repo.upsert(expense("Netflix", 1299, date(2025, 3, 10))).unwrap();

        assert!(repo
            .exists_matching("Netflix", Money::from_cents(1299), date(2025, 3, 10))
            .unwrap());
        assert!(!repo
            .exists_matching("Netflix", Money::from_cents(1399), date(2025, 3, 10))
            .unwrap());
    }

    #[test]
    fn test_filters() {
        let (_temp_dir, repo) = create_test_repo();
        repo.upsert(expense("a", 100, date(2025, 1, 10))).unwrap();
        repo.upsert(expense("b", 200, date(2025, 1, 15))).unwrap();
        let mut salary = expense("c", 300, date(2025, 1, 20));
        salary.transaction_type = TransactionType::Income;
        salary.category = "Salary".into();
        repo.upsert(salary).unwrap();

        let range = repo
            .get_by_date_range(date(2025, 1, 12), date(2025, 1, 18))
            .unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range[0].title, "b");

        assert_eq!(repo.get_by_type(TransactionType::Income).unwrap().len(), 1);
        assert_eq!(
            repo.count_by_category("Other", TransactionType::Expense).unwrap(),
            2
        );
        assert_eq!(
            repo.count_by_category("Other", TransactionType::Income).unwrap(),
            0
        );
    }
}

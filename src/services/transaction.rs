//! Transaction service
//!
//! CRUD for ledger rows, including the template edit/delete state machine:
//! an edit can stay on one row or cascade to the template's future
//! instances, and a delete can remove a template together with everything
//! generated from it. Engine-generated rows are read-only here.

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::audit::{generate_diff, AuditEntry, EntityType};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Frequency, Money, Transaction, TransactionId, TransactionKind, TransactionType,
};
use crate::storage::Storage;

/// How far a template edit reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditScope {
    /// Only the selected row; existing instances keep their old values
    #[default]
    ThisOnly,
    /// The template and every instance dated after it
    ThisAndFuture,
}

/// How far a delete reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteScope {
    #[default]
    ThisOnly,
    /// The template and every row generated from it
    ThisAndLinked,
}

/// Options for filtering transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub kind: Option<TransactionKind>,
    /// Category name (case-insensitive)
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_type(mut self, kind: TransactionType) -> Self {
        self.transaction_type = Some(kind);
        self
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn category(mut self, name: impl Into<String>) -> Self {
        self.category = Some(name.into());
        self
    }

    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Recurrence settings for a new template
#[derive(Debug, Clone)]
pub struct RecurrenceInput {
    pub frequency: Frequency,
    pub end_date: Option<NaiveDate>,
    pub installments: Option<u32>,
}

/// Input for creating a new transaction
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub title: String,
    pub amount: Money,
    pub transaction_type: TransactionType,
    pub category: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub recurrence: Option<RecurrenceInput>,
}

/// Field changes for an update; `None` leaves a field as it is
///
/// The doubly-optional fields distinguish "no change" (`None`) from
/// "clear the value" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    pub title: Option<String>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub end_date: Option<Option<NaiveDate>>,
    pub installments: Option<Option<u32>>,
}

/// Result of an update
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub transaction: Transaction,
    /// Number of generated instances rewritten by a cascading edit
    pub cascaded: usize,
}

/// Service for transaction management
pub struct TransactionService<'a> {
    storage: &'a Storage,
}

impl<'a> TransactionService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create a one-off transaction or a recurring template
    pub fn create(&self, input: CreateTransactionInput) -> LedgerResult<Transaction> {
        let category = self.require_category(&input.category, input.transaction_type)?;

        let mut txn = Transaction::new(
            input.title.trim(),
            input.amount,
            input.transaction_type,
            category,
            input.date,
        );

        if let Some(description) = input.description {
            txn = txn.with_description(description);
        }

        if let Some(recurrence) = input.recurrence {
            if !recurrence.frequency.is_known() {
                return Err(LedgerError::Validation(format!(
                    "Unknown frequency: {}",
                    recurrence.frequency
                )));
            }
            txn = txn.with_recurrence(
                recurrence.frequency,
                recurrence.end_date,
                recurrence.installments,
            );
        }

        txn.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.storage.transactions.upsert(txn.clone())?;
        self.storage.transactions.save()?;

        self.storage.log_create(
            EntityType::Transaction,
            txn.id.to_string(),
            Some(txn.title.clone()),
            &txn,
        )?;

        Ok(txn)
    }

    pub fn get(&self, id: TransactionId) -> LedgerResult<Option<Transaction>> {
        self.storage.transactions.get(id)
    }

    /// Find a transaction by full id or short display form (`txn-1a2b3c4d`)
    pub fn find(&self, identifier: &str) -> LedgerResult<Option<Transaction>> {
        if let Ok(id) = identifier.parse::<TransactionId>() {
            return self.storage.transactions.get(id);
        }

        let mut matches: Vec<_> = self
            .storage
            .transactions
            .get_all()?
            .into_iter()
            .filter(|t| t.id.matches(identifier))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(LedgerError::Validation(format!(
                "'{}' matches {} transactions, use a longer id",
                identifier, n
            ))),
        }
    }

    /// List transactions, newest first
    pub fn list(&self, filter: TransactionFilter) -> LedgerResult<Vec<Transaction>> {
        let mut transactions = match (filter.start_date, filter.end_date) {
            (Some(start), Some(end)) => self.storage.transactions.get_by_date_range(start, end)?,
            _ => self.storage.transactions.get_all()?,
        };

        if let Some(start) = filter.start_date {
            transactions.retain(|t| t.date >= start);
        }
        if let Some(end) = filter.end_date {
            transactions.retain(|t| t.date <= end);
        }
        if let Some(kind) = filter.transaction_type {
            transactions.retain(|t| t.transaction_type == kind);
        }
        if let Some(kind) = filter.kind {
            transactions.retain(|t| t.kind() == kind);
        }
        if let Some(category) = &filter.category {
            transactions.retain(|t| t.category.eq_ignore_ascii_case(category));
        }
        if let Some(limit) = filter.limit {
            transactions.truncate(limit);
        }

        Ok(transactions)
    }

    /// Instances generated from a template, oldest first
    pub fn instances_of(&self, template: TransactionId) -> LedgerResult<Vec<Transaction>> {
        self.storage.transactions.children_of(template)
    }

    /// Update a row, optionally cascading to a template's future instances
    pub fn update(
        &self,
        id: TransactionId,
        input: UpdateTransactionInput,
        scope: EditScope,
    ) -> LedgerResult<UpdateOutcome> {
        let before = self
            .storage
            .transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;

        self.ensure_editable(&before)?;

        let mut txn = before.clone();
        if let Some(title) = input.title {
            txn.title = title.trim().to_string();
        }
        if let Some(amount) = input.amount {
            txn.amount = amount;
        }
        if let Some(description) = input.description {
            txn.description = description;
        }
        if let Some(category) = input.category {
            txn.category = self.require_category(&category, txn.transaction_type)?;
        }
        if let Some(date) = input.date {
            txn.date = date;
        }
        if let Some(frequency) = input.frequency {
            if !txn.is_recurring {
                return Err(LedgerError::Validation(
                    "Only recurring transactions have a frequency".into(),
                ));
            }
            if !frequency.is_known() {
                return Err(LedgerError::Validation(format!(
                    "Unknown frequency: {}",
                    frequency
                )));
            }
            txn.recurring_frequency = Some(frequency);
        }
        if let Some(end_date) = input.end_date {
            txn.recurring_end_date = end_date;
        }
        if let Some(installments) = input.installments {
            txn.installments = installments;
        }
        txn.updated_at = Utc::now();

        txn.validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        // Generated instances are keyed by date, so a template's schedule is
        // fixed once it has any
        let reschedules = txn.date != before.date
            || txn.recurring_frequency != before.recurring_frequency;
        if before.is_template()
            && reschedules
            && self.storage.transactions.count_children(before.id)? > 0
        {
            return Err(LedgerError::Validation(format!(
                "'{}' already has generated instances; its date and frequency can no longer change",
                before.title
            )));
        }

        // Instances after the template's original date follow the edit
        let mut rewritten = Vec::new();
        if scope == EditScope::ThisAndFuture && before.is_template() {
            for mut child in self.storage.transactions.children_of(before.id)? {
                if child.date <= before.date {
                    continue;
                }
                let child_before = child.clone();
                child.copy_content_from(&txn);
                child
                    .validate()
                    .map_err(|e| LedgerError::Validation(e.to_string()))?;
                rewritten.push((child_before, child));
            }
        }

        self.storage.transactions.upsert(txn.clone())?;
        for (_, child) in &rewritten {
            self.storage.transactions.upsert(child.clone())?;
        }
        self.storage.transactions.save()?;

        let mut entries = vec![AuditEntry::update(
            EntityType::Transaction,
            txn.id.to_string(),
            Some(txn.title.clone()),
            &before,
            &txn,
            diff_of(&before, &txn),
        )];
        entries.extend(rewritten.iter().map(|(old, new)| {
            AuditEntry::update(
                EntityType::Transaction,
                new.id.to_string(),
                Some(new.title.clone()),
                old,
                new,
                diff_of(old, new),
            )
        }));
        self.storage.audit().log_batch(&entries)?;

        debug!(transaction_id = %txn.id, cascaded = rewritten.len(), "transaction updated");

        Ok(UpdateOutcome {
            transaction: txn,
            cascaded: rewritten.len(),
        })
    }

    /// Delete a row; with `ThisAndLinked` a template takes its instances along
    ///
    /// Returns every removed row.
    pub fn delete(&self, id: TransactionId, scope: DeleteScope) -> LedgerResult<Vec<Transaction>> {
        let txn = self
            .storage
            .transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;

        self.ensure_editable(&txn)?;

        let mut doomed = vec![txn.id];
        if scope == DeleteScope::ThisAndLinked && txn.is_template() {
            doomed.extend(
                self.storage
                    .transactions
                    .children_of(txn.id)?
                    .into_iter()
                    .map(|child| child.id),
            );
        }

        let mut removed = Vec::with_capacity(doomed.len());
        for doomed_id in doomed {
            if let Some(row) = self.storage.transactions.delete(doomed_id)? {
                removed.push(row);
            }
        }
        self.storage.transactions.save()?;

        let entries: Vec<_> = removed
            .iter()
            .map(|row| {
                AuditEntry::delete(
                    EntityType::Transaction,
                    row.id.to_string(),
                    Some(row.title.clone()),
                    row,
                )
            })
            .collect();
        self.storage.audit().log_batch(&entries)?;

        Ok(removed)
    }

    pub fn count(&self) -> LedgerResult<usize> {
        self.storage.transactions.count()
    }

    /// Reject edits to engine-generated rows whose origin still exists
    ///
    /// An instance whose template or subscription has been deleted is an
    /// orphan and may be edited or deleted like a one-off.
    fn ensure_editable(&self, txn: &Transaction) -> LedgerResult<()> {
        let origin_exists = match txn.kind() {
            TransactionKind::Generated => match txn.parent_id {
                Some(parent) => self.storage.transactions.get(parent)?.is_some(),
                None => false,
            },
            TransactionKind::SubscriptionInstance => match txn.subscription_id {
                Some(sub) => self.storage.subscriptions.get(sub)?.is_some(),
                None => false,
            },
            TransactionKind::Template | TransactionKind::OneOff => false,
        };

        if origin_exists {
            return Err(LedgerError::ReadOnly(format!(
                "{} was generated from a {}; edit the origin instead",
                txn.id,
                if txn.kind() == TransactionKind::Generated {
                    "recurring template"
                } else {
                    "subscription"
                }
            )));
        }
        Ok(())
    }

    /// Stored spelling of the category `name` refers to
    fn require_category(&self, name: &str, kind: TransactionType) -> LedgerResult<String> {
        match self.storage.categories.find_by_name(kind, name)? {
            Some(category) => Ok(category.name),
            None => Err(LedgerError::Validation(format!(
                "No {} category named '{}'",
                kind.as_str(),
                name.trim()
            ))),
        }
    }
}

fn diff_of(before: &Transaction, after: &Transaction) -> Option<String> {
    match (serde_json::to_value(before), serde_json::to_value(after)) {
        (Ok(b), Ok(a)) => generate_diff(&b, &a),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerPaths;
    use crate::models::{Category, Subscription};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        storage
            .categories
            .upsert(Category::new("Home", TransactionType::Expense, "Home"))
            .unwrap();
        storage
            .categories
            .upsert(Category::new("Leisure", TransactionType::Expense, "Gamepad2"))
            .unwrap();
        (temp_dir, storage)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rent_input(recurring: bool) -> CreateTransactionInput {
        CreateTransactionInput {
            title: "Rent".into(),
            amount: Money::from_cents(80000),
            transaction_type: TransactionType::Expense,
            category: "Home".into(),
            date: date(2025, 1, 1),
            description: None,
            recurrence: recurring.then(|| RecurrenceInput {
                frequency: Frequency::Monthly,
                end_date: None,
                installments: None,
            }),
        }
    }

    /// Template on 2025-01-01 with instances for Feb, Mar and Apr
    fn template_with_children(storage: &Storage) -> (Transaction, Vec<Transaction>) {
        let service = TransactionService::new(storage);
        let template = service.create(rent_input(true)).unwrap();
        let children: Vec<_> = [2, 3, 4]
            .into_iter()
            .map(|m| template.spawn_instance(date(2025, m, 1)))
            .collect();
        for child in &children {
            storage.transactions.upsert(child.clone()).unwrap();
        }
        (template, children)
    }

    #[test]
    fn test_create_requires_known_category() {
        let (_temp_dir, storage) = create_test_storage();
        let service = TransactionService::new(&storage);

        let txn = service.create(rent_input(false)).unwrap();
        assert_eq!(txn.kind(), TransactionKind::OneOff);

        let mut input = rent_input(false);
        input.category = "Nope".into();
        assert!(service.create(input).unwrap_err().is_validation());

        let mut input = rent_input(false);
        input.transaction_type = TransactionType::Income;
        assert!(service.create(input).unwrap_err().is_validation());
    }

    #[test]
    fn test_create_template() {
        let (_temp_dir, storage) = create_test_storage();
        let service = TransactionService::new(&storage);

        let txn = service.create(rent_input(true)).unwrap();
        assert!(txn.is_template());
        assert_eq!(storage.audit().read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_find_by_short_id() {
        let (_temp_dir, storage) = create_test_storage();
        let service = TransactionService::new(&storage);
        let txn = service.create(rent_input(false)).unwrap();

        let found = service.find(&txn.id.to_string()).unwrap().unwrap();
        assert_eq!(found.id, txn.id);

        let full = service.find(&txn.id.as_uuid().to_string()).unwrap().unwrap();
        assert_eq!(full.id, txn.id);
        assert!(service.find("txn-").unwrap().is_none());
    }

    #[test]
    fn test_this_only_edit_leaves_instances_stale() {
        let (_temp_dir, storage) = create_test_storage();
        let (template, children) = template_with_children(&storage);
        let service = TransactionService::new(&storage);

        let outcome = service
            .update(
                template.id,
                UpdateTransactionInput {
                    amount: Some(Money::from_cents(90000)),
                    ..Default::default()
                },
                EditScope::ThisOnly,
            )
            .unwrap();

        assert_eq!(outcome.cascaded, 0);
        assert_eq!(outcome.transaction.amount, Money::from_cents(90000));
        let child = storage.transactions.get(children[0].id).unwrap().unwrap();
        assert_eq!(child.amount, Money::from_cents(80000));
    }

    #[test]
    fn test_this_and_future_edit_cascades() {
        let (_temp_dir, storage) = create_test_storage();
        let (template, children) = template_with_children(&storage);
        let service = TransactionService::new(&storage);

        let outcome = service
            .update(
                template.id,
                UpdateTransactionInput {
                    amount: Some(Money::from_cents(90000)),
                    title: Some("Rent (new lease)".into()),
                    category: Some("Leisure".into()),
                    ..Default::default()
                },
                EditScope::ThisAndFuture,
            )
            .unwrap();

        assert_eq!(outcome.cascaded, 3);
        for original in &children {
            let child = storage.transactions.get(original.id).unwrap().unwrap();
            assert_eq!(child.amount, Money::from_cents(90000));
            assert_eq!(child.title, "Rent (new lease)");
            assert_eq!(child.category, "Leisure");
            assert_eq!(child.date, original.date);
            assert_eq!(child.parent_id, Some(template.id));
        }
    }

    #[test]
    fn test_template_with_instances_keeps_its_schedule() {
        let (_temp_dir, storage) = create_test_storage();
        let service = TransactionService::new(&storage);
        let template = service.create(rent_input(true)).unwrap();
        crate::services::run_recurring_catch_up(&storage, date(2025, 4, 20)).unwrap();
        assert_eq!(service.instances_of(template.id).unwrap().len(), 3);

        for input in [
            UpdateTransactionInput {
                date: Some(date(2025, 1, 15)),
                ..Default::default()
            },
            UpdateTransactionInput {
                frequency: Some(Frequency::Weekly),
                ..Default::default()
            },
        ] {
            let err = service
                .update(template.id, input, EditScope::ThisAndFuture)
                .unwrap_err();
            assert!(err.is_validation());
        }

        let report = crate::services::run_recurring_catch_up(&storage, date(2025, 4, 20)).unwrap();
        assert_eq!(report.generated, 0);
        let dates: Vec<_> = service
            .instances_of(template.id)
            .unwrap()
            .into_iter()
            .map(|t| t.date)
            .collect();
        assert_eq!(dates, vec![date(2025, 2, 1), date(2025, 3, 1), date(2025, 4, 1)]);
    }

    #[test]
    fn test_template_without_instances_can_move() {
        let (_temp_dir, storage) = create_test_storage();
        let service = TransactionService::new(&storage);
        let template = service.create(rent_input(true)).unwrap();

        let outcome = service
            .update(
                template.id,
                UpdateTransactionInput {
                    date: Some(date(2025, 1, 15)),
                    ..Default::default()
                },
                EditScope::ThisOnly,
            )
            .unwrap();
        assert_eq!(outcome.transaction.date, date(2025, 1, 15));
    }

    #[test]
    fn test_category_is_stored_with_its_canonical_name() {
        let (_temp_dir, storage) = create_test_storage();
        let service = TransactionService::new(&storage);

        let mut input = rent_input(false);
        input.category = "  hOmE ".into();
        let txn = service.create(input).unwrap();
        assert_eq!(txn.category, "Home");

        let outcome = service
            .update(
                txn.id,
                UpdateTransactionInput {
                    category: Some("leisure".into()),
                    ..Default::default()
                },
                EditScope::ThisOnly,
            )
            .unwrap();
        assert_eq!(outcome.transaction.category, "Leisure");
    }

    #[test]
    fn test_generated_rows_are_read_only() {
        let (_temp_dir, storage) = create_test_storage();
        let (_template, children) = template_with_children(&storage);
        let service = TransactionService::new(&storage);

        let err = service
            .update(children[0].id, UpdateTransactionInput::default(), EditScope::ThisOnly)
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReadOnly(_)));

        let err = service
            .delete(children[0].id, DeleteScope::ThisOnly)
            .unwrap_err();
        assert!(matches!(err, LedgerError::ReadOnly(_)));

        let sub = Subscription::new(
            "Netflix",
            Money::from_cents(1299),
            "Leisure",
            date(2025, 1, 1),
            Frequency::Monthly,
        );
        let payment = sub.payment_on(date(2025, 1, 1));
        storage.subscriptions.upsert(sub).unwrap();
        storage.transactions.upsert(payment.clone()).unwrap();
        assert!(matches!(
            service.delete(payment.id, DeleteScope::ThisOnly),
            Err(LedgerError::ReadOnly(_))
        ));
    }

    #[test]
    fn test_cascade_delete_removes_template_and_children_only() {
        let (_temp_dir, storage) = create_test_storage();
        let (template, _children) = template_with_children(&storage);
        let service = TransactionService::new(&storage);
        let unrelated = service.create(rent_input(false)).unwrap();

        let removed = service
            .delete(template.id, DeleteScope::ThisAndLinked)
            .unwrap();

        assert_eq!(removed.len(), 4);
        assert_eq!(storage.transactions.count().unwrap(), 1);
        assert!(storage.transactions.get(unrelated.id).unwrap().is_some());
    }

    #[test]
    fn test_this_only_delete_orphans_children() {
        let (_temp_dir, storage) = create_test_storage();
        let (template, children) = template_with_children(&storage);
        let service = TransactionService::new(&storage);

        let removed = service.delete(template.id, DeleteScope::ThisOnly).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(storage.transactions.count().unwrap(), 3);

        // Orphans can now be removed individually
        service.delete(children[0].id, DeleteScope::ThisOnly).unwrap();
        assert_eq!(storage.transactions.count().unwrap(), 2);
    }

    #[test]
    fn test_list_filters() {
        let (_temp_dir, storage) = create_test_storage();
        let (_template, _children) = template_with_children(&storage);
        let service = TransactionService::new(&storage);

        let generated = service
            .list(TransactionFilter::new().kind(TransactionKind::Generated))
            .unwrap();
        assert_eq!(generated.len(), 3);
        assert_eq!(generated[0].date, date(2025, 4, 1));

        let limited = service
            .list(
                TransactionFilter::new()
                    .date_range(date(2025, 2, 1), date(2025, 3, 31))
                    .limit(1),
            )
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].date, date(2025, 3, 1));
    }
}

//! Recurring event engine
//!
//! Brings the ledger up to date: every recurring template gets one instance
//! per elapsed cycle and every active subscription gets one booked expense
//! per due payment. Running it again the same day adds nothing.
//!
//! Each entity yields its pending dates through a [`CycleIter`] and is
//! processed in isolation: a failure on one template or subscription is
//! logged and recorded in the [`CatchUpReport`], and the run moves on.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::audit::{AuditEntry, EntityType};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Schedule, Subscription, SubscriptionId, Transaction, TransactionId};
use crate::storage::Storage;

/// Cooperative cancellation, checked between cycles
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pending cycle dates of one series, up to an inclusive limit
///
/// Stops at the limit or as soon as the schedule stops moving forward
/// (unknown frequency).
#[derive(Debug, Clone)]
pub struct CycleIter {
    schedule: Schedule,
    next_index: u32,
    previous: Option<NaiveDate>,
    limit: NaiveDate,
}

impl CycleIter {
    /// Cycles of a template after its own date, up to `today` and its end date
    pub fn for_template(template: &Transaction, today: NaiveDate) -> Option<Self> {
        let frequency = template.recurring_frequency.clone()?;
        let limit = match template.recurring_end_date {
            Some(end) => end.min(today),
            None => today,
        };
        Some(Self {
            schedule: Schedule::new(template.date, frequency),
            next_index: 1,
            previous: Some(template.date),
            limit,
        })
    }

    /// Due payments of a subscription, starting with its current cursor
    ///
    /// Later dates follow the subscription's anchor day, so a cursor clamped
    /// into a short month does not pull the rest of the series earlier.
    pub fn for_subscription(subscription: &Subscription, today: NaiveDate) -> Self {
        Self {
            schedule: subscription.schedule(),
            next_index: 0,
            previous: None,
            limit: today,
        }
    }

    /// The date the series would produce next, regardless of the limit
    pub fn upcoming(&self) -> NaiveDate {
        self.schedule.occurrence(self.next_index)
    }
}

impl Iterator for CycleIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let date = self.schedule.occurrence(self.next_index);
        if date > self.limit || self.previous.is_some_and(|p| date <= p) {
            return None;
        }
        self.next_index = self.next_index.checked_add(1)?;
        self.previous = Some(date);
        Some(date)
    }
}

/// One entity that could not be brought up to date
#[derive(Debug, Clone)]
pub struct EntityFailure {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub name: String,
    pub error: String,
}

/// Outcome of a catch-up run
#[derive(Debug, Clone, Default)]
pub struct CatchUpReport {
    pub templates_checked: usize,
    pub subscriptions_checked: usize,
    /// Instances created from templates
    pub generated: usize,
    /// Expenses booked for subscriptions
    pub subscription_payments: usize,
    /// Cycles that already had a row and were left alone
    pub already_present: usize,
    pub failures: Vec<EntityFailure>,
    /// Entities skipped because they vanished or cannot advance
    pub skipped: usize,
    pub cancelled: bool,
}

impl CatchUpReport {
    pub fn inserted(&self) -> usize {
        self.generated + self.subscription_payments
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

enum Step {
    Inserted,
    AlreadyPresent,
}

/// Drives the catch-up over all templates and subscriptions
pub struct RecurringEngine<'a> {
    storage: &'a Storage,
    cancel: CancelFlag,
    /// Cycles left before the run cancels itself
    budget: Cell<Option<usize>>,
}

impl<'a> RecurringEngine<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            cancel: CancelFlag::new(),
            budget: Cell::new(None),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process at most `cycles` cycles, then stop as if cancelled
    ///
    /// Everything handled before the stop is already on disk; the next run
    /// resumes from there.
    pub fn with_cycle_budget(self, cycles: usize) -> Self {
        self.budget.set(Some(cycles));
        if cycles == 0 {
            self.cancel.cancel();
        }
        self
    }

    fn spend_cycle(&self) {
        if let Some(left) = self.budget.get() {
            let left = left.saturating_sub(1);
            self.budget.set(Some(left));
            if left == 0 {
                self.cancel.cancel();
            }
        }
    }

    /// Bring every template and active subscription up to `today`
    ///
    /// Only reading the entity lists can fail the whole run; anything after
    /// that is isolated per entity.
    pub fn run(&self, today: NaiveDate) -> LedgerResult<CatchUpReport> {
        let mut report = CatchUpReport::default();

        let templates = self.storage.transactions.get_templates()?;
        for template in &templates {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.templates_checked += 1;
            match self.expand_template(template.id, today, &mut report) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    debug!(template_id = %template.id, "template vanished during catch-up: {e}");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(template_id = %template.id, "recurring template catch-up failed: {e}");
                    report.failures.push(EntityFailure {
                        entity_type: EntityType::Transaction,
                        entity_id: template.id.to_string(),
                        name: template.title.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !report.cancelled {
            let subscriptions = self.storage.subscriptions.get_active()?;
            for subscription in &subscriptions {
                if self.cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                report.subscriptions_checked += 1;
                match self.book_subscription(subscription.id, today, &mut report) {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        debug!(subscription_id = %subscription.id, "subscription vanished during catch-up: {e}");
                        report.skipped += 1;
                    }
                    Err(e) => {
                        warn!(subscription_id = %subscription.id, "subscription catch-up failed: {e}");
                        report.failures.push(EntityFailure {
                            entity_type: EntityType::Subscription,
                            entity_id: subscription.id.to_string(),
                            name: subscription.name.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        report.cancelled = report.cancelled || self.cancel.is_cancelled();

        info!(
            generated = report.generated,
            subscription_payments = report.subscription_payments,
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "recurring catch-up finished"
        );

        Ok(report)
    }

    fn expand_template(
        &self,
        id: TransactionId,
        today: NaiveDate,
        report: &mut CatchUpReport,
    ) -> LedgerResult<()> {
        let template = self
            .storage
            .transactions
            .get(id)?
            .ok_or_else(|| LedgerError::transaction_not_found(id.to_string()))?;

        let Some(cycles) = CycleIter::for_template(&template, today) else {
            report.skipped += 1;
            return Ok(());
        };

        let mut quota = match template.installments {
            Some(total) => Some(
                (total as usize)
                    .saturating_sub(1)
                    .saturating_sub(self.storage.transactions.count_children(template.id)?),
            ),
            None => None,
        };

        for date in cycles {
            if quota == Some(0) || self.cancel.is_cancelled() {
                break;
            }
            match self.materialize_instance(&template, date)? {
                Step::Inserted => {
                    report.generated += 1;
                    quota = quota.map(|q| q - 1);
                }
                Step::AlreadyPresent => report.already_present += 1,
            }
            self.spend_cycle();
        }

        Ok(())
    }

    fn materialize_instance(&self, template: &Transaction, date: NaiveDate) -> LedgerResult<Step> {
        if self.storage.transactions.has_child_on(template.id, date)? {
            return Ok(Step::AlreadyPresent);
        }

        let instance = template.spawn_instance(date);
        instance
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.insert(instance)?;
        Ok(Step::Inserted)
    }

    fn book_subscription(
        &self,
        id: SubscriptionId,
        today: NaiveDate,
        report: &mut CatchUpReport,
    ) -> LedgerResult<()> {
        let mut subscription = self
            .storage
            .subscriptions
            .get(id)?
            .ok_or_else(|| LedgerError::subscription_not_found(id.to_string()))?;

        if !subscription.frequency.is_known() {
            warn!(
                subscription_id = %subscription.id,
                frequency = %subscription.frequency,
                "subscription has an unknown frequency and cannot advance"
            );
            report.skipped += 1;
            return Ok(());
        }

        let mut cycles = CycleIter::for_subscription(&subscription, today);
        while let Some(date) = cycles.next() {
            if self.cancel.is_cancelled() {
                break;
            }

            let payment = subscription.payment_on(date);
            if self
                .storage
                .transactions
                .exists_matching(&payment.title, payment.amount, date)?
            {
                report.already_present += 1;
            } else {
                payment
                    .validate()
                    .map_err(|e| LedgerError::Validation(e.to_string()))?;
                self.insert(payment)?;
                report.subscription_payments += 1;
            }

            subscription.set_next_payment(cycles.upcoming());
            self.storage.subscriptions.upsert(subscription.clone())?;
            self.storage.subscriptions.save()?;
            self.spend_cycle();
        }

        Ok(())
    }

    fn insert(&self, txn: Transaction) -> LedgerResult<()> {
        let entry = AuditEntry::create(
            EntityType::Transaction,
            txn.id.to_string(),
            Some(txn.title.clone()),
            &txn,
        );
        self.storage.transactions.upsert(txn)?;
        self.storage.transactions.save()?;
        self.storage.audit().log(&entry)
    }
}

/// Run the catch-up against `storage` for `today`
pub fn run_recurring_catch_up(storage: &Storage, today: NaiveDate) -> LedgerResult<CatchUpReport> {
    RecurringEngine::new(storage).run(today)
}

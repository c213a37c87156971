//! Snapshot of the whole ledger in the portable backup format
//!
//! Records carry no storage ids. Links between rows are written as
//! positions: a transaction's `parentId` is the index of its template in
//! `transactions` and `subscriptionId` the index of its subscription in
//! `subscriptions`. Restoring assigns fresh ids and maps the positions back.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Category, Frequency, Money, Subscription, SubscriptionId, SubscriptionStatus, Transaction,
    TransactionId, TransactionType,
};
use crate::storage::{LedgerContents, Storage};

/// Backup format version written and accepted by this build
pub const SNAPSHOT_VERSION: u64 = 1;

/// A transaction as stored in a backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Integer cents
    pub amount: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub is_recurring: bool,
    pub installments: Option<u32>,
    pub recurring_frequency: Option<Frequency>,
    pub recurring_end_date: Option<NaiveDate>,
    pub subscription_id: Option<usize>,
    /// Absent in backups from before template links were kept
    #[serde(default)]
    pub parent_id: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub name: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub category_type: TransactionType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub name: String,
    /// Integer cents
    pub amount: i64,
    pub category: String,
    pub next_payment: NaiveDate,
    pub frequency: Frequency,
    /// Absent in backups from before the anchor day was kept
    #[serde(default)]
    pub anchor_day: Option<u32>,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub color: Option<String>,
}

/// Everything a backup holds except its signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub version: u64,
    pub exported_at: String,
    pub transactions: Vec<TransactionRecord>,
    pub categories: Vec<CategoryRecord>,
    pub subscriptions: Vec<SubscriptionRecord>,
}

/// Reads the ledger into a [`SnapshotPayload`]
pub struct SnapshotBuilder<'a> {
    storage: &'a Storage,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn build(&self) -> LedgerResult<SnapshotPayload> {
        self.build_at(Utc::now())
    }

    /// Snapshot stamped with `exported_at`
    pub fn build_at(&self, exported_at: DateTime<Utc>) -> LedgerResult<SnapshotPayload> {
        let contents = self.storage.contents()?;
        Ok(SnapshotPayload::from_contents(&contents, exported_at))
    }
}

impl SnapshotPayload {
    /// Strip ids from `contents` and turn links into positions
    ///
    /// A link whose target is gone (an orphaned instance) is written as
    /// `null`.
    pub fn from_contents(contents: &LedgerContents, exported_at: DateTime<Utc>) -> Self {
        let txn_index: HashMap<TransactionId, usize> = contents
            .transactions
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id, i))
            .collect();
        let sub_index: HashMap<SubscriptionId, usize> = contents
            .subscriptions
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();

        let transactions = contents
            .transactions
            .iter()
            .map(|t| TransactionRecord {
                amount: t.amount.cents(),
                title: t.title.clone(),
                description: t.description.clone(),
                category: t.category.clone(),
                date: t.date,
                transaction_type: t.transaction_type,
                is_recurring: t.is_recurring,
                installments: t.installments,
                recurring_frequency: t.recurring_frequency.clone(),
                recurring_end_date: t.recurring_end_date,
                subscription_id: t.subscription_id.and_then(|id| sub_index.get(&id).copied()),
                parent_id: t.parent_id.and_then(|id| txn_index.get(&id).copied()),
            })
            .collect();

        let categories = contents
            .categories
            .iter()
            .map(|c| CategoryRecord {
                name: c.name.clone(),
                icon: c.icon.clone(),
                category_type: c.category_type,
            })
            .collect();

        let subscriptions = contents
            .subscriptions
            .iter()
            .map(|s| SubscriptionRecord {
                name: s.name.clone(),
                amount: s.amount.cents(),
                category: s.category.clone(),
                next_payment: s.next_payment,
                frequency: s.frequency.clone(),
                anchor_day: Some(s.anchor_day()),
                status: s.status,
                color: s.color.clone(),
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            exported_at: exported_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            transactions,
            categories,
            subscriptions,
        }
    }

    /// Rebuild ledger rows with fresh ids, restoring links from positions
    ///
    /// Every row is validated; an out-of-range or self-referencing position
    /// is rejected.
    pub fn into_contents(self) -> LedgerResult<LedgerContents> {
        let subscriptions: Vec<Subscription> = self
            .subscriptions
            .into_iter()
            .enumerate()
            .map(|(i, record)| -> LedgerResult<Subscription> {
                let mut subscription = Subscription::new(
                    record.name,
                    Money::from_cents(record.amount),
                    record.category,
                    record.next_payment,
                    record.frequency,
                );
                if let Some(day) = record.anchor_day {
                    subscription.anchor_day = Some(day);
                }
                subscription.status = record.status;
                subscription.color = record.color;
                subscription
                    .validate()
                    .map_err(|e| invalid("subscriptions", i, e))?;
                Ok(subscription)
            })
            .collect::<LedgerResult<_>>()?;

        let ids: Vec<TransactionId> = self
            .transactions
            .iter()
            .map(|_| TransactionId::new())
            .collect();

        let transactions: Vec<Transaction> = self
            .transactions
            .into_iter()
            .enumerate()
            .map(|(i, record)| -> LedgerResult<Transaction> {
                let mut txn = Transaction::new(
                    record.title,
                    Money::from_cents(record.amount),
                    record.transaction_type,
                    record.category,
                    record.date,
                );
                txn.id = ids[i];
                txn.description = record.description;
                txn.is_recurring = record.is_recurring;
                txn.installments = record.installments;
                txn.recurring_frequency = record.recurring_frequency;
                txn.recurring_end_date = record.recurring_end_date;

                txn.parent_id = match record.parent_id {
                    Some(p) if p == i => {
                        return Err(invalid("transactions", i, "parentId points at itself"))
                    }
                    Some(p) => Some(*ids.get(p).ok_or_else(|| {
                        invalid("transactions", i, format!("parentId {p} is out of range"))
                    })?),
                    None => None,
                };
                txn.subscription_id = match record.subscription_id {
                    Some(s) => Some(subscriptions.get(s).map(|sub| sub.id).ok_or_else(|| {
                        invalid("transactions", i, format!("subscriptionId {s} is out of range"))
                    })?),
                    None => None,
                };

                txn.validate().map_err(|e| invalid("transactions", i, e))?;
                Ok(txn)
            })
            .collect::<LedgerResult<_>>()?;

        let categories: Vec<Category> = self
            .categories
            .into_iter()
            .enumerate()
            .map(|(i, record)| -> LedgerResult<Category> {
                let category = Category::new(record.name, record.category_type, record.icon);
                category.validate().map_err(|e| invalid("categories", i, e))?;
                Ok(category)
            })
            .collect::<LedgerResult<_>>()?;

        Ok(LedgerContents {
            categories,
            transactions,
            subscriptions,
        })
    }
}

fn invalid(table: &str, index: usize, reason: impl std::fmt::Display) -> LedgerError {
    LedgerError::Validation(format!("{table}[{index}]: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn linked_contents() -> LedgerContents {
        let template = Transaction::new(
            "Rent",
            Money::from_cents(80000),
            TransactionType::Expense,
            "Home",
            date(2025, 1, 1),
        )
        .with_recurrence(Frequency::Monthly, None, Some(12));
        let child = template.spawn_instance(date(2025, 2, 1));
        let netflix = Subscription::new(
            "Netflix",
            Money::from_cents(1299),
            "Leisure",
            date(2025, 3, 10),
            Frequency::Monthly,
        );
        let payment = netflix.payment_on(date(2025, 2, 10));

        LedgerContents {
            categories: vec![Category::new("Home", TransactionType::Expense, "Home")],
            transactions: vec![child, payment, template],
            subscriptions: vec![netflix],
        }
    }

    #[test]
    fn test_links_become_positions() {
        let payload = SnapshotPayload::from_contents(&linked_contents(), Utc::now());

        assert_eq!(payload.version, SNAPSHOT_VERSION);
        assert_eq!(payload.transactions[0].parent_id, Some(2));
        assert_eq!(payload.transactions[1].subscription_id, Some(0));
        assert_eq!(payload.transactions[2].parent_id, None);
        assert_eq!(payload.transactions[2].amount, 80000);
    }

    #[test]
    fn test_unset_optionals_are_explicit_nulls() {
        let payload = SnapshotPayload::from_contents(&linked_contents(), Utc::now());
        let value = serde_json::to_value(&payload).unwrap();

        let payment = &value["transactions"][1];
        for key in [
            "installments",
            "recurringFrequency",
            "recurringEndDate",
            "parentId",
        ] {
            assert!(payment[key].is_null(), "{key} should be null");
            assert!(payment.as_object().unwrap().contains_key(key));
        }
        assert!(value["subscriptions"][0]
            .as_object()
            .unwrap()
            .contains_key("color"));
        assert!(payment.get("id").is_none());
    }

    #[test]
    fn test_exported_at_format() {
        let at = DateTime::parse_from_rfc3339("2025-03-04T05:06:07.089Z")
            .unwrap()
            .with_timezone(&Utc);
        let payload = SnapshotPayload::from_contents(&LedgerContents::default(), at);
        assert_eq!(payload.exported_at, "2025-03-04T05:06:07.089Z");
    }

    #[test]
    fn test_round_trip_keeps_links() {
        let payload = SnapshotPayload::from_contents(&linked_contents(), Utc::now());
        let contents = payload.into_contents().unwrap();

        let template = &contents.transactions[2];
        let child = &contents.transactions[0];
        let payment = &contents.transactions[1];

        assert_eq!(template.kind(), TransactionKind::Template);
        assert_eq!(child.parent_id, Some(template.id));
        assert_eq!(payment.subscription_id, Some(contents.subscriptions[0].id));
        assert_eq!(template.installments, Some(12));
    }

    #[test]
    fn test_out_of_range_parent_is_rejected() {
        let mut payload = SnapshotPayload::from_contents(&linked_contents(), Utc::now());
        payload.transactions[0].parent_id = Some(9);
        let err = payload.into_contents().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("transactions[0]"));
    }

    #[test]
    fn test_self_parent_is_rejected() {
        let mut payload = SnapshotPayload::from_contents(&linked_contents(), Utc::now());
        payload.transactions[2].parent_id = Some(2);
        assert!(payload.into_contents().unwrap_err().is_validation());
    }

    #[test]
    fn test_anchor_day_survives_round_trip() {
        let mut contents = linked_contents();
        contents.subscriptions[0] = Subscription::new(
            "Rent",
            Money::from_cents(90000),
            "Home",
            date(2025, 1, 31),
            Frequency::Monthly,
        );
        contents.subscriptions[0].set_next_payment(date(2025, 2, 28));

        let payload = SnapshotPayload::from_contents(&contents, Utc::now());
        assert_eq!(payload.subscriptions[0].anchor_day, Some(31));

        let restored = payload.into_contents().unwrap();
        assert_eq!(restored.subscriptions[0].anchor_day(), 31);
        assert_eq!(restored.subscriptions[0].next_payment, date(2025, 2, 28));
    }

    #[test]
    fn test_missing_anchor_day_falls_back_to_cursor() {
        let mut payload = SnapshotPayload::from_contents(&linked_contents(), Utc::now());
        payload.subscriptions[0].anchor_day = None;
        let restored = payload.into_contents().unwrap();
        assert_eq!(restored.subscriptions[0].anchor_day(), 10);
    }
}

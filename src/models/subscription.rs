//! Subscription model
//!
//! A subscription is a recurring expense with a rolling cursor
//! (`next_payment`). The engine books one expense per due cycle and moves
//! the cursor forward.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::frequency::{Frequency, Schedule};
use super::ids::SubscriptionId;
use super::money::Money;
use super::transaction::{Transaction, TransactionType};

/// Whether the engine expands a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Paused,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Paused => write!(f, "Paused"),
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            other => Err(format!("unknown subscription status '{}'", other)),
        }
    }
}

/// A recurring subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier
    pub id: SubscriptionId,

    pub name: String,

    /// Amount charged each cycle
    pub amount: Money,

    /// Category name used for the booked expenses
    pub category: String,

    /// Next date a payment is due
    pub next_payment: NaiveDate,

    pub frequency: Frequency,

    /// Day of month the series is due on; `next_payment` may sit earlier
    /// in a short month. Taken from `next_payment` when absent.
    #[serde(default)]
    pub anchor_day: Option<u32>,

    #[serde(default)]
    pub status: SubscriptionStatus,

    /// Display color
    #[serde(default)]
    pub color: Option<String>,

    /// When the subscription was created
    pub created_at: DateTime<Utc>,

    /// When the subscription was last modified
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Create a new active subscription
    pub fn new(
        name: impl Into<String>,
        amount: Money,
        category: impl Into<String>,
        next_payment: NaiveDate,
        frequency: Frequency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SubscriptionId::new(),
            name: name.into(),
            amount,
            category: category.into(),
            next_payment,
            frequency,
            anchor_day: Some(next_payment.day()),
            status: SubscriptionStatus::Active,
            color: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    pub fn pause(&mut self) {
        self.status = SubscriptionStatus::Paused;
        self.updated_at = Utc::now();
    }

    pub fn resume(&mut self) {
        self.status = SubscriptionStatus::Active;
        self.updated_at = Utc::now();
    }

    /// Move the cursor to `date`, keeping the series' anchor day
    pub fn set_next_payment(&mut self, date: NaiveDate) {
        self.next_payment = date;
        self.updated_at = Utc::now();
    }

    /// Start the series over at `date`, which becomes the new anchor day
    pub fn reschedule(&mut self, date: NaiveDate) {
        self.anchor_day = Some(date.day());
        self.set_next_payment(date);
    }

    pub fn anchor_day(&self) -> u32 {
        self.anchor_day.unwrap_or_else(|| self.next_payment.day())
    }

    /// Due dates from the current cursor onward
    pub fn schedule(&self) -> Schedule {
        Schedule::with_anchor_day(self.next_payment, self.frequency.clone(), self.anchor_day())
    }

    /// Cost of this subscription normalized to one month
    pub fn monthly_cost(&self) -> Option<Money> {
        self.frequency.monthly_amount(self.amount)
    }

    /// The expense booked for the payment due on `date`
    pub fn payment_on(&self, date: NaiveDate) -> Transaction {
        let mut txn = Transaction::new(
            self.name.clone(),
            self.amount,
            TransactionType::Expense,
            self.category.clone(),
            date,
        );
        txn.subscription_id = Some(self.id);
        txn
    }

    /// Validate the subscription
    pub fn validate(&self) -> Result<(), SubscriptionValidationError> {
        if self.name.trim().is_empty() {
            return Err(SubscriptionValidationError::EmptyName);
        }

        if self.category.trim().is_empty() {
            return Err(SubscriptionValidationError::EmptyCategory);
        }

        if !self.amount.is_positive() {
            return Err(SubscriptionValidationError::NonPositiveAmount(self.amount));
        }

        Ok(())
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.amount, self.frequency)
    }
}

/// Validation errors for subscriptions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionValidationError {
    EmptyName,
    EmptyCategory,
    NonPositiveAmount(Money),
}

impl fmt::Display for SubscriptionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Subscription name cannot be empty"),
            Self::EmptyCategory => write!(f, "Subscription category cannot be empty"),
            Self::NonPositiveAmount(amount) => {
                write!(f, "Subscription amount must be positive, got {}", amount)
            }
        }
    }
}

impl std::error::Error for SubscriptionValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;

    fn netflix() -> Subscription {
        Subscription::new(
            "Netflix",
            Money::from_cents(1299),
            "Leisure",
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            Frequency::Monthly,
        )
    }

    #[test]
    fn test_pause_resume() {
        let mut sub = netflix();
        assert!(sub.is_active());
        sub.pause();
        assert_eq!(sub.status, SubscriptionStatus::Paused);
        sub.resume();
        assert!(sub.is_active());
    }

    #[test]
    fn test_schedule_keeps_anchor_day_after_clamped_cursor() {
        let mut sub = Subscription::new(
            "Rent",
            Money::from_cents(90000),
            "Home",
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            Frequency::Monthly,
        );
        sub.set_next_payment(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(sub.anchor_day(), 31);
        assert_eq!(
            sub.schedule().occurrence(1),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
        );

        sub.reschedule(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        assert_eq!(sub.anchor_day(), 15);
    }

    #[test]
    fn test_payment_on() {
        let sub = netflix();
        let date = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        let txn = sub.payment_on(date);

        assert_eq!(txn.kind(), TransactionKind::SubscriptionInstance);
        assert_eq!(txn.subscription_id, Some(sub.id));
        assert_eq!(txn.title, "Netflix");
        assert_eq!(txn.transaction_type, TransactionType::Expense);
        assert_eq!(txn.date, date);
    }

    #[test]
    fn test_validation() {
        assert!(netflix().validate().is_ok());

        let mut sub = netflix();
        sub.amount = Money::zero();
        assert!(matches!(
            sub.validate(),
            Err(SubscriptionValidationError::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn test_legacy_frequency_round_trip() {
        let mut sub = netflix();
        sub.frequency = Frequency::from("Annuale".to_string());
        assert_eq!(sub.frequency, Frequency::Yearly);
        assert_eq!(sub.monthly_cost(), Some(Money::from_cents(108)));
    }
}

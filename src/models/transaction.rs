//! Transaction model
//!
//! A ledger row is one of four kinds: a recurring template, an instance
//! generated from a template, an instance generated from a subscription, or
//! a plain one-off entry. The kind is derived from which link fields are set.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::frequency::Frequency;
use super::ids::{SubscriptionId, TransactionId};
use super::money::Money;

/// Direction of a transaction (also used by categories)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => write!(f, "Income"),
            Self::Expense => write!(f, "Expense"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "in" => Ok(Self::Income),
            "expense" | "out" => Ok(Self::Expense),
            other => Err(format!(
                "unknown transaction type '{}' (expected income or expense)",
                other
            )),
        }
    }
}

/// Which of the four row kinds a transaction is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Recurring origin row that the engine expands
    Template,
    /// Row the engine created from a template (`parent_id` set)
    Generated,
    /// Row the engine created from a subscription (`subscription_id` set)
    SubscriptionInstance,
    /// Plain user-entered row
    OneOff,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => write!(f, "template"),
            Self::Generated => write!(f, "generated"),
            Self::SubscriptionInstance => write!(f, "subscription"),
            Self::OneOff => write!(f, "one-off"),
        }
    }
}

/// A ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: TransactionId,

    /// Magnitude entered by the user; `transaction_type` decides the sign
    pub amount: Money,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Category name (soft reference, not an id)
    pub category: String,

    pub date: NaiveDate,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    #[serde(default)]
    pub is_recurring: bool,

    /// Total planned occurrences including the template itself
    #[serde(default)]
    pub installments: Option<u32>,

    #[serde(default)]
    pub recurring_frequency: Option<Frequency>,

    /// Last date (inclusive) on which an instance may be generated
    #[serde(default)]
    pub recurring_end_date: Option<NaiveDate>,

    #[serde(default)]
    pub subscription_id: Option<SubscriptionId>,

    #[serde(default)]
    pub parent_id: Option<TransactionId>,

    /// When the transaction was created
    pub created_at: DateTime<Utc>,

    /// When the transaction was last modified
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new one-off transaction
    pub fn new(
        title: impl Into<String>,
        amount: Money,
        transaction_type: TransactionType,
        category: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            amount,
            title: title.into(),
            description: String::new(),
            category: category.into(),
            date,
            transaction_type,
            is_recurring: false,
            installments: None,
            recurring_frequency: None,
            recurring_end_date: None,
            subscription_id: None,
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the free-text description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Turn this row into a recurring template
    pub fn with_recurrence(
        mut self,
        frequency: Frequency,
        end_date: Option<NaiveDate>,
        installments: Option<u32>,
    ) -> Self {
        self.is_recurring = true;
        self.recurring_frequency = Some(frequency);
        self.recurring_end_date = end_date;
        self.installments = installments;
        self
    }

    /// Derive the row kind from its link fields
    pub fn kind(&self) -> TransactionKind {
        if self.parent_id.is_some() {
            TransactionKind::Generated
        } else if self.subscription_id.is_some() {
            TransactionKind::SubscriptionInstance
        } else if self.is_recurring {
            TransactionKind::Template
        } else {
            TransactionKind::OneOff
        }
    }

    pub fn is_template(&self) -> bool {
        self.kind() == TransactionKind::Template
    }

    /// Rows produced by the engine can only be changed through their origin
    pub fn is_read_only(&self) -> bool {
        matches!(
            self.kind(),
            TransactionKind::Generated | TransactionKind::SubscriptionInstance
        )
    }

    /// Amount with the sign implied by the transaction type
    pub fn signed_amount(&self) -> Money {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    /// Build the instance this template produces on `date`
    ///
    /// The instance carries the template's content and recurrence metadata
    /// and links back through `parent_id`.
    pub fn spawn_instance(&self, date: NaiveDate) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId::new(),
            date,
            parent_id: Some(self.id),
            subscription_id: None,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Copy the user-editable content of `source` onto this row
    ///
    /// Used when a template edit cascades to its future instances; dates and
    /// links are left alone.
    pub fn copy_content_from(&mut self, source: &Transaction) {
        self.amount = source.amount;
        self.title = source.title.clone();
        self.description = source.description.clone();
        self.category = source.category.clone();
        self.transaction_type = source.transaction_type;
        self.is_recurring = source.is_recurring;
        self.installments = source.installments;
        self.recurring_frequency = source.recurring_frequency.clone();
        self.recurring_end_date = source.recurring_end_date;
        self.updated_at = Utc::now();
    }

    /// Validate the transaction
    pub fn validate(&self) -> Result<(), TransactionValidationError> {
        if self.title.trim().is_empty() {
            return Err(TransactionValidationError::EmptyTitle);
        }

        if self.category.trim().is_empty() {
            return Err(TransactionValidationError::EmptyCategory);
        }

        if self.amount.is_negative() {
            return Err(TransactionValidationError::NegativeAmount(self.amount));
        }

        if self.parent_id.is_some() && self.subscription_id.is_some() {
            return Err(TransactionValidationError::ConflictingLinks);
        }

        if self.installments == Some(0) {
            return Err(TransactionValidationError::ZeroInstallments);
        }

        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.date.format("%Y-%m-%d"),
            self.title,
            self.signed_amount()
        )
    }
}

/// Validation errors for transactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionValidationError {
    EmptyTitle,
    EmptyCategory,
    NegativeAmount(Money),
    ConflictingLinks,
    ZeroInstallments,
}

impl fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Transaction title cannot be empty"),
            Self::EmptyCategory => write!(f, "Transaction category cannot be empty"),
            Self::NegativeAmount(amount) => write!(
                f,
                "Amount must not be negative ({}); use the transaction type for direction",
                amount
            ),
            Self::ConflictingLinks => write!(
                f,
                "A transaction cannot belong to both a template and a subscription"
            ),
            Self::ZeroInstallments => write!(f, "Installments must be at least 1"),
        }
    }
}

impl std::error::Error for TransactionValidationError {}
